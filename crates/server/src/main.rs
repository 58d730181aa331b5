use anyhow::{Context, Result};
use recommender::ServingContext;
use tracing::{info, warn};

use server::{AppState, ServerConfig, create_router};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    info!("Loading artifacts from {:?}", config.artifacts_dir);
    let dir = config.artifacts_dir.clone();
    let context = tokio::task::spawn_blocking(move || ServingContext::load(&dir))
        .await?
        .with_context(|| format!("Failed to load artifacts from {:?}", config.artifacts_dir))?;
    info!(
        "Serving {} movies (factor model: {})",
        context.catalog().len(),
        context.factors().is_some()
    );

    let app = create_router(AppState::new(context, &config));
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Server running on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            warn!("Cannot listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
