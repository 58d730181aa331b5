//! HTTP handlers.
//!
//! Every handler takes an `Arc` snapshot of the serving context up front, so
//! a concurrent reload never mixes two artifact sets inside one request.
//! Ranking and reloading run on the blocking pool.
//!
//! Errors are JSON bodies of the form `{"error": {"kind", "message"}}` with
//! kind `not found` (404), `alignment error` (500) or `internal error` (500,
//! or 503 when no factor model is loaded). A query string that fails to
//! deserialize, such as a missing `title`, is reported with the extra kind
//! `bad request` (400) before any engine code runs.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    routing::{get, post},
};
use data_loader::{MovieId, UserId};
use recommender::Recommendation;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{ApiError, ApiResult, RecommendError};
use crate::state::AppState;

/// Creates the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/recommend", get(recommend))
        .route("/recommend/", get(recommend))
        .route("/predict", get(predict))
        .route("/admin/reload", post(reload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub items: usize,
    pub factor_model: bool,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let context = state.store.snapshot();
    Json(HealthResponse {
        status: "ok",
        items: context.catalog().len(),
        factor_model: context.factors().is_some(),
    })
}

#[derive(Debug, Deserialize)]
pub struct RecommendParams {
    pub title: String,
    pub n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<Recommendation>,
}

async fn recommend(
    State(state): State<AppState>,
    params: Result<Query<RecommendParams>, QueryRejection>,
) -> Result<Json<RecommendResponse>, RecommendError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let n = params.n.unwrap_or(state.default_limit);
    let context = state.store.snapshot();

    let recommendations =
        tokio::task::spawn_blocking(move || context.recommend(&params.title, n)).await??;
    Ok(Json(RecommendResponse { recommendations }))
}

#[derive(Debug, Deserialize)]
pub struct PredictParams {
    pub user_id: UserId,
    pub movie_id: MovieId,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub prediction: f64,
}

async fn predict(
    State(state): State<AppState>,
    params: Result<Query<PredictParams>, QueryRejection>,
) -> ApiResult<Json<PredictResponse>> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let prediction = state
        .store
        .snapshot()
        .predict(params.user_id, params.movie_id)?;
    Ok(Json(PredictResponse {
        user_id: params.user_id,
        movie_id: params.movie_id,
        prediction,
    }))
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub status: &'static str,
    pub items: usize,
    pub factor_model: bool,
}

async fn reload(State(state): State<AppState>) -> ApiResult<Json<ReloadResponse>> {
    let store = state.store.clone();
    let dir = state.artifacts_dir.clone();
    info!("Reloading artifacts from {:?}", dir);

    let context = tokio::task::spawn_blocking(move || store.reload(&dir)).await??;
    Ok(Json(ReloadResponse {
        status: "reloaded",
        items: context.catalog().len(),
        factor_model: context.factors().is_some(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use data_loader::{Catalog, MovieRecord};
    use models::{ArtifactSet, BuildConfig, EmbeddingMatrix, FactorModel, IdMap};
    use nalgebra::DMatrix;
    use recommender::ServingContext;
    use serde_json::Value;
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn catalog() -> Catalog {
        let mut heat = MovieRecord::new(2, "Heat", vec!["Action".into(), "Crime".into()]);
        heat.director = Some("Michael Mann".into());
        Catalog::finalize(vec![
            MovieRecord::new(1, "Toy Story", vec!["Animation".into()]),
            heat,
            MovieRecord::new(3, "Speed", vec!["Action".into()]),
        ])
        .unwrap()
    }

    fn artifacts(with_factors: bool) -> ArtifactSet {
        let catalog = catalog();
        let embeddings = EmbeddingMatrix::from_rows(
            &catalog,
            &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.1], vec![0.0, 1.0, 0.11]],
        )
        .unwrap();
        let factors = with_factors.then(|| {
            FactorModel::from_parts(
                DMatrix::from_row_slice(1, 2, &[1.0, 2.0]),
                DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 0.5, 0.25]),
                IdMap::from_ids([7]),
                IdMap::from_ids([1, 2]),
            )
            .unwrap()
        });
        ArtifactSet::new(catalog, embeddings, factors).unwrap()
    }

    fn app_with(artifacts: ArtifactSet, artifacts_dir: PathBuf) -> Router {
        let config = ServerConfig {
            artifacts_dir,
            host: "127.0.0.1".into(),
            port: 0,
            default_limit: 10,
        };
        let context = ServingContext::new(artifacts).unwrap();
        create_router(AppState::new(context, &config))
    }

    fn app() -> Router {
        app_with(artifacts(true), PathBuf::from("unused"))
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = send(app(), "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"], 3);
        assert_eq!(body["factor_model"], true);
    }

    #[tokio::test]
    async fn test_recommend_returns_ranked_list() {
        let (status, body) = send(app(), "GET", "/recommend/?title=toy%20story%20&n=2").await;
        assert_eq!(status, StatusCode::OK);

        let recs = body["recommendations"].as_array().unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0]["title"], "Heat");
        assert_eq!(recs[0]["genres"], "Action|Crime");
        assert_eq!(recs[0]["director"], "Michael Mann");
        assert_eq!(recs[0]["cast"], Value::Null);
        assert_eq!(recs[1]["title"], "Speed");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_recommend_default_limit() {
        let (status, body) = send(app(), "GET", "/recommend?title=Heat").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendations"].as_array().unwrap().len(), 2);
        assert_eq!(body["recommendations"][0]["title"], "Speed");
    }

    #[tokio::test]
    async fn test_recommend_unknown_title() {
        let (status, body) = send(app(), "GET", "/recommend/?title=Casablanca").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["recommendations"], serde_json::json!([]));
        assert_eq!(body["error"]["kind"], "not found");
    }

    #[tokio::test]
    async fn test_recommend_missing_title_is_structured() {
        let (status, body) = send(app(), "GET", "/recommend/").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["recommendations"], serde_json::json!([]));
        assert_eq!(body["error"]["kind"], "bad request");

        let (status, body) = send(app(), "GET", "/predict?user_id=abc&movie_id=1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "bad request");
    }

    #[tokio::test]
    async fn test_predict() {
        let (status, body) = send(app(), "GET", "/predict?user_id=7&movie_id=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], 1.0);

        let (status, body) = send(app(), "GET", "/predict?user_id=9&movie_id=2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], "not found");
    }

    #[tokio::test]
    async fn test_predict_without_factor_model() {
        let app = app_with(artifacts(false), PathBuf::from("unused"));
        let (status, body) = send(app, "GET", "/predict?user_id=7&movie_id=2").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["kind"], "internal error");
    }

    #[tokio::test]
    async fn test_reload_swaps_artifacts() {
        let dir = std::env::temp_dir().join(format!("server-reload-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let app = app_with(artifacts(false), dir.clone());
        // nothing written yet: reload fails and the old set stays live
        let (status, _) = send(app.clone(), "POST", "/admin/reload").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let (_, body) = send(app.clone(), "GET", "/health").await;
        assert_eq!(body["factor_model"], false);

        artifacts(true).save(&dir, &BuildConfig::default()).unwrap();
        let (status, body) = send(app.clone(), "POST", "/admin/reload").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["factor_model"], true);
        let (_, body) = send(app, "GET", "/health").await;
        assert_eq!(body["factor_model"], true);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
