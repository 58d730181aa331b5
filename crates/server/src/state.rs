use recommender::{ModelStore, ServingContext};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ModelStore>,
    /// Where `/admin/reload` reads artifacts from
    pub artifacts_dir: Arc<PathBuf>,
    pub default_limit: usize,
}

impl AppState {
    pub fn new(context: ServingContext, config: &ServerConfig) -> Self {
        Self {
            store: Arc::new(ModelStore::new(context)),
            artifacts_dir: Arc::new(config.artifacts_dir.clone()),
            default_limit: config.default_limit,
        }
    }
}
