use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Directory written by `reel-recs build`
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Recommendations returned when a request has no `n`
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_limit() -> usize {
    10
}

impl ServerConfig {
    /// Load configuration from the environment, reading `.env` if present
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<ServerConfig>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
