//! Build parameters for the offline jobs.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which per-item features feed the embedding builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSource {
    /// Multi-hot genre membership
    #[default]
    Genres,
    /// Genome tag relevance scores
    Tags,
}

impl std::fmt::Display for FeatureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureSource::Genres => write!(f, "genres"),
            FeatureSource::Tags => write!(f, "tags"),
        }
    }
}

/// Parameters of one offline build run.
///
/// Every field has a default, so a config file only needs the overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Requested embedding dimensionality, clamped to the feature count
    #[serde(default = "default_embedding_rank")]
    pub embedding_rank: usize,

    /// Requested latent-factor rank, clamped to min(users, items)
    #[serde(default = "default_factor_rank")]
    pub factor_rank: usize,

    /// Seed of the randomized SVD solver
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Extra random projections beyond the rank
    #[serde(default = "default_oversamples")]
    pub oversamples: usize,

    /// Power iterations of the range finder
    #[serde(default = "default_power_iterations")]
    pub power_iterations: usize,

    #[serde(default)]
    pub feature_source: FeatureSource,
}

fn default_embedding_rank() -> usize {
    50
}

fn default_factor_rank() -> usize {
    20
}

fn default_seed() -> u64 {
    42
}

fn default_oversamples() -> usize {
    10
}

fn default_power_iterations() -> usize {
    5
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            embedding_rank: default_embedding_rank(),
            factor_rank: default_factor_rank(),
            seed: default_seed(),
            oversamples: default_oversamples(),
            power_iterations: default_power_iterations(),
            feature_source: FeatureSource::default(),
        }
    }
}

impl BuildConfig {
    /// Read a JSON config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
