//! Durable artifact directory written by the offline build and read by the
//! serving path.
//!
//! Layout:
//! - `catalog.json`: finalized catalog items, row positions included
//! - `embeddings.json`: embedding matrix plus the catalog fingerprint
//! - `factors.json`: factor matrices and both id maps (optional)
//! - `manifest.json`: build parameters and summary counts
//!
//! The catalog and the embeddings are only accepted together: loading checks
//! row counts and the fingerprint and fails with an alignment error.

use crate::config::{BuildConfig, FeatureSource};
use crate::embeddings::EmbeddingMatrix;
use crate::error::{ModelError, Result};
use crate::factors::FactorModel;
use data_loader::Catalog;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{info, instrument};

pub const CATALOG_FILE: &str = "catalog.json";
pub const EMBEDDINGS_FILE: &str = "embeddings.json";
pub const FACTORS_FILE: &str = "factors.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Summary of one build run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub catalog_fingerprint: u64,
    pub items: usize,
    pub embedding_dim: usize,
    pub factor_rank: Option<usize>,
    pub users: Option<usize>,
    pub feature_source: FeatureSource,
    pub seed: u64,
}

/// Catalog, embeddings and optional factor model from the same build run
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub catalog: Catalog,
    pub embeddings: EmbeddingMatrix,
    pub factors: Option<FactorModel>,
}

impl ArtifactSet {
    /// Bundle artifacts after checking that they belong together
    pub fn new(
        catalog: Catalog,
        embeddings: EmbeddingMatrix,
        factors: Option<FactorModel>,
    ) -> Result<Self> {
        let set = Self {
            catalog,
            embeddings,
            factors,
        };
        set.validate()?;
        Ok(set)
    }

    pub fn validate(&self) -> Result<()> {
        self.embeddings.ensure_aligned(&self.catalog)?;
        if let Some(factors) = &self.factors {
            factors.validate()?;
        }
        Ok(())
    }

    pub fn manifest(&self, config: &BuildConfig) -> Manifest {
        Manifest {
            catalog_fingerprint: self.catalog.fingerprint(),
            items: self.catalog.len(),
            embedding_dim: self.embeddings.dim(),
            factor_rank: self.factors.as_ref().map(FactorModel::rank),
            users: self.factors.as_ref().map(|f| f.user_ids().len()),
            feature_source: config.feature_source,
            seed: config.seed,
        }
    }

    /// Write every artifact into `dir`, creating it if needed.
    ///
    /// A stale `factors.json` from an earlier run is removed when this set
    /// has no factor model.
    #[instrument(skip(self, config))]
    pub fn save(&self, dir: &Path, config: &BuildConfig) -> Result<()> {
        fs::create_dir_all(dir)?;
        write_json(&dir.join(CATALOG_FILE), &self.catalog)?;
        write_json(&dir.join(EMBEDDINGS_FILE), &self.embeddings)?;
        let factors_path = dir.join(FACTORS_FILE);
        match &self.factors {
            Some(factors) => write_json(&factors_path, factors)?,
            None if factors_path.exists() => fs::remove_file(&factors_path)?,
            None => {}
        }
        write_json(&dir.join(MANIFEST_FILE), &self.manifest(config))?;

        info!(
            "Saved {} items ({}-dim embeddings) to {:?}",
            self.catalog.len(),
            self.embeddings.dim(),
            dir
        );
        Ok(())
    }

    /// Read an artifact directory, failing fast on any misalignment.
    #[instrument]
    pub fn load(dir: &Path) -> Result<Self> {
        let catalog: Catalog = read_json(&dir.join(CATALOG_FILE))?;
        let embeddings: EmbeddingMatrix = read_json(&dir.join(EMBEDDINGS_FILE))?;
        let factors_path = dir.join(FACTORS_FILE);
        let factors: Option<FactorModel> = if factors_path.exists() {
            Some(read_json(&factors_path)?)
        } else {
            None
        };

        let set = Self::new(catalog, embeddings, factors)?;

        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.exists() {
            let manifest: Manifest = read_json(&manifest_path)?;
            if manifest.catalog_fingerprint != set.catalog.fingerprint() {
                return Err(ModelError::Alignment(format!(
                    "manifest was written for catalog {:016x}, found {:016x}",
                    manifest.catalog_fingerprint,
                    set.catalog.fingerprint()
                )));
            }
        }

        info!(
            "Loaded {} items from {:?} (factor model: {})",
            set.catalog.len(),
            dir,
            if set.factors.is_some() { "yes" } else { "no" }
        );
        Ok(set)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
