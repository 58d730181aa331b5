//! Item embeddings from per-item features.
//!
//! The embedding of row position `i` is the projection of the item's feature
//! row onto the top-k right singular vectors of the feature matrix, `X V`.
//! This equals `U diag(σ)` of the truncated SVD and keeps a featureless item
//! at the exact zero vector.

use crate::alignment;
use crate::config::BuildConfig;
use crate::error::{ModelError, Result};
use crate::features::FeatureMatrix;
use crate::linalg::RandomizedSvd;
use data_loader::{Catalog, RowPosition};
use nalgebra::{DMatrix, Dyn, MatrixView, U1};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Read-only view of one embedding row
pub type EmbeddingRow<'a> = MatrixView<'a, f64, U1, Dyn, U1, Dyn>;

/// One dense vector per catalog item, indexed by row position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMatrix {
    values: DMatrix<f64>,
    catalog_fingerprint: u64,
}

impl EmbeddingMatrix {
    /// Wrap precomputed vectors built against `catalog`.
    pub fn from_rows(catalog: &Catalog, rows: &[Vec<f64>]) -> Result<Self> {
        alignment::ensure_rows("embedding matrix", catalog.len(), rows.len())?;
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = rows.iter().position(|row| row.len() != dim) {
            return Err(ModelError::Data(format!(
                "embedding row {} has {} values, expected {}",
                bad,
                rows[bad].len(),
                dim
            )));
        }
        let values = DMatrix::from_fn(rows.len(), dim, |i, j| rows[i][j]);
        Ok(Self {
            values,
            catalog_fingerprint: catalog.fingerprint(),
        })
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    /// Embedding dimensionality
    pub fn dim(&self) -> usize {
        self.values.ncols()
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn catalog_fingerprint(&self) -> u64 {
        self.catalog_fingerprint
    }

    /// Embedding of one item, bounds-checked
    pub fn row(&self, position: RowPosition) -> Result<EmbeddingRow<'_>> {
        alignment::ensure_in_bounds("embedding matrix", position, self.nrows())?;
        Ok(self.values.row(position))
    }

    /// Fail unless these embeddings were built from `catalog`
    pub fn ensure_aligned(&self, catalog: &Catalog) -> Result<()> {
        alignment::ensure_built_from(
            "embedding matrix",
            catalog,
            self.nrows(),
            self.catalog_fingerprint,
        )
    }
}

/// Offline builder of [`EmbeddingMatrix`]
#[derive(Debug, Clone, Copy)]
pub struct EmbeddingBuilder {
    solver: RandomizedSvd,
}

impl EmbeddingBuilder {
    /// Builder producing `rank` dimensions (clamped to the feature count)
    pub fn new(rank: usize, seed: u64) -> Self {
        Self {
            solver: RandomizedSvd::new(rank, seed),
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            solver: RandomizedSvd::new(config.embedding_rank, config.seed)
                .with_oversamples(config.oversamples)
                .with_power_iterations(config.power_iterations),
        }
    }

    /// Reduce `features` to dense embeddings aligned with `catalog`.
    #[instrument(skip_all, fields(items = catalog.len(), features = features.ncols()))]
    pub fn build(&self, catalog: &Catalog, features: &FeatureMatrix) -> Result<EmbeddingMatrix> {
        features.ensure_aligned(catalog)?;
        if catalog.is_empty() || features.ncols() == 0 {
            return Err(ModelError::Data(format!(
                "cannot embed a {}x{} feature matrix",
                features.nrows(),
                features.ncols()
            )));
        }
        if let Some(index) = features.values.iter().position(|v| !v.is_finite()) {
            let (row, col) = (index % features.nrows(), index / features.nrows());
            return Err(ModelError::Data(format!(
                "non-finite feature value at row {} column {}",
                row, col
            )));
        }

        let rank = self.solver.rank.min(features.ncols()).min(features.nrows());
        if rank != self.solver.rank {
            debug!("Embedding rank clamped from {} to {}", self.solver.rank, rank);
        }
        let solver = RandomizedSvd { rank, ..self.solver };
        let svd = solver.decompose(&features.values)?;

        info!(
            "Built {} embeddings of dimension {} (top singular value {:.4})",
            catalog.len(),
            rank,
            svd.singular_values[0]
        );
        Ok(EmbeddingMatrix {
            values: &features.values * &svd.v,
            catalog_fingerprint: catalog.fingerprint(),
        })
    }
}
