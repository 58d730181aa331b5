//! Per-item feature matrices, row-aligned with the catalog.
//!
//! Missing values are zero relevance: a movie without genres is a zero row
//! of the genre matrix, a movie absent from the tag genome is a zero row of
//! the tag matrix.

use crate::alignment;
use crate::error::Result;
use data_loader::{Catalog, TagGenome};
use nalgebra::DMatrix;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Dense item × feature matrix built from one catalog
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Column names, in column order
    pub columns: Vec<String>,
    /// One row per catalog row position
    pub values: DMatrix<f64>,
    /// Fingerprint of the catalog the rows follow
    pub catalog_fingerprint: u64,
}

impl FeatureMatrix {
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Fail unless this matrix was built from `catalog`
    pub fn ensure_aligned(&self, catalog: &Catalog) -> Result<()> {
        alignment::ensure_built_from(
            "feature matrix",
            catalog,
            self.nrows(),
            self.catalog_fingerprint,
        )
    }
}

/// Multi-hot genre membership; the vocabulary is sorted lexically.
pub fn genre_features(catalog: &Catalog) -> FeatureMatrix {
    let vocabulary: BTreeSet<&str> = catalog
        .items()
        .iter()
        .flat_map(|item| item.genres.iter().map(String::as_str))
        .collect();
    let column_of: BTreeMap<&str, usize> = vocabulary
        .iter()
        .enumerate()
        .map(|(col, genre)| (*genre, col))
        .collect();

    let mut values = DMatrix::zeros(catalog.len(), vocabulary.len());
    for item in catalog.items() {
        for genre in &item.genres {
            values[(item.row_position(), column_of[genre.as_str()])] = 1.0;
        }
    }

    debug!(
        "Genre matrix: {} items x {} genres",
        catalog.len(),
        vocabulary.len()
    );
    FeatureMatrix {
        columns: vocabulary.into_iter().map(str::to_string).collect(),
        values,
        catalog_fingerprint: catalog.fingerprint(),
    }
}

/// Item × tag relevance pivot; columns are ordered by tag id.
///
/// A later score for the same (movie, tag) pair overwrites an earlier one.
/// Scores for movies outside the catalog are ignored.
pub fn tag_features(catalog: &Catalog, genome: &TagGenome) -> FeatureMatrix {
    let tag_ids: BTreeSet<u32> = genome.scores.iter().map(|s| s.tag_id).collect();
    let column_of: BTreeMap<u32, usize> = tag_ids
        .iter()
        .enumerate()
        .map(|(col, tag)| (*tag, col))
        .collect();
    let names: BTreeMap<u32, &str> = genome
        .names
        .iter()
        .map(|(id, name)| (*id, name.as_str()))
        .collect();

    let mut values = DMatrix::zeros(catalog.len(), tag_ids.len());
    let mut outside_catalog = 0usize;
    for score in &genome.scores {
        match catalog.position_of(score.movie_id) {
            Some(row) => values[(row, column_of[&score.tag_id])] = f64::from(score.relevance),
            None => outside_catalog += 1,
        }
    }

    info!(
        "Tag matrix: {} items x {} tags ({} scores for movies outside the catalog)",
        catalog.len(),
        tag_ids.len(),
        outside_catalog
    );
    FeatureMatrix {
        columns: tag_ids
            .iter()
            .map(|id| {
                names
                    .get(id)
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| format!("tag:{}", id))
            })
            .collect(),
        values,
        catalog_fingerprint: catalog.fingerprint(),
    }
}
