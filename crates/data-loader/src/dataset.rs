//! Loading a whole MovieLens directory in one call.
//!
//! The catalog, the rating log and (optionally) the tag genome are parsed in
//! parallel with `rayon::join`; the catalog is finalized only after
//! enrichment so its row positions reflect the final table.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::parser;
use crate::types::{Interaction, TagScore};
use std::path::{Path, PathBuf};
use tracing::info;

/// What to load besides movies and ratings
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Outside metadata to join onto movies (director, cast)
    pub metadata: Option<PathBuf>,
    /// Also load genome-scores.csv and genome-tags.csv
    pub with_tags: bool,
}

/// Tag genome: relevance scores plus optional tag names
#[derive(Debug, Clone, Default)]
pub struct TagGenome {
    pub scores: Vec<TagScore>,
    pub names: Vec<(u32, String)>,
}

/// Everything the offline builders read
#[derive(Debug)]
pub struct Dataset {
    pub catalog: Catalog,
    pub interactions: Vec<Interaction>,
    pub tags: Option<TagGenome>,
}

impl Dataset {
    /// Load the dataset from a directory.
    ///
    /// Expects `movies.csv` and `ratings.csv`; with `options.with_tags` also
    /// `genome-scores.csv` and, when present, `genome-tags.csv`.
    pub fn load_from_dir(data_dir: &Path, options: &LoadOptions) -> Result<Self> {
        info!("Loading MovieLens dataset from {:?}", data_dir);
        let ratings_path = data_dir.join("ratings.csv");

        let ((catalog, tags), interactions) = rayon::join(
            || {
                rayon::join(
                    || Catalog::load_from_dir(data_dir, options.metadata.as_deref()),
                    || {
                        if options.with_tags {
                            load_tags(data_dir).map(Some)
                        } else {
                            Ok(None)
                        }
                    },
                )
            },
            || parser::parse_ratings(&ratings_path),
        );

        let catalog = catalog?;
        let tags = tags?;
        let interactions = interactions?;

        info!(
            "Loaded {} movies, {} ratings{}",
            catalog.len(),
            interactions.len(),
            tags.as_ref()
                .map(|t| format!(", {} tag scores", t.scores.len()))
                .unwrap_or_default()
        );

        Ok(Self {
            catalog,
            interactions,
            tags,
        })
    }
}

fn load_tags(data_dir: &Path) -> Result<TagGenome> {
    let scores = parser::parse_genome_scores(&data_dir.join("genome-scores.csv"))?;
    let names_path = data_dir.join("genome-tags.csv");
    let names = if names_path.exists() {
        parser::parse_genome_tags(&names_path)?
    } else {
        Vec::new()
    };
    Ok(TagGenome { scores, names })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataLoadError;

    #[test]
    fn test_missing_directory_reports_file() {
        let err = Dataset::load_from_dir(Path::new("/nonexistent/ml"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, DataLoadError::FileNotFound { .. }));
    }

    #[test]
    fn test_load_dataset() {
        // Requires the MovieLens "latest-small" files in ../../data/ml-latest-small
        let data_dir = Path::new("../../data/ml-latest-small");

        if data_dir.exists() {
            let dataset = Dataset::load_from_dir(data_dir, &LoadOptions::default()).unwrap();
            assert!(!dataset.catalog.is_empty());
            assert!(!dataset.interactions.is_empty());
        }
    }
}
