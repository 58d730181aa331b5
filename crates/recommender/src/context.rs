//! Serving state: an immutable context built from one artifact set and a
//! store that swaps whole contexts atomically.

use crate::evaluator::{EvaluationReport, Evaluator};
use crate::predictor::RatingPredictor;
use crate::similarity::SimilarityRanker;
use data_loader::{Catalog, Interaction, Item, MovieId, UserId};
use models::{ArtifactSet, FactorModel, ModelError, Result, alignment};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// A ranked movie as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub movie_id: MovieId,
    pub title: String,
    /// Genres joined with `|`
    pub genres: String,
    pub director: Option<String>,
    pub cast: Option<String>,
    pub score: f64,
}

impl Recommendation {
    fn new(item: &Item, score: f64) -> Self {
        Self {
            movie_id: item.id,
            title: item.title.clone(),
            genres: item.genre_string(),
            director: item.known_director().map(str::to_string),
            cast: item.known_cast().map(str::to_string),
            score,
        }
    }
}

/// Everything the read path needs, validated once and never mutated
#[derive(Debug)]
pub struct ServingContext {
    catalog: Catalog,
    ranker: SimilarityRanker,
    factors: Option<FactorModel>,
}

impl ServingContext {
    pub fn new(artifacts: ArtifactSet) -> Result<Self> {
        artifacts.validate()?;
        let ArtifactSet {
            catalog,
            embeddings,
            factors,
        } = artifacts;
        Ok(Self {
            catalog,
            ranker: SimilarityRanker::new(embeddings),
            factors,
        })
    }

    /// Load and validate an artifact directory
    pub fn load(dir: &Path) -> Result<Self> {
        Self::new(ArtifactSet::load(dir)?)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ranker(&self) -> &SimilarityRanker {
        &self.ranker
    }

    pub fn factors(&self) -> Option<&FactorModel> {
        self.factors.as_ref()
    }

    fn require_factors(&self) -> Result<&FactorModel> {
        self.factors
            .as_ref()
            .ok_or_else(|| ModelError::MissingArtifact("no factor model is loaded".to_string()))
    }

    /// Movies most similar to the one titled `title`.
    ///
    /// The title is matched exactly after normalization; when several
    /// movies share it, the first in catalog order is used.
    pub fn recommend(&self, title: &str, n: usize) -> Result<Vec<Recommendation>> {
        let query = self
            .catalog
            .resolve_title(title)
            .ok_or_else(|| ModelError::NotFound(format!("no movie titled '{}'", title.trim())))?;
        debug!("Resolved '{}' to row {}", title, query);

        self.ranker
            .rank(query, n)?
            .into_iter()
            .map(|scored| {
                alignment::ensure_in_bounds("catalog", scored.row, self.catalog.len())?;
                let item = &self.catalog.items()[scored.row];
                Ok(Recommendation::new(item, scored.score))
            })
            .collect()
    }

    pub fn predict(&self, user_id: UserId, movie_id: MovieId) -> Result<f64> {
        RatingPredictor::new(self.require_factors()?).predict(user_id, movie_id)
    }

    pub fn evaluate(&self, truth: &[Interaction]) -> Result<EvaluationReport> {
        Evaluator::new(self.require_factors()?).evaluate(truth)
    }
}

/// Current serving context, replaced wholesale on reload.
///
/// Readers take an `Arc` snapshot and keep using it even if a swap happens
/// mid-request.
#[derive(Debug)]
pub struct ModelStore {
    current: RwLock<Arc<ServingContext>>,
}

impl ModelStore {
    pub fn new(context: ServingContext) -> Self {
        Self {
            current: RwLock::new(Arc::new(context)),
        }
    }

    pub fn snapshot(&self) -> Arc<ServingContext> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install `context`, returning the one it replaced
    pub fn swap(&self, context: ServingContext) -> Arc<ServingContext> {
        self.install(Arc::new(context))
    }

    fn install(&self, next: Arc<ServingContext>) -> Arc<ServingContext> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *current, next);
        info!(
            "Swapped serving context: {} -> {} items",
            previous.catalog.len(),
            current.catalog.len()
        );
        previous
    }

    /// Load `dir` and swap it in, returning the context installed.
    ///
    /// The current context stays on failure.
    pub fn reload(&self, dir: &Path) -> Result<Arc<ServingContext>> {
        let next = Arc::new(ServingContext::load(dir)?);
        self.install(Arc::clone(&next));
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::MovieRecord;
    use models::{BuildConfig, EmbeddingMatrix};

    fn artifacts(ids: &[u32]) -> ArtifactSet {
        let records = ids
            .iter()
            .map(|&id| MovieRecord::new(id, format!("Movie {}", id), vec!["Drama".into()]))
            .collect();
        let catalog = Catalog::finalize(records).unwrap();
        let rows: Vec<Vec<f64>> = ids.iter().map(|&id| vec![1.0, f64::from(id)]).collect();
        let embeddings = EmbeddingMatrix::from_rows(&catalog, &rows).unwrap();
        ArtifactSet::new(catalog, embeddings, None).unwrap()
    }

    fn context(ids: &[u32]) -> ServingContext {
        ServingContext::new(artifacts(ids)).unwrap()
    }

    #[test]
    fn test_snapshot_survives_swap() {
        let store = ModelStore::new(context(&[1, 2]));
        let before = store.snapshot();

        let previous = store.swap(context(&[1, 2, 3]));
        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(before.catalog().len(), 2);
        assert_eq!(store.snapshot().catalog().len(), 3);
    }

    #[test]
    fn test_missing_factor_model() {
        let context = context(&[1, 2]);
        assert!(matches!(
            context.predict(1, 1),
            Err(ModelError::MissingArtifact(_))
        ));
    }

    #[test]
    fn test_failed_reload_keeps_current() {
        let store = ModelStore::new(context(&[1, 2]));
        let missing = std::env::temp_dir().join("recommender-no-such-artifacts");
        assert!(store.reload(&missing).is_err());
        assert_eq!(store.snapshot().catalog().len(), 2);
    }

    #[test]
    fn test_reload_returns_installed_context() {
        let dir = std::env::temp_dir().join(format!("recommender-reload-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        artifacts(&[1, 2, 3]).save(&dir, &BuildConfig::default()).unwrap();

        let store = ModelStore::new(context(&[1, 2]));
        let reloaded = store.reload(&dir).unwrap();
        assert_eq!(reloaded.catalog().len(), 3);

        let replaced = store.swap(context(&[4]));
        assert!(Arc::ptr_eq(&reloaded, &replaced));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_recommendation_fields() {
        let context = context(&[1, 2, 3]);
        let recs = context.recommend("movie 1", 5).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].genres, "Drama");
        assert_eq!(recs[0].director, None);
        assert!(recs.iter().all(|r| r.movie_id != 1));

        let json = serde_json::to_value(&recs[0]).unwrap();
        assert_eq!(json["director"], serde_json::Value::Null);
        assert_eq!(json["title"], "Movie 2");
    }
}
