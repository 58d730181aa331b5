//! Latent-factor model of the user × item rating matrix.
//!
//! ## Algorithm
//! 1. Assign dense indices to users and items (ascending external id)
//! 2. Build the sparse rating matrix R; a later rating for the same
//!    (user, item) pair overwrites the earlier one
//! 3. Truncated SVD R ≈ U diag(σ) Vᵀ at rank K
//! 4. User factors = U diag(√σ), item factors = V diag(√σ), so that
//!    `user_factors[u] · item_factors[i]` reproduces the rank-K approximation
//!
//! Unobserved cells are treated as zero ratings by the decomposition.

use crate::config::BuildConfig;
use crate::error::{IdKind, ModelError, Result};
use crate::linalg::{LinearOperator, RandomizedSvd};
use crate::ratings::{IdMap, RatingMatrix};
use data_loader::{Interaction, MovieId, UserId};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// User and item factor matrices of equal rank plus their id maps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorModel {
    user_factors: DMatrix<f64>,
    item_factors: DMatrix<f64>,
    user_ids: IdMap,
    item_ids: IdMap,
}

impl FactorModel {
    /// Assemble a model, checking that ranks and map sizes agree.
    pub fn from_parts(
        user_factors: DMatrix<f64>,
        item_factors: DMatrix<f64>,
        user_ids: IdMap,
        item_ids: IdMap,
    ) -> Result<Self> {
        let model = Self {
            user_factors,
            item_factors,
            user_ids,
            item_ids,
        };
        model.validate()?;
        Ok(model)
    }

    /// Check the inner dimension and that every id map covers its matrix
    pub fn validate(&self) -> Result<()> {
        if self.user_factors.ncols() != self.item_factors.ncols() {
            return Err(ModelError::Alignment(format!(
                "user factors have rank {} but item factors have rank {}",
                self.user_factors.ncols(),
                self.item_factors.ncols()
            )));
        }
        if self.user_factors.nrows() != self.user_ids.len() {
            return Err(ModelError::Alignment(format!(
                "{} user factor rows for {} mapped users",
                self.user_factors.nrows(),
                self.user_ids.len()
            )));
        }
        if self.item_factors.nrows() != self.item_ids.len() {
            return Err(ModelError::Alignment(format!(
                "{} item factor rows for {} mapped items",
                self.item_factors.nrows(),
                self.item_ids.len()
            )));
        }
        Ok(())
    }

    /// Inner dimension K
    pub fn rank(&self) -> usize {
        self.user_factors.ncols()
    }

    pub fn user_factors(&self) -> &DMatrix<f64> {
        &self.user_factors
    }

    pub fn item_factors(&self) -> &DMatrix<f64> {
        &self.item_factors
    }

    pub fn user_ids(&self) -> &IdMap {
        &self.user_ids
    }

    pub fn item_ids(&self) -> &IdMap {
        &self.item_ids
    }

    /// Dense user index, or `Unmapped`
    pub fn user_index(&self, user_id: UserId) -> Result<usize> {
        self.user_ids.require(IdKind::User, user_id)
    }

    /// Dense item index, or `Unmapped`
    pub fn item_index(&self, movie_id: MovieId) -> Result<usize> {
        self.item_ids.require(IdKind::Item, movie_id)
    }
}

/// Offline builder of [`FactorModel`]
#[derive(Debug, Clone, Copy)]
pub struct FactorModelBuilder {
    solver: RandomizedSvd,
}

impl FactorModelBuilder {
    pub fn new(rank: usize, seed: u64) -> Self {
        Self {
            solver: RandomizedSvd::new(rank, seed),
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            solver: RandomizedSvd::new(config.factor_rank, config.seed)
                .with_oversamples(config.oversamples)
                .with_power_iterations(config.power_iterations),
        }
    }

    /// Factorize the rating log.
    ///
    /// An empty log is a data error; the rank is clamped to
    /// `min(users, items)`.
    #[instrument(skip_all, fields(interactions = interactions.len()))]
    pub fn build(&self, interactions: &[Interaction]) -> Result<FactorModel> {
        if interactions.is_empty() {
            return Err(ModelError::Data(
                "cannot build a factor model from an empty interaction log".to_string(),
            ));
        }
        if let Some(bad) = interactions.iter().find(|r| !r.rating.is_finite()) {
            return Err(ModelError::Data(format!(
                "non-finite rating from user {} for movie {}",
                bad.user_id, bad.movie_id
            )));
        }

        let user_ids = IdMap::from_ids(interactions.iter().map(|r| r.user_id));
        let item_ids = IdMap::from_ids(interactions.iter().map(|r| r.movie_id));
        let ratings = RatingMatrix::from_interactions(interactions, &user_ids, &item_ids)?;
        debug!(
            "Rating matrix {}x{} with {} cells ({} duplicate ratings overwritten)",
            ratings.nrows(),
            ratings.ncols(),
            ratings.nnz(),
            interactions.len() - ratings.nnz()
        );

        let rank = self.solver.rank.min(user_ids.len()).min(item_ids.len());
        if rank != self.solver.rank {
            debug!("Factor rank clamped from {} to {}", self.solver.rank, rank);
        }
        let svd = RandomizedSvd { rank, ..self.solver }.decompose(&ratings)?;
        let (user_factors, item_factors) = svd.split_sqrt();

        info!(
            "Built factor model: {} users, {} items, rank {}",
            user_ids.len(),
            item_ids.len(),
            rank
        );
        FactorModel::from_parts(user_factors, item_factors, user_ids, item_ids)
    }
}
