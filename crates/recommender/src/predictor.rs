//! Rating prediction from the latent-factor model.
//!
//! The prediction is the plain dot product of the mapped factor rows. It is
//! not clipped to the rating scale, so values outside `0.5..=5.0` are
//! possible.

use data_loader::{MovieId, UserId};
use models::{FactorModel, Result};

#[derive(Debug, Clone, Copy)]
pub struct RatingPredictor<'a> {
    model: &'a FactorModel,
}

impl<'a> RatingPredictor<'a> {
    pub fn new(model: &'a FactorModel) -> Self {
        Self { model }
    }

    /// Predicted rating of `movie_id` by `user_id`.
    ///
    /// Either id missing from the model's maps is reported as `Unmapped`;
    /// no default rating is substituted.
    pub fn predict(&self, user_id: UserId, movie_id: MovieId) -> Result<f64> {
        let user = self.model.user_index(user_id)?;
        let item = self.model.item_index(movie_id)?;
        Ok(self
            .model
            .user_factors()
            .row(user)
            .dot(&self.model.item_factors().row(item)))
    }
}
