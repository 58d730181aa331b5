//! RMSE of the factor model against truth ratings.
//!
//! Records whose user or item is not in the model are skipped, not counted
//! as errors. Predictions for the rest are gathered in one pass as the
//! row-wise dot product of the gathered user and item factor rows.

use data_loader::Interaction;
use models::{FactorModel, ModelError, Result};
use nalgebra::DVector;
use serde::Serialize;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub rmse: f64,
    /// Records that contributed to the RMSE
    pub scored: usize,
    /// Records dropped for an unmapped user or item
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    model: &'a FactorModel,
}

impl<'a> Evaluator<'a> {
    pub fn new(model: &'a FactorModel) -> Self {
        Self { model }
    }

    /// Score the model on `truth`.
    ///
    /// Fails with a data error when no record survives the id mapping.
    #[instrument(skip_all, fields(records = truth.len()))]
    pub fn evaluate(&self, truth: &[Interaction]) -> Result<EvaluationReport> {
        let user_ids = self.model.user_ids();
        let item_ids = self.model.item_ids();

        let mut users = Vec::with_capacity(truth.len());
        let mut items = Vec::with_capacity(truth.len());
        let mut ratings = Vec::with_capacity(truth.len());
        for record in truth {
            if let (Some(user), Some(item)) = (
                user_ids.index_of(record.user_id),
                item_ids.index_of(record.movie_id),
            ) {
                users.push(user);
                items.push(item);
                ratings.push(f64::from(record.rating));
            }
        }

        let scored = ratings.len();
        let skipped = truth.len() - scored;
        if scored == 0 {
            return Err(ModelError::Data(format!(
                "none of {} truth records map into the factor model",
                truth.len()
            )));
        }

        let user_rows = self.model.user_factors().select_rows(users.iter());
        let item_rows = self.model.item_factors().select_rows(items.iter());
        let predicted = user_rows.component_mul(&item_rows).column_sum();
        let residuals = predicted - DVector::from_vec(ratings);
        let rmse = (residuals.norm_squared() / scored as f64).sqrt();

        info!(
            "RMSE {:.4} over {} records ({} skipped as unmapped)",
            rmse, scored, skipped
        );
        Ok(EvaluationReport {
            rmse,
            scored,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::IdMap;
    use nalgebra::DMatrix;

    fn model() -> FactorModel {
        FactorModel::from_parts(
            DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 2.0, 1.0]),
            DMatrix::from_row_slice(2, 2, &[3.0, 0.0, 1.0, 1.0]),
            IdMap::from_ids([1, 2]),
            IdMap::from_ids([100, 200]),
        )
        .unwrap()
    }

    #[test]
    fn test_exact_predictions_give_zero_rmse() {
        let model = model();
        // predictions: (1,100)=3, (1,200)=1, (2,100)=6, (2,200)=3
        let truth = vec![
            Interaction::new(1, 100, 3.0),
            Interaction::new(1, 200, 1.0),
            Interaction::new(2, 200, 3.0),
        ];
        let report = Evaluator::new(&model).evaluate(&truth).unwrap();
        assert_eq!(report.rmse, 0.0);
        assert_eq!(report.scored, 3);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn test_rmse_value() {
        let model = model();
        let truth = vec![
            Interaction::new(1, 100, 4.0), // error 1
            Interaction::new(2, 200, 0.0), // error 3
        ];
        let report = Evaluator::new(&model).evaluate(&truth).unwrap();
        assert!((report.rmse - 5.0f64.sqrt()).abs() < 1e-12);
        assert!(report.rmse > 0.0);
    }

    #[test]
    fn test_unmapped_records_are_skipped() {
        let model = model();
        let truth = vec![
            Interaction::new(1, 100, 3.0),
            Interaction::new(9, 100, 1.0),
            Interaction::new(1, 300, 1.0),
        ];
        let report = Evaluator::new(&model).evaluate(&truth).unwrap();
        assert_eq!(report.rmse, 0.0);
        assert_eq!(report.scored, 1);
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn test_nothing_scored_is_data_error() {
        let model = model();
        let err = Evaluator::new(&model)
            .evaluate(&[Interaction::new(9, 100, 3.0)])
            .unwrap_err();
        assert!(matches!(err, ModelError::Data(_)));
        assert!(matches!(
            Evaluator::new(&model).evaluate(&[]),
            Err(ModelError::Data(_))
        ));
    }
}
