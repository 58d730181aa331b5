//! # Similarity Ranker
//!
//! Ranks every catalog item by cosine similarity to a query item.
//!
//! ## Policies
//! - A non-finite similarity (zero-norm embedding on either side) is scored 0
//! - The query's own row is never a candidate
//! - Candidates sort by score descending, ties by ascending row position
//! - Returned scores are rounded to 4 decimals; ordering uses the raw score

use data_loader::RowPosition;
use models::{EmbeddingMatrix, EmbeddingRow, Result, alignment};
use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::{debug, instrument};

/// Decimal digits kept in presented scores
pub const SCORE_DECIMALS: i32 = 4;

/// One ranked candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredItem {
    pub row: RowPosition,
    pub score: f64,
}

/// Cosine similarity of two embeddings; 0 when undefined
pub fn cosine_similarity(a: EmbeddingRow<'_>, b: EmbeddingRow<'_>) -> f64 {
    finite_or_zero(a.dot(&b) / (a.norm() * b.norm()))
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Round a score for presentation
pub fn round_score(score: f64) -> f64 {
    let scale = 10f64.powi(SCORE_DECIMALS);
    (score * scale).round() / scale
}

/// Descending score, then ascending row position
fn by_rank(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.row.cmp(&b.row))
}

/// Ranker over one embedding matrix, with row norms cached at construction
#[derive(Debug, Clone)]
pub struct SimilarityRanker {
    embeddings: EmbeddingMatrix,
    norms: Vec<f64>,
}

impl SimilarityRanker {
    pub fn new(embeddings: EmbeddingMatrix) -> Self {
        let norms = embeddings
            .values()
            .row_iter()
            .map(|row| row.norm())
            .collect();
        Self { embeddings, norms }
    }

    pub fn embeddings(&self) -> &EmbeddingMatrix {
        &self.embeddings
    }

    /// Similarity between two rows, bounds-checked
    pub fn similarity(&self, a: RowPosition, b: RowPosition) -> Result<f64> {
        Ok(cosine_similarity(self.embeddings.row(a)?, self.embeddings.row(b)?))
    }

    /// Scores of every row against `query`, in row order
    pub fn scores(&self, query: RowPosition) -> Result<Vec<f64>> {
        let query_row = self.embeddings.row(query)?;
        let query_norm = self.norms[query];
        let values = self.embeddings.values();

        Ok((0..self.norms.len())
            .into_par_iter()
            .map(|row| {
                let dot = values.row(row).dot(&query_row);
                finite_or_zero(dot / (self.norms[row] * query_norm))
            })
            .collect())
    }

    /// Top `n` items most similar to `query`, excluding `query` itself.
    ///
    /// Returns all candidates when `n` exceeds their count. A `query`
    /// outside the embedding matrix is an alignment error.
    #[instrument(skip(self), fields(rows = self.norms.len()))]
    pub fn rank(&self, query: RowPosition, n: usize) -> Result<Vec<ScoredItem>> {
        alignment::ensure_in_bounds("embedding matrix", query, self.norms.len())?;

        let mut candidates: Vec<ScoredItem> = self
            .scores(query)?
            .into_iter()
            .enumerate()
            .filter(|(row, _)| *row != query)
            .map(|(row, score)| ScoredItem { row, score })
            .collect();

        let n = n.min(candidates.len());
        if n == 0 {
            return Ok(Vec::new());
        }
        if n < candidates.len() {
            candidates.select_nth_unstable_by(n - 1, by_rank);
            candidates.truncate(n);
        }
        candidates.sort_unstable_by(by_rank);

        debug!(
            "Ranked {} neighbours of row {} (best {:.4})",
            candidates.len(),
            query,
            candidates[0].score
        );
        Ok(candidates
            .into_iter()
            .map(|item| ScoredItem {
                score: round_score(item.score),
                ..item
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Catalog, MovieRecord};
    use models::ModelError;

    fn ranker(rows: &[Vec<f64>]) -> SimilarityRanker {
        let records = (0..rows.len())
            .map(|i| MovieRecord::new(i as u32 + 1, format!("Movie {}", i), vec![]))
            .collect();
        let catalog = Catalog::finalize(records).unwrap();
        SimilarityRanker::new(EmbeddingMatrix::from_rows(&catalog, rows).unwrap())
    }

    fn sample() -> SimilarityRanker {
        ranker(&[
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.1],
            vec![0.0, 1.0, 0.12],
            vec![0.5, 0.5, 0.0],
            vec![-1.0, 0.2, 0.0],
        ])
    }

    #[test]
    fn test_query_is_excluded() {
        let ranker = sample();
        for query in 0..5 {
            let ranked = ranker.rank(query, 10).unwrap();
            assert_eq!(ranked.len(), 4);
            assert!(ranked.iter().all(|item| item.row != query));
        }
    }

    #[test]
    fn test_length_and_order() {
        let ranker = sample();
        for n in 0..7 {
            let ranked = ranker.rank(1, n).unwrap();
            assert_eq!(ranked.len(), n.min(4));
            for pair in ranked.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
        }
        let ranked = ranker.rank(1, 2).unwrap();
        assert_eq!(ranked[0].row, 2);
        assert_eq!(ranked[1].row, 3);
    }

    #[test]
    fn test_self_similarity_and_symmetry() {
        let ranker = sample();
        for a in 0..5 {
            assert!((ranker.similarity(a, a).unwrap() - 1.0).abs() < 1e-12);
            for b in 0..5 {
                assert_eq!(ranker.similarity(a, b).unwrap(), ranker.similarity(b, a).unwrap());
            }
        }
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let ranker = ranker(&[vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(ranker.scores(0).unwrap(), vec![0.0, 0.0, 0.0]);

        let ranked = ranker.rank(1, 2).unwrap();
        assert_eq!(ranked[0].row, 0);
        assert_eq!(ranked[0].score, 0.0);
        assert_eq!(ranked[1].row, 2);
        assert!(ranked.iter().all(|item| item.score.is_finite()));
    }

    #[test]
    fn test_ties_break_by_row_position() {
        let ranker = ranker(&[
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 2.0],
            vec![0.0, 3.0],
        ]);
        let rows: Vec<_> = ranker.rank(0, 3).unwrap().iter().map(|i| i.row).collect();
        assert_eq!(rows, vec![1, 2, 3]);
        let rows: Vec<_> = ranker.rank(0, 2).unwrap().iter().map(|i| i.row).collect();
        assert_eq!(rows, vec![1, 2]);
    }

    #[test]
    fn test_scores_are_rounded() {
        let ranker = ranker(&[vec![1.0, 0.0], vec![1.0, 1.0]]);
        let ranked = ranker.rank(0, 1).unwrap();
        assert_eq!(ranked[0].score, 0.7071);
    }

    #[test]
    fn test_out_of_bounds_query_is_alignment_error() {
        let ranker = sample();
        assert!(matches!(ranker.rank(5, 3), Err(ModelError::Alignment(_))));
    }
}
