//! Truncated SVD via randomized range finding.
//!
//! The solver only needs `A * X` and `Aᵀ * X` products, so the same code
//! factorizes dense feature matrices and the sparse rating matrix through the
//! [`LinearOperator`] trait.
//!
//! ## Algorithm
//! 1. Draw a seeded random test matrix Ω (n × l), l = rank + oversamples
//! 2. Q = orth(A Ω), refined by `power_iterations` rounds of
//!    Q = orth(A orth(Aᵀ Q))
//! 3. B = Qᵀ A (small, l × n), exact SVD B = Ũ Σ Vᵀ
//! 4. U = Q Ũ, keep the `rank` largest singular triplets
//! 5. Fix signs so the largest-magnitude entry of every U column is positive

use crate::error::{ModelError, Result};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;

/// Anything that can be multiplied against a dense block from both sides.
pub trait LinearOperator {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;
    /// `self * rhs`
    fn apply(&self, rhs: &DMatrix<f64>) -> DMatrix<f64>;
    /// `selfᵀ * rhs`
    fn apply_transpose(&self, rhs: &DMatrix<f64>) -> DMatrix<f64>;
}

impl LinearOperator for DMatrix<f64> {
    fn nrows(&self) -> usize {
        self.shape().0
    }

    fn ncols(&self) -> usize {
        self.shape().1
    }

    fn apply(&self, rhs: &DMatrix<f64>) -> DMatrix<f64> {
        self * rhs
    }

    fn apply_transpose(&self, rhs: &DMatrix<f64>) -> DMatrix<f64> {
        self.tr_mul(rhs)
    }
}

/// Rank-k factors `A ≈ U diag(σ) Vᵀ`
#[derive(Debug, Clone, PartialEq)]
pub struct TruncatedSvd {
    /// m × k, orthonormal columns
    pub u: DMatrix<f64>,
    /// k singular values, non-increasing
    pub singular_values: DVector<f64>,
    /// n × k, orthonormal columns
    pub v: DMatrix<f64>,
}

impl TruncatedSvd {
    pub fn rank(&self) -> usize {
        self.singular_values.len()
    }

    /// `U diag(σ)`, the projection of A's rows onto the top-k components
    pub fn scaled_u(&self) -> DMatrix<f64> {
        scale_columns(self.u.clone(), &self.singular_values)
    }

    /// `(U diag(√σ), V diag(√σ))`, so that row products reproduce `U diag(σ) Vᵀ`
    pub fn split_sqrt(&self) -> (DMatrix<f64>, DMatrix<f64>) {
        let root = self.singular_values.map(f64::sqrt);
        (
            scale_columns(self.u.clone(), &root),
            scale_columns(self.v.clone(), &root),
        )
    }

    /// `U diag(σ) Vᵀ`
    pub fn reconstruct(&self) -> DMatrix<f64> {
        self.scaled_u() * self.v.transpose()
    }
}

fn scale_columns(mut matrix: DMatrix<f64>, scale: &DVector<f64>) -> DMatrix<f64> {
    for (mut column, factor) in matrix.column_iter_mut().zip(scale.iter()) {
        column *= *factor;
    }
    matrix
}

/// Seeded randomized truncated SVD solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomizedSvd {
    pub rank: usize,
    pub oversamples: usize,
    pub power_iterations: usize,
    pub seed: u64,
}

impl RandomizedSvd {
    pub fn new(rank: usize, seed: u64) -> Self {
        Self {
            rank,
            oversamples: 10,
            power_iterations: 5,
            seed,
        }
    }

    pub fn with_oversamples(mut self, oversamples: usize) -> Self {
        self.oversamples = oversamples;
        self
    }

    pub fn with_power_iterations(mut self, iterations: usize) -> Self {
        self.power_iterations = iterations;
        self
    }

    /// Compute the top-`rank` singular triplets of `a`.
    ///
    /// Fails with a data error when `a` is empty or `rank` is 0 or exceeds
    /// `min(nrows, ncols)`.
    pub fn decompose<A: LinearOperator + ?Sized>(&self, a: &A) -> Result<TruncatedSvd> {
        let (m, n) = (a.nrows(), a.ncols());
        let max_rank = m.min(n);
        if max_rank == 0 {
            return Err(ModelError::Data(format!(
                "cannot factorize an empty {}x{} matrix",
                m, n
            )));
        }
        if self.rank == 0 || self.rank > max_rank {
            return Err(ModelError::Data(format!(
                "rank {} outside 1..={} for a {}x{} matrix",
                self.rank, max_rank, m, n
            )));
        }

        let sketch = (self.rank + self.oversamples).min(max_rank);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let omega = DMatrix::from_fn(n, sketch, |_, _| rng.random_range(-1.0..1.0));

        let mut q = orthonormal_basis(a.apply(&omega));
        for _ in 0..self.power_iterations {
            let z = orthonormal_basis(a.apply_transpose(&q));
            q = orthonormal_basis(a.apply(&z));
        }

        // B = Qᵀ A, formed as (Aᵀ Q)ᵀ
        let b = a.apply_transpose(&q).transpose();
        let svd = b.svd(true, true);
        let u_small = svd
            .u
            .ok_or_else(|| ModelError::Data("SVD failed to compute U".to_string()))?;
        let v_t = svd
            .v_t
            .ok_or_else(|| ModelError::Data("SVD failed to compute V^T".to_string()))?;
        let sigma = svd.singular_values;

        let mut order: Vec<usize> = (0..sigma.len()).collect();
        order.sort_by(|&i, &j| {
            sigma[j]
                .partial_cmp(&sigma[i])
                .unwrap_or(Ordering::Equal)
                .then(i.cmp(&j))
        });
        order.truncate(self.rank);

        let u_full = &q * u_small;
        let mut u = DMatrix::zeros(m, self.rank);
        let mut v = DMatrix::zeros(n, self.rank);
        let mut singular_values = DVector::zeros(self.rank);
        for (col, &idx) in order.iter().enumerate() {
            u.set_column(col, &u_full.column(idx));
            v.set_column(col, &v_t.row(idx).transpose());
            singular_values[col] = sigma[idx];
        }
        flip_signs(&mut u, &mut v);

        Ok(TruncatedSvd {
            u,
            singular_values,
            v,
        })
    }
}

fn orthonormal_basis(y: DMatrix<f64>) -> DMatrix<f64> {
    y.qr().q()
}

/// Make the largest-magnitude entry of each U column positive, flipping the
/// matching V column with it.
fn flip_signs(u: &mut DMatrix<f64>, v: &mut DMatrix<f64>) {
    for col in 0..u.ncols() {
        let mut pivot = 0.0f64;
        for value in u.column(col).iter() {
            if value.abs() > pivot.abs() {
                pivot = *value;
            }
        }
        if pivot < 0.0 {
            u.column_mut(col).neg_mut();
            v.column_mut(col).neg_mut();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank_two_matrix() -> DMatrix<f64> {
        let a = DMatrix::from_row_slice(6, 2, &[1.0, 0.0, 2.0, 1.0, 0.0, 3.0, 1.0, 1.0, 4.0, 0.5, 2.0, 2.0]);
        let b = DMatrix::from_row_slice(2, 4, &[1.0, 2.0, 0.0, 1.0, 0.0, 1.0, 3.0, 1.0]);
        a * b
    }

    #[test]
    fn test_recovers_exact_low_rank_matrix() {
        let a = rank_two_matrix();
        let svd = RandomizedSvd::new(2, 7).decompose(&a).unwrap();

        assert_eq!(svd.rank(), 2);
        assert!((svd.reconstruct() - &a).norm() < 1e-8);
    }

    #[test]
    fn test_singular_values_match_full_svd() {
        let a = DMatrix::from_fn(8, 5, |i, j| ((i * 7 + j * 3) % 5) as f64 - 1.5 + (i as f64) * 0.1);
        let full = a.clone().svd(false, false);
        let mut expected: Vec<f64> = full.singular_values.iter().copied().collect();
        expected.sort_by(|x, y| y.partial_cmp(x).unwrap());

        let svd = RandomizedSvd::new(3, 42).decompose(&a).unwrap();
        for i in 0..3 {
            assert!((svd.singular_values[i] - expected[i]).abs() < 1e-8);
        }
        for i in 1..3 {
            assert!(svd.singular_values[i - 1] >= svd.singular_values[i]);
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let a = DMatrix::from_fn(30, 12, |i, j| ((i * j + 3) % 11) as f64);
        let solver = RandomizedSvd::new(4, 42).with_oversamples(2);
        assert_eq!(solver.decompose(&a).unwrap(), solver.decompose(&a).unwrap());
    }

    #[test]
    fn test_sqrt_split_reproduces_reconstruction() {
        let a = rank_two_matrix();
        let svd = RandomizedSvd::new(2, 1).decompose(&a).unwrap();
        let (left, right) = svd.split_sqrt();
        assert!((left * right.transpose() - svd.reconstruct()).norm() < 1e-10);
    }

    #[test]
    fn test_rejects_invalid_rank() {
        let a = DMatrix::<f64>::zeros(3, 2);
        assert!(matches!(
            RandomizedSvd::new(0, 1).decompose(&a),
            Err(ModelError::Data(_))
        ));
        assert!(matches!(
            RandomizedSvd::new(3, 1).decompose(&a),
            Err(ModelError::Data(_))
        ));
        assert!(matches!(
            RandomizedSvd::new(1, 1).decompose(&DMatrix::<f64>::zeros(0, 4)),
            Err(ModelError::Data(_))
        ));
    }
}
