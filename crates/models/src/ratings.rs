//! Dense id maps and the sparse user × item rating matrix.

use crate::alignment;
use crate::error::{IdKind, ModelError, Result};
use crate::linalg::LinearOperator;
use data_loader::Interaction;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Bijection between external ids and dense zero-based indices.
///
/// Indices are assigned in ascending id order, so the same id set always
/// yields the same map regardless of the order records arrive in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct IdMap {
    /// dense index -> external id
    ids: Vec<u32>,
    /// external id -> dense index
    index: HashMap<u32, usize>,
}

impl IdMap {
    /// Map over the distinct ids, assigned in ascending order
    pub fn from_ids(ids: impl IntoIterator<Item = u32>) -> Self {
        let ids: Vec<u32> = ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        let index = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        Self { ids, index }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn id_at(&self, index: usize) -> Option<u32> {
        self.ids.get(index).copied()
    }

    /// External ids in dense-index order
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Like [`index_of`](Self::index_of), reporting the miss as `Unmapped`
    pub fn require(&self, kind: IdKind, id: u32) -> Result<usize> {
        self.index_of(id).ok_or(ModelError::Unmapped { kind, id })
    }
}

impl TryFrom<Vec<u32>> for IdMap {
    type Error = String;

    fn try_from(ids: Vec<u32>) -> std::result::Result<Self, String> {
        let mut index = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if index.insert(*id, i).is_some() {
                return Err(format!("id {} appears twice in id map", id));
            }
        }
        Ok(Self { ids, index })
    }
}

impl From<IdMap> for Vec<u32> {
    fn from(map: IdMap) -> Self {
        map.ids
    }
}

/// Sparse rating matrix in compressed-row form.
///
/// Unobserved cells are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingMatrix {
    nrows: usize,
    ncols: usize,
    row_offsets: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl RatingMatrix {
    /// Build from (row, col, value) triples.
    ///
    /// A later triple for the same cell overwrites the earlier one. A triple
    /// outside `nrows` x `ncols` is an alignment error.
    pub fn from_entries(
        nrows: usize,
        ncols: usize,
        entries: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Result<Self> {
        let mut cells: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for (row, col, value) in entries {
            alignment::ensure_in_bounds("rating matrix rows", row, nrows)?;
            alignment::ensure_in_bounds("rating matrix columns", col, ncols)?;
            cells.insert((row, col), value);
        }

        let mut row_offsets = vec![0usize; nrows + 1];
        let mut cols = Vec::with_capacity(cells.len());
        let mut values = Vec::with_capacity(cells.len());
        for ((row, col), value) in cells {
            row_offsets[row + 1] += 1;
            cols.push(col);
            values.push(value);
        }
        for row in 0..nrows {
            row_offsets[row + 1] += row_offsets[row];
        }

        Ok(Self {
            nrows,
            ncols,
            row_offsets,
            cols,
            values,
        })
    }

    /// Index the interaction log through the two id maps.
    ///
    /// Interactions whose ids are missing from the maps are skipped.
    pub fn from_interactions(
        interactions: &[Interaction],
        users: &IdMap,
        items: &IdMap,
    ) -> Result<Self> {
        Self::from_entries(
            users.len(),
            items.len(),
            interactions.iter().filter_map(|r| {
                Some((
                    users.index_of(r.user_id)?,
                    items.index_of(r.movie_id)?,
                    f64::from(r.rating),
                ))
            }),
        )
    }

    /// Number of stored cells
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let range = *self.row_offsets.get(row)?..*self.row_offsets.get(row + 1)?;
        let cols = &self.cols[range.clone()];
        cols.binary_search(&col)
            .ok()
            .map(|offset| self.values[range.start + offset])
    }

    fn row_entries(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_offsets[row]..self.row_offsets[row + 1];
        self.cols[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }
}

impl LinearOperator for RatingMatrix {
    fn nrows(&self) -> usize {
        self.nrows
    }

    fn ncols(&self) -> usize {
        self.ncols
    }

    fn apply(&self, rhs: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = DMatrix::zeros(self.nrows, rhs.ncols());
        for row in 0..self.nrows {
            for (col, value) in self.row_entries(row) {
                for k in 0..rhs.ncols() {
                    out[(row, k)] += value * rhs[(col, k)];
                }
            }
        }
        out
    }

    fn apply_transpose(&self, rhs: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = DMatrix::zeros(self.ncols, rhs.ncols());
        for row in 0..self.nrows {
            for (col, value) in self.row_entries(row) {
                for k in 0..rhs.ncols() {
                    out[(col, k)] += value * rhs[(row, k)];
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_map_assigns_ascending_order() {
        let map = IdMap::from_ids([30, 10, 20, 10]);
        assert_eq!(map.ids(), &[10, 20, 30]);
        assert_eq!(map.index_of(20), Some(1));
        assert_eq!(map.id_at(2), Some(30));
        assert_eq!(map.index_of(99), None);
        assert!(matches!(
            map.require(IdKind::User, 99),
            Err(ModelError::Unmapped { kind: IdKind::User, id: 99 })
        ));
    }

    #[test]
    fn test_id_map_serde_rejects_duplicates() {
        let map = IdMap::from_ids([3, 1, 2]);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, "[1,2,3]");
        assert_eq!(serde_json::from_str::<IdMap>(&json).unwrap(), map);
        assert!(serde_json::from_str::<IdMap>("[1,1]").is_err());
    }

    #[test]
    fn test_later_duplicate_overwrites() {
        let matrix = RatingMatrix::from_entries(2, 2, [(0, 1, 3.0), (1, 0, 2.0), (0, 1, 5.0)]).unwrap();
        assert_eq!(matrix.nnz(), 2);
        assert_eq!(matrix.get(0, 1), Some(5.0));
        assert_eq!(matrix.get(1, 1), None);
    }

    #[test]
    fn test_out_of_range_entry_is_alignment_error() {
        let err = RatingMatrix::from_entries(2, 2, [(0, 1, 3.0), (2, 0, 1.0)]).unwrap_err();
        assert!(matches!(err, ModelError::Alignment(_)));
        let err = RatingMatrix::from_entries(2, 2, [(1, 2, 1.0)]).unwrap_err();
        assert!(matches!(err, ModelError::Alignment(_)));
    }

    #[test]
    fn test_sparse_products_match_dense() {
        let matrix = RatingMatrix::from_entries(
            3,
            4,
            [(0, 0, 1.0), (0, 3, 2.0), (1, 1, 4.0), (2, 0, 0.5), (2, 2, 3.0)],
        )
        .unwrap();
        let dense = DMatrix::from_row_slice(
            3,
            4,
            &[1.0, 0.0, 0.0, 2.0, 0.0, 4.0, 0.0, 0.0, 0.5, 0.0, 3.0, 0.0],
        );
        let x = DMatrix::from_fn(4, 2, |i, j| (i + 2 * j) as f64);
        let y = DMatrix::from_fn(3, 2, |i, j| (i * j + 1) as f64);

        assert_eq!(matrix.apply(&x), &dense * &x);
        assert_eq!(matrix.apply_transpose(&y), dense.tr_mul(&y));
    }

    #[test]
    fn test_from_interactions_uses_dense_indices() {
        let log = vec![
            Interaction::new(7, 100, 4.0),
            Interaction::new(3, 200, 2.5),
            Interaction::new(7, 200, 5.0),
        ];
        let users = IdMap::from_ids(log.iter().map(|r| r.user_id));
        let items = IdMap::from_ids(log.iter().map(|r| r.movie_id));
        let matrix = RatingMatrix::from_interactions(&log, &users, &items).unwrap();

        // user 3 -> 0, user 7 -> 1; item 100 -> 0, item 200 -> 1
        assert_eq!(matrix.get(1, 0), Some(4.0));
        assert_eq!(matrix.get(0, 1), Some(2.5));
        assert_eq!(matrix.get(1, 1), Some(5.0));
    }
}
