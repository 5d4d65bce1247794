use crate::error::{Result, VectorStoreError};
use ndarray::{Array2, ArrayView1};

/// Exact (brute-force) vector index over squared Euclidean distance.
///
/// Rows keep insertion order, so row `i` always belongs to chunk `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Array2<f32>,
}

impl FlatIndex {
    /// Build from rows; every row must have the same non-zero length.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(VectorStoreError::InvalidInput(
                "cannot build an index from zero vectors".to_string(),
            ));
        };
        let dimension = first.len();
        if dimension == 0 {
            return Err(VectorStoreError::InvalidInput(
                "vectors must have at least one dimension".to_string(),
            ));
        }

        let mut flat = Vec::with_capacity(rows.len() * dimension);
        for row in rows {
            if row.len() != dimension {
                return Err(VectorStoreError::InvalidDimension {
                    expected: dimension,
                    actual: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }
        Self::from_flat(dimension, flat)
    }

    /// Build from a row-major buffer of `count * dimension` values.
    pub fn from_flat(dimension: usize, flat: Vec<f32>) -> Result<Self> {
        if dimension == 0 || flat.len() % dimension != 0 {
            return Err(VectorStoreError::InvalidInput(format!(
                "buffer of {} values does not hold whole vectors of dimension {dimension}",
                flat.len()
            )));
        }
        let count = flat.len() / dimension;
        let vectors = Array2::from_shape_vec((count, dimension), flat)
            .map_err(|e| VectorStoreError::InvalidInput(format!("bad vector buffer: {e}")))?;
        Ok(Self { dimension, vectors })
    }

    /// The `k` nearest rows as `(row, squared distance)`, ascending by distance.
    /// Equal distances keep row order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let query = ArrayView1::from(query);
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .rows()
            .into_iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let diff = &row - &query;
                (row_idx, diff.dot(&diff))
            })
            .collect();

        // `sort_by` is stable, which keeps ties in row order.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        Ok(scored)
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.nrows() == 0
    }

    /// Row-major view of every stored value
    #[must_use]
    pub fn as_flat(&self) -> &[f32] {
        // Built through `from_shape_vec`, so always contiguous.
        self.vectors.as_slice().unwrap_or(&[])
    }

    #[must_use]
    pub fn row(&self, idx: usize) -> Option<&[f32]> {
        if idx >= self.len() {
            return None;
        }
        let start = idx * self.dimension;
        Some(&self.as_flat()[start..start + self.dimension])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_search() {
        let index = FlatIndex::from_rows(&[
            vec![1.0, 0.0, 0.0],
            vec![0.9, 0.1, 0.0],
            vec![0.0, 1.0, 0.0],
        ])
        .unwrap();

        assert_eq!(index.len(), 3);

        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);

        // Exact match first
        assert_eq!(results[0].0, 0);
        assert!(results[0].1.abs() < 1e-6);

        assert_eq!(results[1].0, 1);
        assert!((results[1].1 - 0.02).abs() < 1e-6);
    }

    #[test]
    fn top_k_larger_than_index_returns_everything() {
        let index = FlatIndex::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let results = index.search(&[0.0, 1.0], 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0);
        assert!((results[1].1 - 2.0).abs() < 1e-6);
    }

    #[test]
    fn ties_keep_row_order() {
        let index =
            FlatIndex::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, -1.0]]).unwrap();
        let results = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results[0].0, 1);
        assert_eq!(results[1].0, 0);
        assert_eq!(results[2].0, 2);
        assert_eq!(results[1].1, results[2].1);
    }

    #[test]
    fn test_dimension_mismatch() {
        let result = FlatIndex::from_rows(&[vec![1.0, 0.0, 0.0], vec![1.0, 0.0]]);
        assert!(matches!(
            result,
            Err(VectorStoreError::InvalidDimension {
                expected: 3,
                actual: 2
            })
        ));

        let index = FlatIndex::from_rows(&[vec![1.0, 0.0, 0.0]]).unwrap();
        assert!(index.search(&[1.0, 0.0], 1).is_err());
    }

    #[test]
    fn flat_buffer_roundtrip() {
        let index = FlatIndex::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(index.as_flat(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(index.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(index.row(2), None);

        let rebuilt = FlatIndex::from_flat(2, index.as_flat().to_vec()).unwrap();
        assert_eq!(rebuilt, index);
        assert!(FlatIndex::from_flat(3, vec![1.0, 2.0]).is_err());
    }
}
