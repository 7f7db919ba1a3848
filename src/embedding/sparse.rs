//! Minimal matrix types for the statistical embedder.
//!
//! Document-term matrices are very sparse, so they are stored as per-row
//! `(column, value)` lists. The tall-and-thin intermediates of the
//! randomized SVD are small enough to keep dense and row-major.

/// Row-sparse matrix with sorted column indices per row.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    rows: Vec<Vec<(usize, f64)>>,
    n_cols: usize,
}

impl SparseMatrix {
    pub fn new(rows: Vec<Vec<(usize, f64)>>, n_cols: usize) -> Self {
        Self { rows, n_cols }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, i: usize) -> &[(usize, f64)] {
        &self.rows[i]
    }

    /// `self * rhs`, where `rhs` has `n_cols` rows.
    pub fn mul_dense(&self, rhs: &DenseMatrix) -> DenseMatrix {
        debug_assert_eq!(self.n_cols, rhs.rows);
        let mut out = DenseMatrix::zeros(self.rows.len(), rhs.cols);
        for (i, row) in self.rows.iter().enumerate() {
            let target = out.row_mut(i);
            for &(column, value) in row {
                for (t, r) in target.iter_mut().zip(rhs.row(column)) {
                    *t += value * r;
                }
            }
        }
        out
    }

    /// `selfᵀ * rhs`, where `rhs` has `n_rows` rows.
    pub fn transpose_mul_dense(&self, rhs: &DenseMatrix) -> DenseMatrix {
        debug_assert_eq!(self.rows.len(), rhs.rows);
        let mut out = DenseMatrix::zeros(self.n_cols, rhs.cols);
        for (i, row) in self.rows.iter().enumerate() {
            let source = rhs.row(i);
            for &(column, value) in row {
                for (t, s) in out.row_mut(column).iter_mut().zip(source) {
                    *t += value * s;
                }
            }
        }
        out
    }
}

/// Dense row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// `selfᵀ * self`, a `cols x cols` symmetric matrix.
    pub fn gram(&self) -> DenseMatrix {
        let mut out = DenseMatrix::zeros(self.cols, self.cols);
        for i in 0..self.rows {
            let row = self.row(i);
            for p in 0..self.cols {
                if row[p] == 0.0 {
                    continue;
                }
                for q in p..self.cols {
                    out.data[p * self.cols + q] += row[p] * row[q];
                }
            }
        }
        for p in 0..self.cols {
            for q in 0..p {
                out.data[p * self.cols + q] = out.data[q * self.cols + p];
            }
        }
        out
    }

    /// Column `j` as an owned vector.
    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self.get(i, j)).collect()
    }

    /// Orthonormalizes the columns in place with modified Gram-Schmidt,
    /// run twice for numerical stability.
    ///
    /// Columns that are (numerically) in the span of earlier ones become zero.
    pub fn orthonormalize_columns(&mut self) {
        const RANK_TOLERANCE: f64 = 1e-10;

        for j in 0..self.cols {
            let original = self.column_norm(j);
            for _ in 0..2 {
                for p in 0..j {
                    let projection: f64 = (0..self.rows).map(|i| self.get(i, p) * self.get(i, j)).sum();
                    for i in 0..self.rows {
                        self.data[i * self.cols + j] -= projection * self.get(i, p);
                    }
                }
            }

            let norm = self.column_norm(j);
            let scale = if norm > RANK_TOLERANCE * original.max(1.0) {
                1.0 / norm
            } else {
                0.0
            };
            for i in 0..self.rows {
                self.data[i * self.cols + j] *= scale;
            }
        }
    }

    fn column_norm(&self, j: usize) -> f64 {
        (0..self.rows)
            .map(|i| self.get(i, j) * self.get(i, j))
            .sum::<f64>()
            .sqrt()
    }
}
