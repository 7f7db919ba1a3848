//! Randomized truncated SVD.
//!
//! Finds the top right singular vectors of a sparse `N x F` matrix `A`
//! without forming `AᵀA`:
//!
//! 1. Sample a range basis `Q = orth(A·Ω)` with a seeded uniform test
//!    matrix `Ω` (`F x l`, `l = C + oversamples`).
//! 2. Sharpen it with power iterations `Q = orth(A·orth(Aᵀ·Q))`.
//! 3. Form `Bᵀ = Aᵀ·Q` and solve the small `l x l` eigenproblem of
//!    `B·Bᵀ` with cyclic Jacobi rotations.
//! 4. Recover right singular vectors as `v = Bᵀ·u / σ`.
//!
//! Everything is computed in `f64` and driven by a single `StdRng`, so the
//! same matrix and seed always give bit-identical components.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::embedding::sparse::{DenseMatrix, SparseMatrix};

const MAX_JACOBI_SWEEPS: usize = 64;

/// Parameters of one fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvdParams {
    pub n_components: usize,
    pub power_iterations: usize,
    pub oversamples: usize,
    pub seed: u64,
}

/// Fitted right singular vectors, one `F`-length row per component.
#[derive(Debug, Clone, PartialEq)]
pub struct TruncatedSvd {
    components: Vec<Vec<f64>>,
    singular_values: Vec<f64>,
}

impl TruncatedSvd {
    /// Fits `params.n_components` components of `matrix`.
    ///
    /// Components beyond the numerical rank of `matrix` come back as zero
    /// vectors so the output dimension is always `n_components`.
    pub fn fit(matrix: &SparseMatrix, params: SvdParams) -> Self {
        let n_rows = matrix.n_rows();
        let n_cols = matrix.n_cols();
        let n_components = params.n_components;
        if n_components == 0 || n_rows == 0 || n_cols == 0 {
            return Self {
                components: vec![vec![0.0; n_cols]; n_components],
                singular_values: vec![0.0; n_components],
            };
        }

        let sample_width = (n_components + params.oversamples)
            .min(n_rows.min(n_cols))
            .max(n_components);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let omega = DenseMatrix::from_fn(n_cols, sample_width, |_, _| rng.random_range(-1.0..1.0));

        let mut q = matrix.mul_dense(&omega);
        q.orthonormalize_columns();
        for _ in 0..params.power_iterations {
            let mut z = matrix.transpose_mul_dense(&q);
            z.orthonormalize_columns();
            q = matrix.mul_dense(&z);
            q.orthonormalize_columns();
        }

        let bt = matrix.transpose_mul_dense(&q);
        let (eigenvalues, eigenvectors) = symmetric_eigen(&bt.gram());

        let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]).then(a.cmp(&b)));

        let largest = order
            .first()
            .map(|&i| eigenvalues[i].max(0.0).sqrt())
            .unwrap_or(0.0);
        let cutoff = largest * 1e-10;

        let mut components = Vec::with_capacity(n_components);
        let mut singular_values = Vec::with_capacity(n_components);
        for &slot in order.iter().take(n_components) {
            let sigma = eigenvalues[slot].max(0.0).sqrt();
            if sigma <= cutoff {
                components.push(vec![0.0; n_cols]);
                singular_values.push(0.0);
                continue;
            }

            let u = eigenvectors.column(slot);
            let mut v: Vec<f64> = (0..n_cols)
                .map(|k| bt.row(k).iter().zip(&u).map(|(b, u)| b * u).sum::<f64>() / sigma)
                .collect();
            flip_sign(&mut v);
            components.push(v);
            singular_values.push(sigma);
        }
        // Only reachable when the sample is narrower than requested
        while components.len() < n_components {
            components.push(vec![0.0; n_cols]);
            singular_values.push(0.0);
        }

        Self {
            components,
            singular_values,
        }
    }

    #[must_use]
    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }

    /// Projects a sparse row onto the components.
    #[must_use]
    pub fn project(&self, row: &[(usize, f64)]) -> Vec<f64> {
        self.components
            .iter()
            .map(|component| {
                row.iter()
                    .map(|&(column, value)| value * component[column])
                    .sum()
            })
            .collect()
    }
}

/// Makes the largest-magnitude entry positive (first one wins on ties).
fn flip_sign(v: &mut [f64]) {
    let mut pivot = 0.0_f64;
    for &x in v.iter() {
        if x.abs() > pivot.abs() {
            pivot = x;
        }
    }
    if pivot < 0.0 {
        for x in v.iter_mut() {
            *x = -*x;
        }
    }
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns the eigenvalues (unsorted, in diagonal order) and a matrix whose
/// columns are the matching unit eigenvectors.
pub fn symmetric_eigen(matrix: &DenseMatrix) -> (Vec<f64>, DenseMatrix) {
    let n = matrix.rows();
    let mut a: Vec<Vec<f64>> = (0..n).map(|i| matrix.row(i).to_vec()).collect();
    let mut v: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    let total: f64 = a.iter().flatten().map(|x| x * x).sum();
    let threshold = total * f64::EPSILON * f64::EPSILON;

    for _ in 0..MAX_JACOBI_SWEEPS {
        let off_diagonal: f64 = (0..n)
            .flat_map(|p| (0..n).filter(move |&q| q != p).map(move |q| (p, q)))
            .map(|(p, q)| a[p][q] * a[p][q])
            .sum();
        if off_diagonal <= threshold {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[p][q];
                if apq == 0.0 {
                    continue;
                }

                let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
                let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                let t = sign / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for row in a.iter_mut() {
                    let (xp, xq) = (row[p], row[q]);
                    row[p] = c * xp - s * xq;
                    row[q] = s * xp + c * xq;
                }
                for k in 0..n {
                    let (xp, xq) = (a[p][k], a[q][k]);
                    a[p][k] = c * xp - s * xq;
                    a[q][k] = s * xp + c * xq;
                }
                a[p][q] = 0.0;
                a[q][p] = 0.0;
                for row in v.iter_mut() {
                    let (xp, xq) = (row[p], row[q]);
                    row[p] = c * xp - s * xq;
                    row[q] = s * xp + c * xq;
                }
            }
        }
    }

    let eigenvalues = (0..n).map(|i| a[i][i]).collect();
    let eigenvectors = DenseMatrix::from_fn(n, n, |i, j| v[i][j]);
    (eigenvalues, eigenvectors)
}
