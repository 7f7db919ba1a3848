//! Cosine similarity primitives shared by the brute-force and flat search paths.
//!
//! Both paths go through the same `normalize` and `dot` routines so their
//! scores agree bit for bit on identical inputs.

use std::cmp::Ordering;

/// Euclidean norm of a vector.
#[must_use]
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Returns a unit-length copy of `vector`.
///
/// A zero-norm vector is divided by 1.0 instead, so it comes back unchanged.
#[must_use]
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm = l2_norm(vector);
    let divisor = if norm == 0.0 { 1.0 } else { norm };
    vector.iter().map(|x| x / divisor).collect()
}

/// Inner product of two equal-length vectors.
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "dot product of mismatched dimensions");
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity between two vectors.
///
/// Each side is normalized independently; a zero vector scores 0.0
/// against everything.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    dot(&normalize(a), &normalize(b))
}

/// Ranking order for scored rows: score descending, then row index ascending.
///
/// Adding 0.0 folds -0.0 into 0.0 so both zeros tie under `total_cmp`.
pub(crate) fn rank_order(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    (b.1 + 0.0)
        .total_cmp(&(a.1 + 0.0))
        .then_with(|| a.0.cmp(&b.0))
}

/// Selects the `k` best `(row, score)` pairs.
///
/// Ties are broken by the lower row index so results are deterministic
/// regardless of how the scores were computed.
#[must_use]
pub fn top_k(mut scored: Vec<(usize, f32)>, k: usize) -> Vec<(usize, f32)> {
    if k == 0 || scored.is_empty() {
        return Vec::new();
    }
    if k < scored.len() {
        scored.select_nth_unstable_by(k - 1, rank_order);
        scored.truncate(k);
    }
    scored.sort_unstable_by(rank_order);
    scored
}
