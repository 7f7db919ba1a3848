//! Strategy interface for optimized similarity indexes.
//!
//! A backend knows how to build a [`NeighborSearch`] structure from the
//! resident vectors and how to read one back from its own artifact. The
//! backend is chosen once when the [`VectorIndex`](crate::vector::VectorIndex)
//! is constructed; there is no runtime probing afterwards.

use std::fmt;
use std::path::Path;

use crate::config::OptimizedIndexKind;
use crate::vector::flat::FlatInnerProduct;
use crate::vector::types::VectorResult;

/// A built similarity structure answering inner-product queries.
pub trait NeighborSearch: Send + Sync + fmt::Debug {
    /// Number of indexed rows.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension of the indexed rows.
    fn dimension(&self) -> usize;

    /// Returns up to `k` `(row, score)` pairs for an already normalized
    /// query, ordered by descending score and then ascending row.
    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)>;

    /// Serializes the structure to `path`.
    fn save(&self, path: &Path) -> VectorResult<()>;
}

/// Factory for one kind of optimized index.
pub trait OptimizedBackend: Send + Sync + fmt::Debug {
    /// Human-readable backend name, used in logs.
    fn name(&self) -> &'static str;

    /// File name of the artifact inside the index directory.
    fn file_name(&self) -> &'static str;

    /// Builds the structure from raw (not necessarily normalized) vectors.
    fn build(&self, vectors: &[Vec<f32>]) -> VectorResult<Box<dyn NeighborSearch>>;

    /// Loads a previously saved structure.
    fn load(&self, path: &Path) -> VectorResult<Box<dyn NeighborSearch>>;
}

/// Resolves the configured backend kind into a strategy object.
///
/// Returns `None` when optimized indexing is disabled, in which case every
/// search goes through the brute-force path.
#[must_use]
pub fn create_backend(kind: OptimizedIndexKind) -> Option<Box<dyn OptimizedBackend>> {
    match kind {
        OptimizedIndexKind::Flat => Some(Box::new(FlatInnerProduct)),
        OptimizedIndexKind::Disabled => None,
    }
}
