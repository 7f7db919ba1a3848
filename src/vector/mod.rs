//! Persisted similarity index over document vectors.
//!
//! This module stores `(id, vector, metadata)` entries, persists them to an
//! index directory, and answers top-k cosine similarity queries.
//!
//! # Architecture
//! Two search paths share one ranking contract (score descending, ties by
//! insertion order):
//! - an optimized structure chosen through the [`OptimizedBackend`] strategy
//!   (currently an exact inner-product index over pre-normalized rows), and
//! - a brute-force scan that normalizes every stored vector on the fly.
//!
//! The brute-force scan is the correctness reference; the optimized path is
//! used only when its artifact loads cleanly and covers the resident rows.

mod backend;
mod flat;
mod index;
mod similarity;
mod storage;
mod types;

// Re-export core types for public API
pub use backend::{NeighborSearch, OptimizedBackend, create_backend};
pub use flat::{FLAT_INDEX_FILE, FlatInnerProduct, FlatInnerProductIndex};
pub use index::VectorIndex;
pub use similarity::{cosine_similarity, dot, l2_norm, normalize, top_k};
pub use storage::{IndexState, IndexStorage, META_FILE, VECTORS_FILE, read_npy, write_npy};
pub use types::{Metadata, SearchResult, VectorError, VectorResult};
