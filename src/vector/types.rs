//! Core types for the vector index.
//!
//! Entries carry an arbitrary JSON metadata object alongside their id and
//! vector. Errors follow the project convention of ending with an
//! actionable suggestion.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Arbitrary key-value metadata attached to an index entry.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A single hit returned by [`VectorIndex::search`](crate::vector::VectorIndex::search).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Caller-supplied entry id.
    pub id: String,

    /// Cosine similarity to the query, in `[-1.0, 1.0]`.
    pub score: f32,

    /// Metadata stored with the entry.
    pub metadata: Metadata,
}

/// Errors that can occur during vector index operations.
#[derive(Error, Debug)]
pub enum VectorError {
    #[error("Storage error: {0}\nSuggestion: Check disk space and file permissions")]
    Io(#[from] std::io::Error),

    #[error(
        "Invalid artifact format in '{path}': {reason}\nSuggestion: Rebuild the index; the file may be truncated or written by another tool"
    )]
    InvalidFormat { path: PathBuf, reason: String },

    #[error(
        "Checksum mismatch in '{path}'\nSuggestion: The optimized index is corrupted; saving the index again regenerates it"
    )]
    ChecksumMismatch { path: PathBuf },

    #[error(
        "Persisted state is inconsistent: {vectors} vectors, {ids} ids, {metadatas} metadata records\nSuggestion: Rebuild the index from the source documents"
    )]
    RowCountMismatch {
        vectors: usize,
        ids: usize,
        metadatas: usize,
    },

    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors come from the same embedding generator"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "Serialization error: {0}\nSuggestion: Check that metadata values are valid JSON and the file is not corrupted"
    )]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for vector operations
pub type VectorResult<T> = Result<T, VectorError>;
