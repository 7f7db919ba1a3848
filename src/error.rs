//! Error types for the embedding and vector index pipeline
//!
//! This module ties the per-module error enums together into a single
//! crate-level error so callers orchestrating both halves of the pipeline
//! can use one `Result` type with actionable messages.

use crate::embedding::EmbeddingError;
use crate::vector::VectorError;
use thiserror::Error;

/// Top-level error for pipeline operations
#[derive(Error, Debug)]
pub enum DocvecError {
    /// Embedding generation errors
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Vector index and persistence errors
    #[error(transparent)]
    Vector(#[from] VectorError),

    /// Configuration errors
    #[error("Invalid configuration: {0}\nSuggestion: Check .docvec/settings.toml and DOCVEC_* environment variables")]
    Config(#[from] Box<figment::Error>),

    /// Embedding count does not line up with the documents that were submitted
    #[error("Embedding generator returned {actual} vectors for {expected} documents")]
    BatchSizeMismatch { expected: usize, actual: usize },
}

impl DocvecError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::Embedding(EmbeddingError::ModelInit(_)) => "ENCODER_INIT_ERROR",
            Self::Embedding(EmbeddingError::UnknownModel(_)) => "UNKNOWN_MODEL",
            Self::Embedding(_) => "EMBEDDING_ERROR",
            Self::Vector(VectorError::Io(_)) => "STORAGE_IO_ERROR",
            Self::Vector(VectorError::InvalidFormat { .. })
            | Self::Vector(VectorError::ChecksumMismatch { .. })
            | Self::Vector(VectorError::RowCountMismatch { .. }) => "INDEX_CORRUPTED",
            Self::Vector(_) => "VECTOR_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::BatchSizeMismatch { .. } => "BATCH_SIZE_MISMATCH",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Vector(VectorError::InvalidFormat { .. })
            | Self::Vector(VectorError::ChecksumMismatch { .. })
            | Self::Vector(VectorError::RowCountMismatch { .. }) => vec![
                "Delete the index directory and rebuild it from the source documents",
                "Check for disk errors or an interrupted save",
            ],
            Self::Vector(VectorError::Io(_)) => vec![
                "Check that the index directory exists and is writable",
                "Check available disk space",
            ],
            Self::Embedding(EmbeddingError::ModelInit(_)) => vec![
                "Ensure network access for the first model download",
                "Set embedding.backend = \"statistical\" to skip the pretrained encoder",
            ],
            Self::Embedding(EmbeddingError::UnknownModel(_)) => vec![
                "Use one of: AllMiniLML6V2, AllMiniLML12V2, BGESmallENV15, BGEBaseENV15, MultilingualE5Small",
            ],
            Self::Config(_) => vec![
                "Run with default settings by removing .docvec/settings.toml",
            ],
            _ => vec![],
        }
    }
}

/// Result type alias for pipeline operations
pub type DocvecResult<T> = Result<T, DocvecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_stable() {
        let err: DocvecError = VectorError::RowCountMismatch {
            vectors: 3,
            ids: 2,
            metadatas: 2,
        }
        .into();
        assert_eq!(err.status_code(), "INDEX_CORRUPTED");
        assert!(!err.recovery_suggestions().is_empty());

        let err: DocvecError = EmbeddingError::UnknownModel("nope".to_string()).into();
        assert_eq!(err.status_code(), "UNKNOWN_MODEL");

        let err = DocvecError::BatchSizeMismatch {
            expected: 2,
            actual: 1,
        };
        assert_eq!(err.status_code(), "BATCH_SIZE_MISMATCH");
        assert!(err.recovery_suggestions().is_empty());
    }
}
