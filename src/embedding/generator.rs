//! Embedding generator trait and error types.

use std::fmt;

use thiserror::Error;

/// Which strategy produced a batch of embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbeddingBackend {
    /// Pretrained semantic encoder.
    Encoder,
    /// Deterministic TF-IDF + truncated SVD fallback.
    Statistical,
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoder => write!(f, "encoder"),
            Self::Statistical => write!(f, "statistical"),
        }
    }
}

/// Errors raised while producing embeddings.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error(
        "Failed to initialize embedding model: {0}\nSuggestion: Ensure you have internet connection for first-time model download"
    )]
    ModelInit(String),

    #[error("Unknown embedding model '{0}'\nSuggestion: Check embedding.model in .docvec/settings.toml")]
    UnknownModel(String),

    #[error("Failed to generate embeddings: {0}")]
    EmbeddingFailed(String),

    #[error(
        "Encoder returned a {actual}-dimensional vector, expected {expected}\nSuggestion: Clear the model cache and download the model again"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Failed to acquire embedding model lock - model may be poisoned")]
    LockPoisoned,
}

/// Result type for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Trait for generating embeddings from text.
///
/// A generator is chosen once (see [`crate::embedding::create_generator`])
/// and keeps its backend for its whole lifetime. All vectors returned by
/// one call share a single dimension.
pub trait EmbeddingGenerator: Send + Sync {
    /// Generate one embedding per input text, in input order.
    ///
    /// An empty batch yields an empty result.
    fn generate_embeddings(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// The strategy behind this generator.
    fn backend(&self) -> EmbeddingBackend;

    /// Dimension of produced vectors, if already known.
    ///
    /// Fixed for the encoder; the statistical generator only knows it after
    /// its first fit.
    fn dimension(&self) -> Option<usize>;

    /// Embed a single query text into the same space as the documents.
    ///
    /// Returns `None` when no such space exists yet (a statistical generator
    /// that has not been fitted).
    fn embed_query(&self, text: &str) -> EmbeddingResult<Option<Vec<f32>>> {
        Ok(self.generate_embeddings(&[text])?.into_iter().next())
    }
}

/// Mock embedding generator for testing.
///
/// Produces deterministic unit vectors from keyword hits.
#[cfg(test)]
pub struct MockEmbeddingGenerator {
    dimension: usize,
}

#[cfg(test)]
impl MockEmbeddingGenerator {
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[cfg(test)]
impl EmbeddingGenerator for MockEmbeddingGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let keywords = ["cat", "dog", "fish", "bird"];
        Ok(texts
            .iter()
            .map(|text| {
                let mut embedding = vec![0.1; self.dimension];
                for (slot, keyword) in keywords.iter().enumerate().take(self.dimension) {
                    if text.contains(keyword) {
                        embedding[slot] = 0.9;
                    }
                }
                crate::vector::normalize(&embedding)
            })
            .collect())
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Encoder
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}
