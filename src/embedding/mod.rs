//! Text embedding generation.
//!
//! Two strategies implement [`EmbeddingGenerator`]:
//! - [`FastEmbedGenerator`] wraps a pretrained fastembed encoder.
//! - [`TfIdfSvdGenerator`] is a deterministic TF-IDF + truncated SVD
//!   fallback that needs no model download.
//!
//! The strategy is picked once by [`create_generator`]; an encoder that
//! fails to load downgrades that generator to the fallback for good.

mod encoder;
mod generator;
mod sparse;
mod statistical;
mod svd;
mod tfidf;

pub use encoder::{FastEmbedGenerator, model_to_string, parse_embedding_model};
pub use generator::{EmbeddingBackend, EmbeddingError, EmbeddingGenerator, EmbeddingResult};
pub use sparse::{DenseMatrix, SparseMatrix};
pub use statistical::TfIdfSvdGenerator;
pub use svd::{SvdParams, TruncatedSvd, symmetric_eigen};
pub use tfidf::{TfIdfModel, tokenize};

#[cfg(test)]
pub use generator::MockEmbeddingGenerator;

use tracing::{info, warn};

use crate::config::{EmbeddingBackendKind, EmbeddingConfig};

/// Build the generator selected by `config`, loading the fastembed encoder
/// when requested.
///
/// Never fails: an encoder that cannot be loaded is logged and replaced by
/// the statistical generator.
pub fn create_generator(config: &EmbeddingConfig) -> Box<dyn EmbeddingGenerator> {
    create_generator_with(config, |config| {
        FastEmbedGenerator::new(config).map(|g| Box::new(g) as Box<dyn EmbeddingGenerator>)
    })
}

/// Like [`create_generator`], with the encoder probe supplied by the caller.
///
/// The probe runs at most once, and only when `config.backend` asks for the
/// encoder.
pub fn create_generator_with<F>(config: &EmbeddingConfig, probe: F) -> Box<dyn EmbeddingGenerator>
where
    F: FnOnce(&EmbeddingConfig) -> EmbeddingResult<Box<dyn EmbeddingGenerator>>,
{
    match config.backend {
        EmbeddingBackendKind::Statistical => {
            info!("Using statistical embedding backend");
            Box::new(TfIdfSvdGenerator::new(config))
        }
        EmbeddingBackendKind::Encoder => match probe(config) {
            Ok(generator) => {
                info!(model = %config.model, "Using encoder embedding backend");
                generator
            }
            Err(e) => {
                warn!(error = %e, "Encoder unavailable, falling back to statistical embeddings");
                Box::new(TfIdfSvdGenerator::new(config))
            }
        },
    }
}
