//! Pretrained encoder backed by fastembed.

use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::embedding::generator::{
    EmbeddingBackend, EmbeddingError, EmbeddingGenerator, EmbeddingResult,
};

/// Resolve a configured model name to a fastembed model.
pub fn parse_embedding_model(name: &str) -> EmbeddingResult<EmbeddingModel> {
    match name {
        "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "AllMiniLML12V2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" => Ok(EmbeddingModel::BGEBaseENV15),
        "MultilingualE5Small" => Ok(EmbeddingModel::MultilingualE5Small),
        other => Err(EmbeddingError::UnknownModel(other.to_string())),
    }
}

/// Configured name of a supported fastembed model.
pub fn model_to_string(model: &EmbeddingModel) -> String {
    match model {
        EmbeddingModel::AllMiniLML6V2 => "AllMiniLML6V2",
        EmbeddingModel::AllMiniLML12V2 => "AllMiniLML12V2",
        EmbeddingModel::BGESmallENV15 => "BGESmallENV15",
        EmbeddingModel::BGEBaseENV15 => "BGEBaseENV15",
        EmbeddingModel::MultilingualE5Small => "MultilingualE5Small",
        _ => "Unknown",
    }
    .to_string()
}

/// Encoder-backed generator.
///
/// The model is loaded (and downloaded on first use) in [`FastEmbedGenerator::new`];
/// its output dimension is measured once with a probe embedding.
pub struct FastEmbedGenerator {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedGenerator")
            .field("model", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedGenerator {
    /// Load the model named in `config`.
    ///
    /// # Errors
    /// Returns an error if the name is unknown or the model fails to
    /// initialize or download.
    pub fn new(config: &EmbeddingConfig) -> EmbeddingResult<Self> {
        let model = parse_embedding_model(&config.model)?;
        let mut text_model = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(config.models_dir())
                .with_show_download_progress(false),
        )
        .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        // Get dimensions by generating a test embedding
        let probe = text_model
            .embed(vec!["test"], None)
            .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;
        let dimension = probe
            .into_iter()
            .next()
            .map(|embedding| embedding.len())
            .ok_or_else(|| EmbeddingError::ModelInit("model returned no probe embedding".to_string()))?;

        debug!(model = %config.model, dimension, "Loaded embedding model");

        Ok(Self {
            model: Mutex::new(text_model),
            model_name: config.model.clone(),
            dimension,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

impl EmbeddingGenerator for FastEmbedGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // fastembed expects owned strings for the embed method
        let text_strings: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();

        let embeddings = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::LockPoisoned)?
            .embed(text_strings, None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        // Validate dimensions
        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Encoder
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}
