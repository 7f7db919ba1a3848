//! Deterministic fallback embedder: TF-IDF followed by truncated SVD.
//!
//! Each call to [`TfIdfSvdGenerator::generate_embeddings`] fits a fresh
//! vocabulary and projection on the batch it is given, so the output
//! dimension depends on the batch:
//! `C = min(max_components, max(1, F), max(1, N - 1))` for `N` documents and
//! `F` vocabulary terms. The last fit is retained for [`embed_query`].
//!
//! [`embed_query`]: EmbeddingGenerator::embed_query

use parking_lot::RwLock;
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::embedding::generator::{EmbeddingBackend, EmbeddingGenerator, EmbeddingResult};
use crate::embedding::svd::{SvdParams, TruncatedSvd};
use crate::embedding::tfidf::TfIdfModel;

/// Vocabulary and projection learned from the last batch.
#[derive(Debug)]
struct FittedModel {
    tfidf: TfIdfModel,
    /// `None` when the vocabulary came out empty.
    svd: Option<TruncatedSvd>,
}

impl FittedModel {
    fn dimension(&self) -> usize {
        self.svd.as_ref().map_or(1, TruncatedSvd::n_components)
    }

    fn embed_row(&self, row: &[(usize, f64)]) -> Vec<f32> {
        match &self.svd {
            Some(svd) => to_unit_f32(&svd.project(row)),
            None => vec![0.0],
        }
    }
}

#[derive(Debug)]
pub struct TfIdfSvdGenerator {
    max_features: usize,
    max_components: usize,
    power_iterations: usize,
    oversamples: usize,
    seed: u64,
    fitted: RwLock<Option<FittedModel>>,
}

impl Default for TfIdfSvdGenerator {
    fn default() -> Self {
        Self::new(&EmbeddingConfig::statistical())
    }
}

impl TfIdfSvdGenerator {
    #[must_use]
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            max_features: config.max_features,
            max_components: config.max_components,
            power_iterations: config.power_iterations,
            oversamples: config.oversamples,
            seed: config.random_seed,
            fitted: RwLock::new(None),
        }
    }

    /// Number of SVD components for a batch of `n_docs` documents over
    /// `n_features` terms.
    #[must_use]
    pub fn component_count(&self, n_docs: usize, n_features: usize) -> usize {
        self.max_components
            .min(n_features.max(1))
            .min(n_docs.saturating_sub(1).max(1))
            .max(1)
    }

    fn fit(&self, texts: &[&str]) -> (FittedModel, Vec<Vec<f32>>) {
        let (tfidf, matrix) = TfIdfModel::fit_transform(texts, self.max_features);

        if tfidf.n_features() == 0 {
            debug!(documents = texts.len(), "Empty vocabulary, emitting zero vectors");
            let model = FittedModel { tfidf, svd: None };
            return (model, vec![vec![0.0]; texts.len()]);
        }

        let n_components = self.component_count(texts.len(), tfidf.n_features());
        let svd = TruncatedSvd::fit(
            &matrix,
            SvdParams {
                n_components,
                power_iterations: self.power_iterations,
                oversamples: self.oversamples,
                seed: self.seed,
            },
        );
        debug!(
            documents = texts.len(),
            features = tfidf.n_features(),
            components = n_components,
            "Fitted statistical embedder"
        );

        let model = FittedModel {
            tfidf,
            svd: Some(svd),
        };
        let embeddings = (0..matrix.n_rows())
            .map(|i| model.embed_row(matrix.row(i)))
            .collect();
        (model, embeddings)
    }
}

impl EmbeddingGenerator for TfIdfSvdGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let (model, embeddings) = self.fit(texts);
        *self.fitted.write() = Some(model);
        Ok(embeddings)
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Statistical
    }

    fn dimension(&self) -> Option<usize> {
        self.fitted.read().as_ref().map(FittedModel::dimension)
    }

    fn embed_query(&self, text: &str) -> EmbeddingResult<Option<Vec<f32>>> {
        Ok(self
            .fitted
            .read()
            .as_ref()
            .map(|model| model.embed_row(&model.tfidf.transform(text))))
    }
}

/// Scales to unit length in `f64` before narrowing; zero rows stay zero.
fn to_unit_f32(values: &[f64]) -> Vec<f32> {
    let norm = values.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|x| (x / norm) as f32).collect()
}
