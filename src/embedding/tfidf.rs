//! TF-IDF term weighting over a document batch.
//!
//! Tokens are lowercase runs of two or more word characters. The vocabulary
//! keeps the `max_features` most frequent terms across the batch (ties go to
//! the alphabetically smaller term) and is ordered alphabetically. Weights
//! are raw counts times the smoothed inverse document frequency
//! `ln((1 + n) / (1 + df)) + 1`, and every row is scaled to unit length.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::embedding::sparse::SparseMatrix;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("Invalid token regex"));

/// Splits text into lowercase tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Vocabulary and idf weights learned from one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct TfIdfModel {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfIdfModel {
    /// Learns the vocabulary from `texts` and returns the model together
    /// with the weighted document-term matrix of the same batch.
    ///
    /// A `max_features` of 0 keeps every term.
    pub fn fit_transform(texts: &[&str], max_features: usize) -> (Self, SparseMatrix) {
        let tokenized: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t)).collect();

        // BTreeMap keeps terms alphabetical, which fixes tie order below
        let mut corpus_counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for tokens in &tokenized {
            let mut seen: HashSet<&str> = HashSet::new();
            for token in tokens {
                let entry = corpus_counts.entry(token.as_str()).or_insert((0, 0));
                entry.0 += 1;
                if seen.insert(token.as_str()) {
                    entry.1 += 1;
                }
            }
        }

        let mut terms: Vec<(&str, usize, usize)> = corpus_counts
            .into_iter()
            .map(|(term, (count, df))| (term, count, df))
            .collect();
        if max_features > 0 && terms.len() > max_features {
            // Stable sort keeps alphabetical order among equal counts
            terms.sort_by(|a, b| b.1.cmp(&a.1));
            terms.truncate(max_features);
            terms.sort_by(|a, b| a.0.cmp(b.0));
        }

        let n_docs = texts.len() as f64;
        let vocabulary: HashMap<String, usize> = terms
            .iter()
            .enumerate()
            .map(|(column, (term, _, _))| ((*term).to_string(), column))
            .collect();
        let idf: Vec<f64> = terms
            .iter()
            .map(|(_, _, df)| ((1.0 + n_docs) / (1.0 + *df as f64)).ln() + 1.0)
            .collect();

        let model = Self { vocabulary, idf };
        let rows = tokenized
            .iter()
            .map(|tokens| model.weigh(tokens))
            .collect();
        let matrix = SparseMatrix::new(rows, model.n_features());
        (model, matrix)
    }

    /// Number of vocabulary terms.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    /// Column index of `term`, if it is in the vocabulary.
    #[must_use]
    pub fn column(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Weighs a new text with the learned vocabulary; unknown terms are dropped.
    #[must_use]
    pub fn transform(&self, text: &str) -> Vec<(usize, f64)> {
        self.weigh(&tokenize(text))
    }

    fn weigh(&self, tokens: &[String]) -> Vec<(usize, f64)> {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokens {
            if let Some(&column) = self.vocabulary.get(token) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut row: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(column, count)| (column, count * self.idf[column]))
            .collect();
        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, weight) in &mut row {
                *weight /= norm;
            }
        }
        row
    }
}
