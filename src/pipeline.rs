//! Glue between the embedding generator and the vector index.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::embedding::EmbeddingGenerator;
use crate::error::{DocvecError, DocvecResult};
use crate::vector::{Metadata, SearchResult, VectorError, VectorIndex};

/// A cleaned document as handed over by the text-cleaning stage.
///
/// Only `text` is embedded; the whole record is stored as metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub source: Option<String>,
    pub text: String,
    pub snippet: String,
}

impl DocumentRecord {
    pub fn new(source: Option<String>, text: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
            snippet: snippet.into(),
        }
    }

    fn to_metadata(&self) -> DocvecResult<Metadata> {
        match serde_json::to_value(self).map_err(VectorError::from)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Metadata::new()),
        }
    }
}

/// Embeds every record in one batch, adds them to `index` with ids
/// `"0".."N-1"` and saves the index.
///
/// Returns the number of entries written.
pub fn index_documents(
    records: &[DocumentRecord],
    generator: &dyn EmbeddingGenerator,
    index: &mut VectorIndex,
) -> DocvecResult<usize> {
    let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
    let embeddings = generator.generate_embeddings(&texts)?;
    if embeddings.len() != records.len() {
        return Err(DocvecError::BatchSizeMismatch {
            expected: records.len(),
            actual: embeddings.len(),
        });
    }

    for (doc_id, (record, embedding)) in records.iter().zip(embeddings).enumerate() {
        index.add(doc_id.to_string(), embedding, record.to_metadata()?);
    }
    index.save()?;

    info!(
        documents = records.len(),
        backend = %generator.backend(),
        dir = %index.index_dir().display(),
        "Indexed documents"
    );
    Ok(records.len())
}

/// Embeds `query` with `generator` and searches `index`.
///
/// Returns no results when the generator has no space to project the query
/// into (an unfitted statistical generator).
pub fn search_text(
    query: &str,
    generator: &dyn EmbeddingGenerator,
    index: &VectorIndex,
    k: usize,
) -> DocvecResult<Vec<SearchResult>> {
    Ok(match generator.embed_query(query)? {
        Some(vector) => index.search(&vector, k),
        None => Vec::new(),
    })
}
