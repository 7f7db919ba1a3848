//! Text-to-vector indexing: embedding generation plus a persisted cosine
//! similarity index with an optimized and a brute-force search path.

pub mod config;
pub mod embedding;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod vector;

// Explicit exports for better API clarity
pub use config::Settings;
pub use embedding::{
    EmbeddingBackend, EmbeddingError, EmbeddingGenerator, EmbeddingResult, FastEmbedGenerator,
    TfIdfSvdGenerator, create_generator, create_generator_with,
};
pub use error::{DocvecError, DocvecResult};
pub use pipeline::{DocumentRecord, index_documents, search_text};
pub use vector::{Metadata, SearchResult, VectorError, VectorIndex, VectorResult};
