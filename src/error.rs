//! Typed errors for the ingestion and query pipeline.
//!
//! Stage failures propagate as [`RagError`] values so the pipeline stays
//! embeddable as a library — the caller decides whether an error aborts
//! the process. Only the CLI boundary converts to `anyhow`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid configuration, detected before any I/O is performed.
    #[error("configuration error: {0}")]
    Config(String),

    /// An ingestion run was started with an empty document list.
    #[error("no documents supplied to the ingestion pipeline")]
    NoDocuments,

    /// A directory scan produced no documents after extension filtering.
    #[error("no documents found under {dir} matching extensions {extensions:?}")]
    NoDocumentsFound {
        dir: String,
        extensions: Vec<String>,
    },

    /// The document source directory could not be walked (missing path,
    /// permissions).
    #[error("document source unavailable: {0}")]
    SourceUnavailable(String),

    /// The embedding backend could not be loaded or reached. Fatal for
    /// ingestion; no partial writes occur.
    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The generation backend failed while composing an answer.
    #[error("generation backend unavailable: {0}")]
    GenerationUnavailable(String),

    /// The persistent store could not be opened, read, or written.
    #[error("vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// A vector's dimensionality does not match the collection's
    /// established dimensionality.
    #[error("dimension mismatch: collection expects {expected} dims, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl From<sqlx::Error> for RagError {
    fn from(e: sqlx::Error) -> Self {
        RagError::StoreUnavailable(e.to_string())
    }
}
