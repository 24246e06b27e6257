//! Core data types that flow through the ingestion and query pipeline.

use serde::Serialize;

/// How a file's text is treated by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Natural-language prose (text files, office documents, slide
    /// decks): punctuation is stripped and whitespace collapsed before
    /// chunking, for stable retrieval tokenization.
    Prose,
    /// Code or structured text: passed through unchanged, since syntax,
    /// indentation, and identifiers are retrieval-relevant.
    Structured,
}

/// Metadata carried by a document and inherited by its chunks.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentMetadata {
    pub file_name: String,
    pub file_path: String,
    pub source_type: SourceType,
}

/// A loaded document prior to chunking.
///
/// Documents are not persisted themselves; only their derived chunks
/// survive the ingestion run. `raw_text` is replaced wholesale by the
/// normalizer before splitting.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub raw_text: String,
    pub metadata: DocumentMetadata,
}

/// A span of a document's normalized text, the atomic unit of embedding
/// and retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Document-scoped id: `"{document_id}:{chunk_index}"`. Stable
    /// across ingestion runs, so re-ingesting the same files overwrites
    /// the same store entries.
    pub id: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub text: String,
    /// Filled in by the embedding stage; `None` until then. Never
    /// mutated after the chunk is written to the store.
    pub embedding: Option<Vec<f32>>,
    pub metadata: DocumentMetadata,
}

/// A retrieved chunk paired with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub metadata: serde_json::Value,
    pub score: f32,
}

/// The answer produced for a single query. Transient; never persisted.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Retrieved chunks in descending score order.
    pub source_chunks: Vec<ScoredChunk>,
}
