//! Ingestion pipeline orchestration.
//!
//! Drives the full batch flow: normalize → split → embed → persist.
//! Persistence is all-or-nothing: chunk texts are embedded in full
//! before anything is written, and the write itself is one store
//! transaction, so a failed run never leaves partial state behind.

use std::sync::Arc;

use crate::config::ChunkingConfig;
use crate::embedding::Embedder;
use crate::error::RagError;
use crate::models::{Chunk, Document};
use crate::normalize::normalize;
use crate::split::split_document;
use crate::store::{Collection, EntryWrite};

/// Owns chunk creation and the write path into the vector collection.
pub struct IngestionPipeline {
    collection: Collection,
    embedder: Arc<dyn Embedder>,
    chunk_size: usize,
    chunk_overlap: usize,
    batch_size: usize,
}

impl IngestionPipeline {
    /// Chunking parameters are validated here, before any document is
    /// touched.
    pub fn new(
        collection: Collection,
        embedder: Arc<dyn Embedder>,
        chunking: &ChunkingConfig,
        batch_size: usize,
    ) -> Result<Self, RagError> {
        if chunking.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be > 0".to_string()));
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be < chunk_size ({})",
                chunking.chunk_overlap, chunking.chunk_size
            )));
        }
        Ok(Self {
            collection,
            embedder,
            chunk_size: chunking.chunk_size,
            chunk_overlap: chunking.chunk_overlap,
            batch_size: batch_size.max(1),
        })
    }

    /// Ingest a batch of documents; returns the chunks that were
    /// persisted, embeddings attached.
    pub async fn run(&self, documents: Vec<Document>) -> Result<Vec<Chunk>, RagError> {
        if documents.is_empty() {
            return Err(RagError::NoDocuments);
        }

        // Dimensionality is a setup property: reject a mismatched
        // embedder/collection pairing before any embedding or write.
        if let Some(expected) = self.collection.dims().await? {
            if expected != self.embedder.dims() {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: self.embedder.dims(),
                });
            }
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        for mut document in documents {
            document.raw_text = normalize(&document.metadata.file_path, &document.raw_text);
            chunks.extend(split_document(&document, self.chunk_size, self.chunk_overlap));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embedder.embed_batch(batch).await?);
        }
        if vectors.len() != chunks.len() {
            return Err(RagError::EmbeddingUnavailable(format!(
                "embedding backend returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        for (chunk, vector) in chunks.iter_mut().zip(vectors.into_iter()) {
            chunk.embedding = Some(vector);
        }

        let entries: Vec<EntryWrite> = chunks
            .iter()
            .map(|chunk| EntryWrite {
                id: chunk.id.clone(),
                // embed stage just filled this in
                vector: chunk.embedding.clone().unwrap_or_default(),
                text: chunk.text.clone(),
                metadata: chunk_metadata(chunk),
            })
            .collect();

        self.collection.add_batch(&entries).await?;
        Ok(chunks)
    }
}

fn chunk_metadata(chunk: &Chunk) -> serde_json::Value {
    serde_json::json!({
        "file_name": chunk.metadata.file_name,
        "file_path": chunk.metadata.file_path,
        "source_type": chunk.metadata.source_type,
        "document_id": chunk.document_id,
        "chunk_index": chunk.chunk_index,
    })
}
