//! Index and retriever: the read path over a populated collection.

use std::sync::Arc;

use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::error::RagError;
use crate::models::ScoredChunk;
use crate::store::Collection;

/// Maps a query string to a ranked set of chunks. The query engine is
/// polymorphic over this, so alternative retrieval strategies can be
/// swapped in.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>, RagError>;
}

/// A logical read view over one populated collection. Stateless beyond
/// the binding; reconstructible at any time.
pub struct Index {
    collection: Collection,
    embedder: Arc<dyn Embedder>,
}

impl Index {
    pub fn new(collection: Collection, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            collection,
            embedder,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn as_retriever(&self, k: usize) -> VectorRetriever {
        VectorRetriever {
            collection: self.collection.clone(),
            embedder: Arc::clone(&self.embedder),
            k,
        }
    }
}

/// Embeds the query and returns the store's top-k, in the store's
/// descending-score order (no re-sort here — the store contract already
/// guarantees ordering).
pub struct VectorRetriever {
    collection: Collection,
    embedder: Arc<dyn Embedder>,
    k: usize,
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>, RagError> {
        let query_vec = self.embedder.embed(query).await?;
        let entries = self.collection.query_by_vector(&query_vec, self.k).await?;
        Ok(entries
            .into_iter()
            .map(|e| ScoredChunk {
                id: e.id,
                text: e.text,
                metadata: e.metadata,
                score: e.score,
            })
            .collect())
    }
}
