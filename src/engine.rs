//! Query engine: the public query entry point.

use crate::error::RagError;
use crate::models::Answer;
use crate::retrieve::Retriever;
use crate::synthesize::Synthesizer;

/// Composes an injected retriever and synthesizer. Holds no state of
/// its own, so one engine can serve many queries against the same
/// bound index.
pub struct QueryEngine<R: Retriever, S: Synthesizer> {
    retriever: R,
    synthesizer: S,
}

impl<R: Retriever, S: Synthesizer> QueryEngine<R, S> {
    pub fn new(retriever: R, synthesizer: S) -> Self {
        Self {
            retriever,
            synthesizer,
        }
    }

    /// Retrieve the top-ranked chunks for `query_str` and synthesize an
    /// answer from them. Never mutates the underlying collection.
    pub async fn query(&self, query_str: &str) -> Result<Answer, RagError> {
        let chunks = self.retriever.retrieve(query_str).await?;
        self.synthesizer.synthesize(query_str, &chunks).await
    }
}
