//! Response synthesis: turning retrieved chunks into an answer.
//!
//! The only built-in mode is `compact`: chunk texts are concatenated in
//! retrieval order (optionally truncated) and handed to the generation
//! backend; with no backend configured the concatenated context is
//! returned verbatim behind a note. Empty retrieval results never fail —
//! they produce an answer saying no relevant context was found.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SynthesisConfig;
use crate::error::RagError;
use crate::generation::Generator;
use crate::models::{Answer, ScoredChunk};

/// Note prefixed to the raw context when no generation model is active.
const NO_GENERATOR_NOTE: &str = "(no generation model active; returning retrieved context)";

/// Answer text used when retrieval produced nothing.
const NO_CONTEXT_ANSWER: &str = "No relevant context was found for this query.";

/// Composes retrieved chunks and the query into a final answer.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, query: &str, chunks: &[ScoredChunk]) -> Result<Answer, RagError>;
}

/// Instantiate the synthesizer for the configured mode.
pub fn create_synthesizer(
    config: &SynthesisConfig,
    generator: Option<Arc<dyn Generator>>,
) -> Result<CompactSynthesizer, RagError> {
    match config.mode.as_str() {
        "compact" => Ok(CompactSynthesizer::new(generator, config.max_context_chars)),
        other => Err(RagError::Config(format!(
            "unknown synthesis mode: '{other}'. Only 'compact' is supported."
        ))),
    }
}

/// Concatenate-then-summarize synthesis.
pub struct CompactSynthesizer {
    generator: Option<Arc<dyn Generator>>,
    max_context_chars: Option<usize>,
}

impl CompactSynthesizer {
    pub fn new(generator: Option<Arc<dyn Generator>>, max_context_chars: Option<usize>) -> Self {
        Self {
            generator,
            max_context_chars,
        }
    }

    fn build_context(&self, chunks: &[ScoredChunk]) -> String {
        let mut context = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        if let Some(max) = self.max_context_chars {
            if context.len() > max {
                let mut cut = max;
                while cut > 0 && !context.is_char_boundary(cut) {
                    cut -= 1;
                }
                context.truncate(cut);
            }
        }
        context
    }
}

#[async_trait]
impl Synthesizer for CompactSynthesizer {
    async fn synthesize(&self, query: &str, chunks: &[ScoredChunk]) -> Result<Answer, RagError> {
        if chunks.is_empty() {
            return Ok(Answer {
                text: NO_CONTEXT_ANSWER.to_string(),
                source_chunks: Vec::new(),
            });
        }

        let context = self.build_context(chunks);
        let text = match &self.generator {
            Some(generator) => {
                let prompt = format!(
                    "Context information is below.\n\
                     ---------------------\n\
                     {context}\n\
                     ---------------------\n\
                     Given the context information and not prior knowledge, \
                     answer the query.\n\
                     Query: {query}\n\
                     Answer:"
                );
                generator.generate(&prompt).await?
            }
            None => format!("{NO_GENERATOR_NOTE}\n{context}"),
        };

        Ok(Answer {
            text,
            source_chunks: chunks.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            id: id.to_string(),
            text: text.to_string(),
            metadata: serde_json::json!({}),
            score,
        }
    }

    #[tokio::test]
    async fn empty_chunks_produce_a_no_context_answer() {
        let s = CompactSynthesizer::new(None, None);
        let answer = s.synthesize("anything", &[]).await.unwrap();
        assert_eq!(answer.text, NO_CONTEXT_ANSWER);
        assert!(answer.source_chunks.is_empty());
    }

    #[tokio::test]
    async fn without_generator_context_is_returned_in_retrieval_order() {
        let s = CompactSynthesizer::new(None, None);
        let chunks = vec![chunk("a", "first chunk", 0.9), chunk("b", "second chunk", 0.5)];
        let answer = s.synthesize("q", &chunks).await.unwrap();

        assert!(answer.text.starts_with(NO_GENERATOR_NOTE));
        assert!(answer.text.contains("first chunk\n\nsecond chunk"));
        assert_eq!(answer.source_chunks.len(), 2);
        assert_eq!(answer.source_chunks[0].id, "a");
    }

    #[tokio::test]
    async fn context_is_truncated_to_max_chars() {
        let s = CompactSynthesizer::new(None, Some(10));
        let chunks = vec![chunk("a", "0123456789abcdef", 1.0)];
        let answer = s.synthesize("q", &chunks).await.unwrap();
        let context = answer.text.strip_prefix(NO_GENERATOR_NOTE).unwrap();
        assert_eq!(context, "\n0123456789");
    }

    #[tokio::test]
    async fn generator_receives_context_and_query() {
        struct EchoGenerator;

        #[async_trait]
        impl Generator for EchoGenerator {
            fn model_name(&self) -> &str {
                "echo"
            }
            async fn generate(&self, prompt: &str) -> Result<String, RagError> {
                Ok(prompt.to_string())
            }
        }

        let s = CompactSynthesizer::new(Some(Arc::new(EchoGenerator)), None);
        let chunks = vec![chunk("a", "the cat sat", 1.0)];
        let answer = s.synthesize("where is the cat?", &chunks).await.unwrap();
        assert!(answer.text.contains("the cat sat"));
        assert!(answer.text.contains("where is the cat?"));
    }

    #[tokio::test]
    async fn unknown_mode_rejected() {
        let cfg = SynthesisConfig {
            mode: "refine".to_string(),
            max_context_chars: None,
        };
        assert!(matches!(
            create_synthesizer(&cfg, None),
            Err(RagError::Config(_))
        ));
    }
}
