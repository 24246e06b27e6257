//! Embedding capability and concrete providers.
//!
//! The pipeline never references a concrete backend: it receives an
//! [`Embedder`] by injection. Providers are selected from config via
//! [`create_embedder`]:
//!
//! - **`hashing`** — deterministic offline bag-of-words embedding
//!   (FNV-1a hashed token buckets, L2-normalized). No model download,
//!   no network; used for air-gapped setups and tests.
//! - **`ollama`** — a local Ollama instance's `POST /api/embed`.
//! - **`openai`** — `POST /v1/embeddings`; requires `OPENAI_API_KEY`.
//!
//! HTTP providers retry 429/5xx/network errors with exponential backoff
//! (1s, 2s, 4s, ... capped at 2^5) and fail fast on other 4xx. Every
//! failure surfaces as [`RagError::EmbeddingUnavailable`].
//!
//! Also hosts the vector utilities shared with the store:
//! [`vec_to_blob`], [`blob_to_vec`], and [`cosine_similarity`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::EmbeddingConfig;
use crate::error::RagError;

/// Opaque embedding capability: text in, fixed-dimension vector out.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier, recorded in summaries and snapshots.
    fn model_name(&self) -> &str;

    /// Fixed output dimensionality for this provider.
    fn dims(&self) -> usize;

    /// Embed a batch of texts, preserving input order one-to-one.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embed a single text (e.g. a query string).
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut out = self.embed_batch(&[text.to_string()]).await?;
        out.pop()
            .ok_or_else(|| RagError::EmbeddingUnavailable("empty embedding response".to_string()))
    }
}

/// Instantiate the configured provider.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, RagError> {
    match config.provider.as_str() {
        "hashing" => Ok(Arc::new(HashingEmbedder::new(config.dims.unwrap_or(384)))),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        other => Err(RagError::Config(format!(
            "unknown embedding provider: '{other}'. Must be hashing, ollama, or openai."
        ))),
    }
}

// ============ Hashing provider ============

/// Deterministic bag-of-words embedder.
///
/// Tokens are lowercased alphanumeric runs; each token is FNV-1a-hashed
/// into one of `dims` buckets and the bucket counts are L2-normalized.
/// Crude next to a learned model, but fully offline, deterministic, and
/// close enough in behavior (shared vocabulary ⇒ higher cosine) to
/// exercise the whole retrieval path.
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a64(token.to_lowercase().as_bytes()) % self.dims as u64) as usize;
            v[bucket] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        "hashing-bow"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

// ============ Ollama provider ============

/// Embeds via a local Ollama instance (`ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RagError> {
        let model = config.model.clone().ok_or_else(|| {
            RagError::Config("embedding.model required for ollama provider".to_string())
        })?;
        let dims = config.dims.ok_or_else(|| {
            RagError::Config("embedding.dims required for ollama provider".to_string())
        })?;
        Ok(Self {
            model,
            dims,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = post_json_with_retry(
            &format!("{}/api/embed", self.url),
            None,
            &body,
            self.max_retries,
            self.timeout_secs,
        )
        .await
        .map_err(RagError::EmbeddingUnavailable)?;

        let embeddings = json
            .get("embeddings")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                RagError::EmbeddingUnavailable(
                    "invalid Ollama response: missing embeddings array".to_string(),
                )
            })?;

        embeddings
            .iter()
            .map(|emb| {
                emb.as_array()
                    .map(|arr| {
                        arr.iter()
                            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                            .collect()
                    })
                    .ok_or_else(|| {
                        RagError::EmbeddingUnavailable(
                            "invalid Ollama response: embedding is not an array".to_string(),
                        )
                    })
            })
            .collect()
    }
}

// ============ OpenAI provider ============

/// Embeds via the OpenAI embeddings API.
pub struct OpenAiEmbedder {
    model: String,
    dims: usize,
    api_key: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RagError> {
        let model = config.model.clone().ok_or_else(|| {
            RagError::Config("embedding.model required for openai provider".to_string())
        })?;
        let dims = config.dims.ok_or_else(|| {
            RagError::Config("embedding.dims required for openai provider".to_string())
        })?;
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self {
            model,
            dims,
            api_key,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = post_json_with_retry(
            "https://api.openai.com/v1/embeddings",
            Some(&self.api_key),
            &body,
            self.max_retries,
            self.timeout_secs,
        )
        .await
        .map_err(RagError::EmbeddingUnavailable)?;

        let data = json.get("data").and_then(|d| d.as_array()).ok_or_else(|| {
            RagError::EmbeddingUnavailable(
                "invalid OpenAI response: missing data array".to_string(),
            )
        })?;

        let mut embeddings = Vec::with_capacity(data.len());
        for item in data {
            let embedding = item
                .get("embedding")
                .and_then(|e| e.as_array())
                .ok_or_else(|| {
                    RagError::EmbeddingUnavailable(
                        "invalid OpenAI response: missing embedding".to_string(),
                    )
                })?;
            embeddings.push(
                embedding
                    .iter()
                    .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                    .collect(),
            );
        }
        Ok(embeddings)
    }
}

// ============ Shared HTTP helper ============

/// POST a JSON body and parse a JSON response, with backoff.
///
/// Retries 429, 5xx, and transport errors; other 4xx fail immediately.
pub(crate) async fn post_json_with_retry(
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    max_retries: u32,
    timeout_secs: u64,
) -> Result<serde_json::Value, String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| e.to_string())?;

    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut req = client.post(url).json(body);
        if let Some(key) = bearer {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        match req.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response.json().await.map_err(|e| e.to_string());
                }
                let text = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(format!("{url} returned {status}: {text}"));
                    continue;
                }
                return Err(format!("{url} returned {status}: {text}"));
            }
            Err(e) => {
                last_err = Some(format!("request to {url} failed: {e}"));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| "request failed after retries".to_string()))
}

// ============ Vector utilities ============

/// Encode a float vector as little-endian f32 bytes for BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`; `0.0` for empty or
/// length-mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashing_embedder_is_deterministic_and_fixed_dims() {
        let e = HashingEmbedder::new(128);
        let a = e.embed("the cat sat on the mat").await.unwrap();
        let b = e.embed("the cat sat on the mat").await.unwrap();
        assert_eq!(a.len(), 128);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn hashing_batch_preserves_order() {
        let e = HashingEmbedder::new(64);
        let texts = vec![
            "alpha beta".to_string(),
            "gamma delta".to_string(),
            "alpha beta".to_string(),
        ];
        let out = e.embed_batch(&texts).await.unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], out[2]);
        assert_ne!(out[0], out[1]);
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_higher() {
        let e = HashingEmbedder::new(384);
        let query = e.embed("Where did the cat sit?").await.unwrap();
        let prose = e.embed("The cat sat on the mat The dog ran fast").await.unwrap();
        let code = e.embed("def add(a, b): return a + b").await.unwrap();
        assert!(cosine_similarity(&query, &prose) > cosine_similarity(&query, &code));
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let e = HashingEmbedder::new(32);
        let v = e.embed("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn blob_roundtrip() {
        let v = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        assert_eq!(blob_to_vec(&vec_to_blob(&v)), v);
    }

    #[test]
    fn cosine_identical_orthogonal_opposite() {
        let a = vec![1.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let cfg = EmbeddingConfig {
            provider: "quantum".to_string(),
            ..Default::default()
        };
        assert!(matches!(create_embedder(&cfg), Err(RagError::Config(_))));
    }
}
