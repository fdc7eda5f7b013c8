//! Embedding provider abstraction and vector utilities.
//!
//! The [`Embedder`] trait is the seam between the chunk store and whatever
//! actually turns text into vectors. The shipped implementation delegates to
//! Ollama's `/api/embed` endpoint; tests substitute deterministic fakes.
//!
//! Also provides the helpers for storing vectors in SQLite:
//! - [`vec_to_blob`] / [`blob_to_vec`] — little-endian f32 BLOB encoding
//! - [`cosine_similarity`] — similarity scoring for retrieval

use async_trait::async_trait;
use std::time::Duration;

use crate::config::{EmbeddingConfig, OllamaConfig};
use crate::error::ChatError;

/// Turns batches of text into fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatError>;
}

/// Embedding provider backed by Ollama's `/api/embed` endpoint.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaEmbedder {
    pub fn new(ollama: &OllamaConfig, embedding: &EmbeddingConfig) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(embedding.timeout_secs))
            .build()
            .map_err(|e| ChatError::Store(e.to_string()))?;

        Ok(Self {
            client,
            url: format!("{}/api/embed", ollama.url.trim_end_matches('/')),
            model: embedding.model.clone(),
            timeout_secs: embedding.timeout_secs,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| store_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ChatError::Store(format!(
                "embedding request failed with {}: {}",
                status, detail
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| store_error(e, self.timeout_secs))?;

        parse_embed_response(&json, texts.len())
    }
}

fn store_error(err: reqwest::Error, timeout_secs: u64) -> ChatError {
    if err.is_timeout() {
        ChatError::Timeout(timeout_secs)
    } else {
        ChatError::Store(err.to_string())
    }
}

/// Parse an Ollama `/api/embed` response body.
///
/// Expects `{"embeddings": [[f32, ...], ...]}` with one vector per input.
pub fn parse_embed_response(
    json: &serde_json::Value,
    expected: usize,
) -> Result<Vec<Vec<f32>>, ChatError> {
    let rows = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| ChatError::Store("embedding response missing embeddings array".into()))?;

    if rows.len() != expected {
        return Err(ChatError::Store(format!(
            "embedding response has {} vectors, expected {}",
            rows.len(),
            expected
        )));
    }

    let mut embeddings = Vec::with_capacity(rows.len());
    for row in rows {
        let values = row
            .as_array()
            .ok_or_else(|| ChatError::Store("embedding row is not an array".into()))?;
        embeddings.push(
            values
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect(),
        );
    }

    Ok(embeddings)
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
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
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
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
