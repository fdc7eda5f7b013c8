//! Chunk store: ingestion windowing and similarity retrieval.
//!
//! Owns the only persistent state in the system. Ingestion splits a document
//! into overlapping windows, embeds each, and replaces any previous chunks
//! for the same source. Retrieval embeds the query and ranks stored chunks
//! by cosine similarity.

use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use crate::chunk::split_windows;
use crate::config::{ChunkingConfig, RetrievalConfig};
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob, Embedder};
use crate::error::ChatError;
use crate::models::Chunk;

pub struct ChunkStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
    retrieval: RetrievalConfig,
}

impl ChunkStore {
    pub fn new(
        pool: SqlitePool,
        embedder: Arc<dyn Embedder>,
        chunking: ChunkingConfig,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            pool,
            embedder,
            chunking,
            retrieval,
        }
    }

    /// Default result count for [`ChunkStore::retrieve`].
    pub fn default_top_k(&self) -> usize {
        self.retrieval.top_k
    }

    /// Split `raw_text` into overlapping windows, embed them, and store each
    /// as a chunk keyed `{source}_chunk_{seq}`. Previously stored chunks for
    /// the same source are replaced. Returns the number of chunks written.
    pub async fn ingest(&self, source: &str, raw_text: &str) -> Result<usize, ChatError> {
        let windows = split_windows(
            raw_text,
            self.chunking.window_chars,
            self.chunking.overlap_chars,
        );
        if windows.is_empty() {
            return Err(ChatError::Validation(
                "Document text cannot be empty.".to_string(),
            ));
        }

        let embeddings = self.embedder.embed(&windows).await?;

        let chunks: Vec<Chunk> = windows
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(seq, (text, embedding))| Chunk {
                id: format!("{}_chunk_{}", source, seq),
                source: source.to_string(),
                seq: seq as i64,
                text,
                embedding,
            })
            .collect();

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE source = ?")
            .bind(source)
            .execute(&mut *tx)
            .await?;

        for chunk in &chunks {
            sqlx::query("INSERT INTO chunks (id, source, seq, text, embedding) VALUES (?, ?, ?, ?, ?)")
                .bind(&chunk.id)
                .bind(&chunk.source)
                .bind(chunk.seq)
                .bind(&chunk.text)
                .bind(vec_to_blob(&chunk.embedding))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(source, chunks = chunks.len(), "ingested document");
        Ok(chunks.len())
    }

    /// Embed `query` and return up to `top_k` chunk texts, most-similar
    /// first. An empty store or no chunk above the similarity floor yields an
    /// empty result, not an error.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>, ChatError> {
        let query_vec = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Store("empty embedding response for query".into()))?;

        let rows = sqlx::query("SELECT text, embedding FROM chunks")
            .fetch_all(&self.pool)
            .await?;

        let mut scored: Vec<(f32, String)> = rows
            .into_iter()
            .filter_map(|row| {
                let text: String = row.get("text");
                let blob: Vec<u8> = row.get("embedding");
                let score = cosine_similarity(&query_vec, &blob_to_vec(&blob));
                if score >= self.retrieval.min_score {
                    Some((score, text))
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored.into_iter().map(|(_, text)| text).collect())
    }
}
