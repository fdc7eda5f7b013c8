//! Error taxonomy for the chat pipeline.
//!
//! Every failure the orchestrator can surface maps to one of these variants;
//! the HTTP layer translates them to status codes and JSON bodies. Retrieval
//! failures are the only errors swallowed on the chat path (degraded to an
//! empty context); everything else short-circuits the request.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Bad or missing request fields. Maps to 400.
    #[error("{0}")]
    Validation(String),

    /// Model identifier not present in the routing table. Maps to 400.
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    /// Model listing or download failure. Maps to 500. Fatal to the request,
    /// not the process; no automatic retry.
    #[error("Failed to provision model {model}: {cause}")]
    Provisioning { model: String, cause: String },

    /// Malformed or error-bearing upstream response from any completion
    /// backend. Maps to 500.
    #[error("{0}")]
    RemoteProvider(String),

    /// A backend call exceeded its configured deadline. Kept distinct from
    /// [`ChatError::RemoteProvider`] so clients can tell a slow upstream from
    /// a broken one. Maps to 408.
    #[error("Backend call timed out after {0}s")]
    Timeout(u64),

    /// Embedding or index failure during ingestion or retrieval. Maps to 500
    /// when surfaced; retrieval errors degrade to an empty context instead.
    #[error("{0}")]
    Store(String),
}

impl ChatError {
    /// Classify a reqwest failure, separating deadline expiry from the
    /// general provider-error bucket.
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ChatError::Timeout(timeout_secs)
        } else {
            ChatError::RemoteProvider(err.to_string())
        }
    }
}

impl From<sqlx::Error> for ChatError {
    fn from(err: sqlx::Error) -> Self {
        ChatError::Store(err.to_string())
    }
}
