//! Core data types shared across the chat pipeline.
//!
//! These are the records that flow between the chunk store, conversation
//! history, provider router, and HTTP layer.

use serde::{Deserialize, Serialize};

/// A bounded window of a source document, stored with its embedding for
/// similarity search. Immutable once written; re-ingesting the same source
/// replaces all of its chunks.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// `{source}_chunk_{seq}`
    pub id: String,
    pub source: String,
    pub seq: i64,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire-format role name for OpenAI-compatible chat endpoints.
    pub fn api_name(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Transcript label used by completion-style prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "AI",
        }
    }
}

/// One entry in a session's append-only conversation log.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Which completion backend serves a given model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Locally provisioned Ollama runtime.
    Local,
    /// Remote plain-text completion endpoint.
    RemoteCompletion,
    /// Remote OpenAI-compatible chat endpoint.
    RemoteChat,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Falls back to the configured default model when absent. An explicitly
    /// empty string is a validation error.
    #[serde(default)]
    pub model: Option<String>,
    /// Live editor content supplied by the client, included verbatim in the
    /// composed prompt.
    #[serde(default)]
    pub context: Option<String>,
    /// Conversation session id. Absent or unknown ids start a new session.
    #[serde(default)]
    pub session: Option<String>,
}

/// Body of a successful `POST /chat` response.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session: String,
}

/// Body of `POST /index`.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexRequest {
    pub source: String,
    pub text: String,
}

/// Body of a successful `POST /index` response.
#[derive(Debug, Clone, Serialize)]
pub struct IndexResponse {
    pub source: String,
    pub chunks: usize,
}
