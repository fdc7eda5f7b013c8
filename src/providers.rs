//! Provider routing and backend invocation.
//!
//! A static table maps model identifiers to a [`BackendKind`]; adding a model
//! is a data edit, not a new branch. Each backend normalizes its response
//! shape into a plain `String` here, so the orchestrator never sees the
//! heterogeneous wire formats. The router does not clean response text; that
//! is the prompt module's job.

use std::sync::Arc;
use std::time::Duration;

use crate::config::RemoteConfig;
use crate::error::ChatError;
use crate::models::{BackendKind, ConversationTurn};
use crate::runtime::{GenerateOptions, LocalRuntime};

/// Model identifier → backend. Exact string match; unknown identifiers are
/// rejected, never silently routed.
pub const ROUTING_TABLE: &[(&str, BackendKind)] = &[
    ("deepseek-r1:1.5b", BackendKind::Local),
    ("deepseek-r1:7b", BackendKind::Local),
    ("deepseek-coder:6.7b", BackendKind::Local),
    ("mistral-7b", BackendKind::RemoteCompletion),
    ("deepseek-chat", BackendKind::RemoteChat),
    ("gpt-4o-mini", BackendKind::RemoteChat),
];

/// Resolve a model identifier to its backend kind.
pub fn resolve_backend(model: &str) -> Result<BackendKind, ChatError> {
    ROUTING_TABLE
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| ChatError::UnsupportedModel(model.to_string()))
}

/// Per-identifier decoding options for local models. Bigger models get a
/// bigger context window.
pub fn local_options(model: &str) -> GenerateOptions {
    match model {
        "deepseek-r1:7b" | "deepseek-coder:6.7b" => GenerateOptions {
            num_ctx: 8192,
            ..GenerateOptions::default()
        },
        _ => GenerateOptions::default(),
    }
}

pub struct ProviderRouter {
    runtime: Arc<dyn LocalRuntime>,
    client: reqwest::Client,
    remote: RemoteConfig,
}

impl ProviderRouter {
    pub fn new(runtime: Arc<dyn LocalRuntime>, remote: RemoteConfig) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(remote.timeout_secs))
            .build()
            .map_err(|e| ChatError::RemoteProvider(e.to_string()))?;

        Ok(Self {
            runtime,
            client,
            remote,
        })
    }

    /// Invoke the local runtime. The caller must have provisioned the model
    /// first; `model` is the normalized name returned by the provisioner.
    pub async fn local_invoke(&self, model: &str, prompt: &str) -> Result<String, ChatError> {
        let options = local_options(model);
        self.runtime.generate(model, prompt, &options).await
    }

    /// Post a role-labelled plain-text transcript to the completion endpoint
    /// with fixed decoding parameters and return the first choice's text.
    pub async fn remote_completion_invoke(
        &self,
        model: &str,
        transcript: &str,
    ) -> Result<String, ChatError> {
        let body = serde_json::json!({
            "model": model,
            "prompt": transcript,
            "max_tokens": self.remote.max_tokens,
            "stop": [self.remote.stop],
        });

        let mut request = self.client.post(&self.remote.completion_url).json(&body);
        if let Some(key) = &self.remote.completion_api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChatError::from_reqwest(e, self.remote.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ChatError::RemoteProvider(format!(
                "completion endpoint returned {}: {}",
                status, detail
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatError::from_reqwest(e, self.remote.timeout_secs))?;

        parse_completion_response(&json)
    }

    /// Post a structured turn list to the OpenAI-compatible chat endpoint and
    /// return the first choice's message content.
    pub async fn remote_chat_invoke(
        &self,
        model: &str,
        system: Option<&str>,
        turns: &[ConversationTurn],
    ) -> Result<String, ChatError> {
        let mut messages: Vec<serde_json::Value> = Vec::with_capacity(turns.len() + 1);
        if let Some(system) = system {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        for turn in turns {
            messages.push(serde_json::json!({
                "role": turn.role.api_name(),
                "content": turn.content,
            }));
        }

        let body = serde_json::json!({
            "model": model,
            "messages": messages,
        });

        let mut request = self.client.post(&self.remote.chat_url).json(&body);
        if let Some(key) = &self.remote.chat_api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChatError::from_reqwest(e, self.remote.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ChatError::RemoteProvider(format!(
                "chat endpoint returned {}: {}",
                status, detail
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatError::from_reqwest(e, self.remote.timeout_secs))?;

        parse_chat_response(&json)
    }
}

/// Sentinel returned when a chat backend answers with an empty message.
pub const NO_RESPONSE_SENTINEL: &str = "(no response)";

/// Parse a completion-style response: `{"choices": [{"text": ...}]}`.
/// An `error` field or an empty choice list is a provider failure.
pub fn parse_completion_response(json: &serde_json::Value) -> Result<String, ChatError> {
    if let Some(err) = json.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| err.to_string());
        return Err(ChatError::RemoteProvider(message));
    }

    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("text"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ChatError::RemoteProvider("completion response has no choices".into()))
}

/// Parse an OpenAI-compatible chat response:
/// `{"choices": [{"message": {"content": ...}}]}`.
///
/// No choices or a missing message is a provider failure; an empty-but-present
/// content is a non-fatal "no response" sentinel.
pub fn parse_chat_response(json: &serde_json::Value) -> Result<String, ChatError> {
    if let Some(err) = json.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| err.to_string());
        return Err(ChatError::RemoteProvider(message));
    }

    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| {
            ChatError::RemoteProvider("chat response has no choices or message".into())
        })?;

    if content.is_empty() {
        Ok(NO_RESPONSE_SENTINEL.to_string())
    } else {
        Ok(content.to_string())
    }
}
