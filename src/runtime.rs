//! Local inference runtime seam.
//!
//! [`LocalRuntime`] abstracts the three operations the core needs from a
//! local model runtime: generate, list installed models, and pull a missing
//! model. [`OllamaRuntime`] implements it against Ollama's HTTP API; tests
//! substitute in-memory fakes.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::OllamaConfig;
use crate::error::ChatError;

/// Decoding options for a local generation call.
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    /// Context window in tokens; varies per model size.
    pub num_ctx: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.8,
            top_k: 40,
            num_ctx: 4096,
        }
    }
}

#[async_trait]
pub trait LocalRuntime: Send + Sync {
    /// Run one completion and return the raw response text.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, ChatError>;

    /// Names of models currently installed in the runtime.
    async fn list_installed(&self) -> Result<Vec<String>, ChatError>;

    /// Download a model. Blocks until the pull completes or fails.
    async fn pull(&self, model: &str) -> Result<(), ChatError>;
}

/// Ollama HTTP API client (`/api/generate`, `/api/tags`, `/api/pull`).
pub struct OllamaRuntime {
    client: reqwest::Client,
    /// Separate client for pulls, which can legitimately take minutes.
    pull_client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
    pull_timeout_secs: u64,
}

impl OllamaRuntime {
    pub fn new(config: &OllamaConfig) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::RemoteProvider(e.to_string()))?;
        let pull_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.pull_timeout_secs))
            .build()
            .map_err(|e| ChatError::RemoteProvider(e.to_string()))?;

        Ok(Self {
            client,
            pull_client,
            base_url: config.url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            pull_timeout_secs: config.pull_timeout_secs,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl LocalRuntime for OllamaRuntime {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, ChatError> {
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": options.temperature,
                "top_p": options.top_p,
                "top_k": options.top_k,
                "num_ctx": options.num_ctx,
            },
        });

        let response = self
            .client
            .post(self.endpoint("/api/generate"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ChatError::RemoteProvider(format!(
                "generation failed with {}: {}",
                status, detail
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatError::from_reqwest(e, self.timeout_secs))?;

        parse_generate_response(&json)
    }

    async fn list_installed(&self) -> Result<Vec<String>, ChatError> {
        let response = self
            .client
            .get(self.endpoint("/api/tags"))
            .send()
            .await
            .map_err(|e| ChatError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ChatError::RemoteProvider(format!(
                "model listing failed with {}: {}",
                status, detail
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatError::from_reqwest(e, self.timeout_secs))?;

        parse_tags_response(&json)
    }

    async fn pull(&self, model: &str) -> Result<(), ChatError> {
        let body = serde_json::json!({ "name": model, "stream": false });

        let response = self
            .pull_client
            .post(self.endpoint("/api/pull"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::from_reqwest(e, self.pull_timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ChatError::RemoteProvider(format!(
                "pull failed with {}: {}",
                status, detail
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatError::from_reqwest(e, self.pull_timeout_secs))?;

        match json.get("status").and_then(|s| s.as_str()) {
            Some("success") => Ok(()),
            other => Err(ChatError::RemoteProvider(format!(
                "pull did not succeed: {}",
                other.unwrap_or("no status in response")
            ))),
        }
    }
}

/// Extract the `response` field from an Ollama generate body, surfacing an
/// embedded `error` field as a provider failure.
pub fn parse_generate_response(json: &serde_json::Value) -> Result<String, ChatError> {
    if let Some(err) = json.get("error").and_then(|e| e.as_str()) {
        return Err(ChatError::RemoteProvider(err.to_string()));
    }
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ChatError::RemoteProvider("generate response missing response field".into()))
}

/// Extract installed model names from an Ollama `/api/tags` body.
pub fn parse_tags_response(json: &serde_json::Value) -> Result<Vec<String>, ChatError> {
    let models = json
        .get("models")
        .and_then(|m| m.as_array())
        .ok_or_else(|| ChatError::RemoteProvider("tags response missing models array".into()))?;

    Ok(models
        .iter()
        .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
        .map(|s| s.to_string())
        .collect())
}
