//! Application configuration.
//!
//! Loaded once at startup from an optional TOML file, then overlaid with
//! environment variables. Every section has serde defaults so a bare
//! `mentat serve` works against a local Ollama with no config file at all.
//!
//! Environment overrides (applied after the file is parsed):
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `MENTAT_DEFAULT_MODEL` | `chat.default_model` |
//! | `OLLAMA_URL` | `ollama.url` |
//! | `OPENAI_API_KEY` | `remote.chat_api_key` |
//! | `MENTAT_CHAT_API_URL` | `remote.chat_url` |
//! | `HF_API_TOKEN` | `remote.completion_api_key` |
//! | `MENTAT_COMPLETION_API_URL` | `remote.completion_url` |

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/mentat.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Window length in characters.
    #[serde(default = "default_window_chars")]
    pub window_chars: usize,
    /// Overlap between consecutive windows, in characters.
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_chars: default_window_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_window_chars() -> usize {
    512
}
fn default_overlap_chars() -> usize {
    80
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Chunks scoring below this cosine similarity are dropped.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_min_score() -> f32 {
    0.25
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    /// Rolling window of turns used for prompt composition. Older turns stay
    /// in the log but are never sent upstream.
    #[serde(default = "default_window_turns")]
    pub window_turns: usize,
    /// Sessions beyond this count are evicted least-recently-used.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window_turns: default_window_turns(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_window_turns() -> usize {
    5
}
fn default_max_sessions() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Optional system instruction prepended to local prompts and sent as the
    /// system message to chat backends.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            system_prompt: None,
        }
    }
}

fn default_model() -> String {
    "deepseek-r1:1.5b".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// Ollama embedding model used for both ingestion and queries.
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embed_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            timeout_secs: default_embed_timeout(),
        }
    }
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_embed_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    /// Deadline for a single generation call.
    #[serde(default = "default_generate_timeout")]
    pub timeout_secs: u64,
    /// Deadline for a model download; pulls move gigabytes, so this is much
    /// longer than the generation timeout.
    #[serde(default = "default_pull_timeout")]
    pub pull_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            timeout_secs: default_generate_timeout(),
            pull_timeout_secs: default_pull_timeout(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_generate_timeout() -> u64 {
    120
}
fn default_pull_timeout() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    /// OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_chat_url")]
    pub chat_url: String,
    #[serde(default)]
    pub chat_api_key: Option<String>,
    /// Plain-text completion endpoint.
    #[serde(default = "default_completion_url")]
    pub completion_url: String,
    #[serde(default)]
    pub completion_api_key: Option<String>,
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
    /// Fixed decoding parameters for the completion backend.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_stop")]
    pub stop: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            chat_url: default_chat_url(),
            chat_api_key: None,
            completion_url: default_completion_url(),
            completion_api_key: None,
            timeout_secs: default_remote_timeout(),
            max_tokens: default_max_tokens(),
            stop: default_stop(),
        }
    }
}

fn default_chat_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_completion_url() -> String {
    "https://api.mistral.ai/v1/completions".to_string()
}
fn default_remote_timeout() -> u64 {
    60
}
fn default_max_tokens() -> u32 {
    512
}
fn default_stop() -> String {
    "\nUser:".to_string()
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, and validate.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file: {}", p.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse config file")?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config);

    if config.chunking.window_chars == 0 {
        anyhow::bail!("chunking.window_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.window_chars {
        anyhow::bail!("chunking.overlap_chars must be < chunking.window_chars");
    }
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.retrieval.min_score) {
        anyhow::bail!("retrieval.min_score must be in [0.0, 1.0]");
    }
    if config.history.window_turns == 0 {
        anyhow::bail!("history.window_turns must be >= 1");
    }
    if config.history.max_sessions == 0 {
        anyhow::bail!("history.max_sessions must be >= 1");
    }
    if config.chat.default_model.trim().is_empty() {
        anyhow::bail!("chat.default_model must not be empty");
    }

    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(v) = std::env::var("MENTAT_DEFAULT_MODEL") {
        config.chat.default_model = v;
    }
    if let Ok(v) = std::env::var("OLLAMA_URL") {
        config.ollama.url = v;
    }
    if let Ok(v) = std::env::var("OPENAI_API_KEY") {
        config.remote.chat_api_key = Some(v);
    }
    if let Ok(v) = std::env::var("MENTAT_CHAT_API_URL") {
        config.remote.chat_url = v;
    }
    if let Ok(v) = std::env::var("HF_API_TOKEN") {
        config.remote.completion_api_key = Some(v);
    }
    if let Ok(v) = std::env::var("MENTAT_COMPLETION_API_URL") {
        config.remote.completion_url = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.chunking.window_chars, 512);
        assert_eq!(config.chunking.overlap_chars, 80);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.history.window_turns, 5);
        assert_eq!(config.chat.default_model, "deepseek-r1:1.5b");
        assert_eq!(config.server.bind, "127.0.0.1:5000");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            window_chars = 256

            [chat]
            default_model = "deepseek-coder:6.7b"
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.window_chars, 256);
        assert_eq!(config.chunking.overlap_chars, 80);
        assert_eq!(config.chat.default_model, "deepseek-coder:6.7b");
        assert_eq!(config.retrieval.top_k, 3);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_window() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[chunking]\nwindow_chars = 100\noverlap_chars = 100\n",
        )
        .unwrap();
        let err = load_config(Some(tmp.path())).unwrap_err();
        assert!(err.to_string().contains("overlap_chars"));
    }
}
