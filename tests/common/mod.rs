#![allow(dead_code)]

//! Shared fixtures: deterministic embedder, scriptable local runtime, and a
//! fully wired `ChatService` backed by a temp-file database.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use mentat_server::chat::ChatService;
use mentat_server::config::{ChunkingConfig, Config, RetrievalConfig};
use mentat_server::db;
use mentat_server::embedding::Embedder;
use mentat_server::error::ChatError;
use mentat_server::history::SessionStore;
use mentat_server::providers::ProviderRouter;
use mentat_server::provision::Provisioner;
use mentat_server::runtime::{GenerateOptions, LocalRuntime};
use mentat_server::store::ChunkStore;

/// Deterministic embedding: position-mixed byte histogram. Identical texts
/// embed identically (cosine 1.0); different texts land measurably lower.
pub struct BagEmbedder;

pub fn bag_embed(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 64];
    for (i, b) in text.bytes().enumerate() {
        v[(b as usize + i) % 64] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for BagEmbedder {
    fn model_name(&self) -> &str {
        "bag-of-bytes"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
        Ok(texts.iter().map(|t| bag_embed(t)).collect())
    }
}

/// Embedder that always fails, for exercising degraded-retrieval paths.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
        Err(ChatError::Store("embedding backend unavailable".into()))
    }
}

/// Scriptable in-memory stand-in for Ollama.
pub struct ScriptedRuntime {
    pub installed: Mutex<Vec<String>>,
    pub response: String,
    pub fail_pull: bool,
    pub prompts: Mutex<Vec<String>>,
    pub pull_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
}

impl ScriptedRuntime {
    pub fn new(installed: &[&str], response: &str) -> Self {
        Self {
            installed: Mutex::new(installed.iter().map(|s| s.to_string()).collect()),
            response: response.to_string(),
            fail_pull: false,
            prompts: Mutex::new(Vec::new()),
            pull_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_pull(installed: &[&str]) -> Self {
        let mut runtime = Self::new(installed, "unused");
        runtime.fail_pull = true;
        runtime
    }
}

#[async_trait]
impl LocalRuntime for ScriptedRuntime {
    async fn generate(
        &self,
        _model: &str,
        prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<String, ChatError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.response.clone())
    }

    async fn list_installed(&self) -> Result<Vec<String>, ChatError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.installed.lock().unwrap().clone())
    }

    async fn pull(&self, model: &str) -> Result<(), ChatError> {
        self.pull_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_pull {
            return Err(ChatError::RemoteProvider("pull failed: no such manifest".into()));
        }
        self.installed.lock().unwrap().push(model.to_string());
        Ok(())
    }
}

/// Router over a fully wired app, for driving the HTTP surface in-process.
pub async fn test_app(
    tmp: &TempDir,
    embedder: Arc<dyn Embedder>,
    runtime: Arc<dyn LocalRuntime>,
) -> axum::Router {
    let config = Arc::new(Config::default());
    let store = Arc::new(
        test_store(
            tmp,
            embedder,
            config.chunking.clone(),
            config.retrieval.clone(),
        )
        .await,
    );
    let sessions = Arc::new(SessionStore::new(config.history.max_sessions));
    let provisioner = Arc::new(Provisioner::new(runtime.clone()));
    let router = Arc::new(ProviderRouter::new(runtime, config.remote.clone()).unwrap());
    let chat = Arc::new(ChatService::new(
        store.clone(),
        sessions,
        provisioner,
        router,
        config,
    ));

    mentat_server::server::build_router(mentat_server::server::AppState { chat, store })
}

pub fn temp_db_path(tmp: &TempDir) -> PathBuf {
    tmp.path().join("index.sqlite")
}

/// Chunk store on a temp database with test-sized windows.
pub async fn test_store(
    tmp: &TempDir,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
    retrieval: RetrievalConfig,
) -> ChunkStore {
    let pool = db::connect(&temp_db_path(tmp)).await.unwrap();
    ChunkStore::new(pool, embedder, chunking, retrieval)
}

/// Fully wired orchestrator with the given embedder and runtime.
pub async fn test_service(
    tmp: &TempDir,
    embedder: Arc<dyn Embedder>,
    runtime: Arc<dyn LocalRuntime>,
) -> ChatService {
    let config = Arc::new(Config::default());
    let store = Arc::new(
        test_store(
            tmp,
            embedder,
            config.chunking.clone(),
            config.retrieval.clone(),
        )
        .await,
    );
    let sessions = Arc::new(SessionStore::new(config.history.max_sessions));
    let provisioner = Arc::new(Provisioner::new(runtime.clone()));
    let router = Arc::new(ProviderRouter::new(runtime, config.remote.clone()).unwrap());

    ChatService::new(store, sessions, provisioner, router, config)
}
