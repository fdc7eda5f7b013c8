//! HTTP server.
//!
//! JSON API consumed by the editor frontend:
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Run one retrieval-augmented chat request |
//! | `POST` | `/index` | Ingest a document into the chunk store |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Error responses carry a human-readable `error` and, for upstream
//! failures, a `details` field with the provider's own message:
//!
//! ```json
//! { "error": "Model response failed", "details": "model not loaded" }
//! ```
//!
//! Non-JSON request bodies are rejected with `415` by the `Json` extractor.
//! CORS is permissive; the Electron frontend calls from a `file://` origin.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::chat::ChatService;
use crate::config::Config;
use crate::db;
use crate::embedding::OllamaEmbedder;
use crate::error::ChatError;
use crate::history::SessionStore;
use crate::models::{ChatRequest, ChatResponse, IndexRequest, IndexResponse};
use crate::providers::ProviderRouter;
use crate::provision::Provisioner;
use crate::runtime::OllamaRuntime;
use crate::store::ChunkStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub store: Arc<ChunkStore>,
}

/// Wire up the full pipeline from configuration and start serving.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config);

    let pool = db::connect(&config.db.path).await?;
    let embedder = Arc::new(OllamaEmbedder::new(&config.ollama, &config.embedding)?);
    let store = Arc::new(ChunkStore::new(
        pool,
        embedder,
        config.chunking.clone(),
        config.retrieval.clone(),
    ));

    let runtime = Arc::new(OllamaRuntime::new(&config.ollama)?);
    let provisioner = Arc::new(Provisioner::new(runtime.clone()));
    let router = Arc::new(ProviderRouter::new(runtime, config.remote.clone())?);
    let sessions = Arc::new(SessionStore::new(config.history.max_sessions));

    let chat = Arc::new(ChatService::new(
        store.clone(),
        sessions,
        provisioner,
        router,
        config.clone(),
    ));

    let state = AppState { chat, store };
    let app = build_router(state);

    tracing::info!(addr = %bind_addr, "listening");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Assemble the axum router. Separated from [`run_server`] so tests can
/// exercise the HTTP surface with mock state.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/index", post(handle_index))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// JSON error body: human-readable message plus optional upstream detail.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

struct AppError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(message) => AppError {
                status: StatusCode::BAD_REQUEST,
                error: message,
                details: None,
            },
            ChatError::UnsupportedModel(_) => AppError {
                status: StatusCode::BAD_REQUEST,
                error: err.to_string(),
                details: None,
            },
            ChatError::Provisioning { ref model, ref cause } => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: format!("Failed to provision model {}", model),
                details: Some(cause.clone()),
            },
            ChatError::RemoteProvider(detail) => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: "Model response failed".to_string(),
                details: Some(detail),
            },
            ChatError::Timeout(_) => AppError {
                status: StatusCode::REQUEST_TIMEOUT,
                error: err.to_string(),
                details: None,
            },
            ChatError::Store(detail) => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: "Indexing failed".to_string(),
                details: Some(detail),
            },
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /chat ============

async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let outcome = state.chat.handle(request).await?;
    Ok(Json(ChatResponse {
        response: outcome.response,
        session: outcome.session,
    }))
}

// ============ POST /index ============

async fn handle_index(
    State(state): State<AppState>,
    Json(request): Json<IndexRequest>,
) -> Result<Json<IndexResponse>, AppError> {
    let source = request.source.trim().to_string();
    if source.is_empty() {
        return Err(ChatError::Validation("Source name is required.".into()).into());
    }

    let chunks = state.store.ingest(&source, &request.text).await?;
    Ok(Json(IndexResponse { source, chunks }))
}
