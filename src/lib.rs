//! # Mentat Server
//!
//! A retrieval-augmented chat backend for code editors. Clients send a
//! natural-language request plus optional editor context over HTTP and get a
//! generated answer, optionally grounded in previously indexed source
//! snippets.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌──────────────────┐
//! │ POST     │──▶│ Chat           │──▶│ Provider Router   │
//! │ /chat    │   │ Orchestrator   │   │ local / completion │
//! └──────────┘   └──┬─────────┬───┘   │ / chat backends   │
//!                   │         │       └──────────────────┘
//!                   ▼         ▼
//!            ┌──────────┐ ┌──────────┐
//!            │ Chunk    │ │ Session  │
//!            │ Store    │ │ History  │
//!            │ (SQLite) │ │ (memory) │
//!            └──────────┘ └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML + environment configuration |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`chunk`] | Overlapping-window text chunker |
//! | [`embedding`] | Embedding provider seam + vector utilities |
//! | [`db`] | SQLite connection and schema |
//! | [`store`] | Chunk ingestion and similarity retrieval |
//! | [`history`] | Session-scoped conversation logs |
//! | [`runtime`] | Local inference runtime seam (Ollama) |
//! | [`provision`] | On-demand model provisioning |
//! | [`providers`] | Model routing and backend invocation |
//! | [`prompt`] | Prompt composition and response cleaning |
//! | [`chat`] | Request orchestration |
//! | [`server`] | HTTP API |
//! | [`ingest`] | CLI file ingestion |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod history;
pub mod ingest;
pub mod models;
pub mod prompt;
pub mod providers;
pub mod provision;
pub mod runtime;
pub mod server;
pub mod store;
