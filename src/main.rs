//! # Mentat CLI (`mentat`)
//!
//! ```bash
//! mentat --config ./mentat.toml serve      # start the HTTP backend
//! mentat ingest ./docs                     # index local files
//! ```
//!
//! Without `--config`, built-in defaults are used (local Ollama on
//! `localhost:11434`, SQLite under `data/`); environment variables such as
//! `MENTAT_DEFAULT_MODEL` and `OPENAI_API_KEY` override individual settings.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use mentat_server::config::load_config;
use mentat_server::embedding::OllamaEmbedder;
use mentat_server::store::ChunkStore;
use mentat_server::{db, ingest, server};

#[derive(Parser)]
#[command(name = "mentat", version, about = "Retrieval-augmented chat backend")]
struct Cli {
    /// Path to a TOML config file. Optional; defaults target a local Ollama.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server.
    Serve,
    /// Ingest a file or directory into the chunk index.
    Ingest {
        /// File or directory to index.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve => server::run_server(config).await,
        Command::Ingest { path } => {
            let pool = db::connect(&config.db.path).await?;
            let embedder = Arc::new(OllamaEmbedder::new(&config.ollama, &config.embedding)?);
            let store = ChunkStore::new(
                pool,
                embedder,
                config.chunking.clone(),
                config.retrieval.clone(),
            );
            ingest::run_ingest(&store, &path).await?;
            Ok(())
        }
    }
}
