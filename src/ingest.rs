//! Command-line ingestion of local files into the chunk store.
//!
//! Walks a file or directory, reads text-like files, and ingests each as its
//! own source named by its path relative to the ingest root. Used to seed the
//! index before serving; the `POST /index` endpoint covers the same ground at
//! runtime.

use anyhow::{Context, Result};
use std::path::Path;
use walkdir::WalkDir;

use crate::store::ChunkStore;

/// File extensions treated as ingestable text.
const TEXT_EXTENSIONS: &[&str] = &[
    "md", "txt", "rs", "py", "js", "ts", "go", "java", "c", "h", "cpp", "toml", "json", "yaml",
    "yml",
];

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TEXT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Ingest `path` (file or directory) into the store. Returns the number of
/// documents ingested.
pub async fn run_ingest(store: &ChunkStore, path: &Path) -> Result<usize> {
    let mut documents = 0usize;
    let mut chunks_total = 0usize;

    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_text_file(entry.path()) {
            continue;
        }

        let text = std::fs::read_to_string(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        if text.trim().is_empty() {
            continue;
        }

        let source = entry
            .path()
            .strip_prefix(path)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .to_string();
        let source = if source.is_empty() {
            entry.path().to_string_lossy().to_string()
        } else {
            source
        };

        let chunks = store
            .ingest(&source, &text)
            .await
            .with_context(|| format!("Failed to ingest {}", source))?;

        documents += 1;
        chunks_total += chunks;
    }

    println!("ingest {}", path.display());
    println!("  documents: {}", documents);
    println!("  chunks written: {}", chunks_total);
    println!("ok");

    Ok(documents)
}
