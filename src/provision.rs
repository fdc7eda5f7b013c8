//! On-demand local model provisioning.
//!
//! Tracks an install state machine per model identifier:
//!
//! ```text
//! Unknown → Checking → {Installed, NotInstalled}
//!                       NotInstalled → Downloading → {Installed, DownloadFailed}
//! ```
//!
//! `ensure_available` is idempotent: once a model is known to be installed,
//! later calls return without touching the runtime. A per-model single-flight
//! guard means concurrent requests for the same missing model wait on one
//! download instead of triggering N. Provisioning failure is fatal to the
//! request but not the process; there is no internal retry, callers re-invoke
//! to try again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::ChatError;
use crate::runtime::LocalRuntime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Unknown,
    Checking,
    Installed,
    NotInstalled,
    Downloading,
    DownloadFailed,
}

/// Ensure a model name carries a tag; Ollama treats untagged names as
/// `:latest` and lists them tagged.
pub fn normalize_model_name(name: &str) -> String {
    if name.contains(':') {
        name.to_string()
    } else {
        format!("{}:latest", name)
    }
}

pub struct Provisioner {
    runtime: Arc<dyn LocalRuntime>,
    states: StdMutex<HashMap<String, InstallState>>,
    /// One async mutex per model so only one task checks/downloads it.
    flights: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Provisioner {
    pub fn new(runtime: Arc<dyn LocalRuntime>) -> Self {
        Self {
            runtime,
            states: StdMutex::new(HashMap::new()),
            flights: StdMutex::new(HashMap::new()),
        }
    }

    fn state(&self, model: &str) -> InstallState {
        self.states
            .lock()
            .expect("provisioner state lock poisoned")
            .get(model)
            .copied()
            .unwrap_or(InstallState::Unknown)
    }

    fn set_state(&self, model: &str, state: InstallState) {
        self.states
            .lock()
            .expect("provisioner state lock poisoned")
            .insert(model.to_string(), state);
    }

    fn flight(&self, model: &str) -> Arc<AsyncMutex<()>> {
        self.flights
            .lock()
            .expect("provisioner flight lock poisoned")
            .entry(model.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Make sure `model` is installed in the local runtime, downloading it if
    /// necessary. Returns the normalized model name to use for generation.
    pub async fn ensure_available(&self, model: &str) -> Result<String, ChatError> {
        let normalized = normalize_model_name(model);

        if self.state(&normalized) == InstallState::Installed {
            return Ok(normalized);
        }

        let flight = self.flight(&normalized);
        let _guard = flight.lock().await;

        // Another request may have finished provisioning while we waited.
        if self.state(&normalized) == InstallState::Installed {
            return Ok(normalized);
        }

        self.set_state(&normalized, InstallState::Checking);
        let installed = match self.runtime.list_installed().await {
            Ok(names) => names,
            Err(err) => {
                self.set_state(&normalized, InstallState::Unknown);
                return Err(ChatError::Provisioning {
                    model: normalized,
                    cause: format!("listing installed models failed: {}", err),
                });
            }
        };

        if installed.iter().any(|name| *name == normalized) {
            self.set_state(&normalized, InstallState::Installed);
            return Ok(normalized);
        }

        self.set_state(&normalized, InstallState::NotInstalled);
        tracing::info!(model = %normalized, "model not installed, downloading");
        self.set_state(&normalized, InstallState::Downloading);

        match self.runtime.pull(&normalized).await {
            Ok(()) => {
                self.set_state(&normalized, InstallState::Installed);
                tracing::info!(model = %normalized, "model downloaded");
                Ok(normalized)
            }
            Err(err) => {
                self.set_state(&normalized, InstallState::DownloadFailed);
                Err(ChatError::Provisioning {
                    model: normalized,
                    cause: err.to_string(),
                })
            }
        }
    }
}
