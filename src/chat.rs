//! Chat orchestration.
//!
//! The one entry point that sequences a chat request end to end: validate,
//! retrieve context, record the user turn, compose the backend-appropriate
//! prompt, provision local models, invoke the provider, clean local output,
//! and record the assistant turn. Retrieval failures degrade to an empty
//! context; every other failure short-circuits. The user turn appended
//! before the provider call is deliberately kept when the call fails.

use std::sync::Arc;

use crate::config::Config;
use crate::error::ChatError;
use crate::history::SessionStore;
use crate::models::{BackendKind, ChatRequest, ConversationTurn};
use crate::prompt::{clean_response, compose_local_prompt, compose_transcript};
use crate::providers::{resolve_backend, ProviderRouter};
use crate::provision::Provisioner;
use crate::store::ChunkStore;

/// Result of one orchestrated chat request.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub response: String,
    pub session: String,
}

pub struct ChatService {
    store: Arc<ChunkStore>,
    sessions: Arc<SessionStore>,
    provisioner: Arc<Provisioner>,
    router: Arc<ProviderRouter>,
    config: Arc<Config>,
}

impl ChatService {
    pub fn new(
        store: Arc<ChunkStore>,
        sessions: Arc<SessionStore>,
        provisioner: Arc<Provisioner>,
        router: Arc<ProviderRouter>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            sessions,
            provisioner,
            router,
            config,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Run one chat request to completion.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatOutcome, ChatError> {
        let message = request.message.trim().to_string();
        if message.is_empty() {
            return Err(ChatError::Validation("Message cannot be empty.".into()));
        }

        let model = match request.model {
            Some(model) => {
                let model = model.trim().to_string();
                if model.is_empty() {
                    return Err(ChatError::Validation("Model name is required.".into()));
                }
                model
            }
            None => self.config.chat.default_model.clone(),
        };

        let backend = resolve_backend(&model)?;
        let session = self.sessions.resolve(request.session.as_deref());

        tracing::info!(
            session = %session,
            model = %model,
            backend = ?backend,
            "chat request"
        );

        // Retrieval failures must not take down the chat path; degrade to an
        // empty context.
        let context = match self
            .store
            .retrieve(&message, self.store.default_top_k())
            .await
        {
            Ok(chunks) => chunks,
            Err(err) => {
                tracing::warn!(error = %err, "context retrieval failed, continuing without context");
                Vec::new()
            }
        };

        // The user turn goes in before the provider call and stays there even
        // if the call fails.
        self.sessions
            .append(&session, ConversationTurn::user(message.clone()));

        let window = self
            .sessions
            .recent_window(&session, self.config.history.window_turns);
        let system = self.config.chat.system_prompt.as_deref();

        let raw = match backend {
            BackendKind::Local => {
                let prompt = compose_local_prompt(
                    system,
                    &context,
                    request.context.as_deref(),
                    &message,
                );
                let normalized = self.provisioner.ensure_available(&model).await?;
                let raw = self.router.local_invoke(&normalized, &prompt).await?;
                clean_response(&raw)
            }
            BackendKind::RemoteCompletion => {
                let transcript = compose_transcript(&window);
                self.router
                    .remote_completion_invoke(&model, &transcript)
                    .await?
            }
            BackendKind::RemoteChat => {
                self.router
                    .remote_chat_invoke(&model, system, &window)
                    .await?
            }
        };

        self.sessions
            .append(&session, ConversationTurn::assistant(raw.clone()));

        tracing::info!(session = %session, chars = raw.len(), "chat response ready");

        Ok(ChatOutcome {
            response: raw,
            session,
        })
    }
}
