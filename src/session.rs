use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, trace, warn};

use crate::artifact::ModelArtifact;
use crate::error::SessionError;

/// Role-tagged chat message sent to the inference engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Parameters for loading an inference context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextParams {
    pub context_size: u32,
    pub threads: u32,
}

impl Default for ContextParams {
    fn default() -> Self {
        Self {
            context_size: 512,
            threads: 4,
        }
    }
}

/// Per-request sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionParams {
    /// Long-form output: alarm, calendar and questions.
    pub const GENERAL: CompletionParams = CompletionParams {
        max_tokens: 500,
        temperature: 0.7,
    };

    /// Short single-field extraction: numbers, names, app labels.
    pub const TERSE: CompletionParams = CompletionParams {
        max_tokens: 300,
        temperature: 0.5,
    };
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self::GENERAL
    }
}

/// Loads inference contexts. Implemented by the host's model runtime.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn initialize(
        &self,
        path: &Path,
        params: &ContextParams,
    ) -> anyhow::Result<Box<dyn InferenceContext>>;
}

/// A loaded model ready to answer completions.
#[async_trait]
pub trait InferenceContext: Send {
    async fn complete(
        &mut self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> anyhow::Result<String>;

    async fn release(&mut self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Loading,
    Ready,
    Released,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Loading => "loading",
            SessionState::Ready => "ready",
            SessionState::Released => "released",
        };
        f.write_str(name)
    }
}

/// The conversation's single inference context.
///
/// Completions are serialized: the context sits behind an async mutex, so a
/// second caller waits for the first to finish. Waiters are served in FIFO
/// order.
pub struct ModelSession {
    engine: Arc<dyn InferenceEngine>,
    params: ContextParams,
    state: Mutex<SessionState>,
    context: tokio::sync::Mutex<Option<Box<dyn InferenceContext>>>,
}

impl ModelSession {
    pub fn new(engine: Arc<dyn InferenceEngine>, params: ContextParams) -> Self {
        Self {
            engine,
            params,
            state: Mutex::new(SessionState::Uninitialized),
            context: tokio::sync::Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Load the model at `path`. Only valid from `Uninitialized`.
    ///
    /// On failure the session returns to `Uninitialized`; retrying is up to
    /// the caller. A [`ModelSession::release`] issued while loading is final.
    pub async fn initialize(&self, path: &Path) -> Result<(), SessionError> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != SessionState::Uninitialized {
                return Err(SessionError::InvalidState {
                    expected: SessionState::Uninitialized,
                    found: *state,
                });
            }
            *state = SessionState::Loading;
        }
        info!(path = %path.display(), "loading model");

        let loaded = self.engine.initialize(path, &self.params).await;
        let mut slot = self.context.lock().await;
        match loaded {
            Ok(mut ctx) => {
                if self.state() != SessionState::Loading {
                    // Released while loading.
                    if let Err(e) = ctx.release().await {
                        warn!(error = %e, "failed to release context loaded after teardown");
                    }
                    return Err(SessionError::ModelUnavailable(
                        "session was released while loading".into(),
                    ));
                }
                *slot = Some(ctx);
                self.set_state(SessionState::Ready);
                info!("model loaded, session ready");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "model failed to load");
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                if *state == SessionState::Loading {
                    *state = SessionState::Uninitialized;
                }
                Err(SessionError::ModelUnavailable(e.to_string()))
            }
        }
    }

    /// Load a downloadable artifact, refusing when it is not on disk.
    pub async fn initialize_artifact(&self, artifact: &ModelArtifact) -> Result<(), SessionError> {
        if !artifact.is_present().await {
            return Err(SessionError::ModelUnavailable(format!(
                "{} is not present at {}",
                artifact.name,
                artifact.local_path.display()
            )));
        }
        self.initialize(&artifact.local_path).await
    }

    /// One completion with general-purpose sampling.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, SessionError> {
        self.complete_with(system, user, &CompletionParams::default())
            .await
    }

    /// Issue exactly one inference request, waiting for any in-flight one.
    pub async fn complete_with(
        &self,
        system: &str,
        user: &str,
        params: &CompletionParams,
    ) -> Result<String, SessionError> {
        trace!("waiting for model session");
        let mut slot = self.context.lock().await;
        let state = self.state();
        let ctx = match (state, slot.as_mut()) {
            (SessionState::Ready, Some(ctx)) => ctx,
            _ => {
                return Err(SessionError::ModelUnavailable(format!(
                    "session is {state}"
                )));
            }
        };

        let messages = [ChatMessage::system(system), ChatMessage::user(user)];
        trace!(target: "llm", %system, %user, "completion request");
        let text = ctx
            .complete(&messages, params)
            .await
            .map_err(|e| SessionError::Inference(e.to_string()))?;
        debug!(target: "llm", response = %text, "completion response");
        Ok(text)
    }

    /// Tear down the context. Safe to call more than once.
    pub async fn release(&self) {
        let mut slot = self.context.lock().await;
        if let Some(mut ctx) = slot.take() {
            if let Err(e) = ctx.release().await {
                warn!(error = %e, "error while releasing model context");
            }
            info!("model session released");
        }
        self.set_state(SessionState::Released);
    }
}
