pub mod artifact;
pub mod capability;
pub mod clock;
pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod intent;
pub mod mock;
pub mod normalize;
pub mod ollama;
pub mod router;
pub mod session;
pub mod task_log;

pub use artifact::ModelArtifact;
pub use capability::*;
pub use clock::{Clock, FixedClock, SystemClock};
pub use command::*;
pub use config::Config;
pub use error::*;
pub use extract::{Extraction, Extractor};
pub use intent::{IntentCategory, Utterance};
pub use mock::MockEngine;
pub use ollama::OllamaEngine;
pub use router::Router;
pub use session::{
    ChatMessage, CompletionParams, ContextParams, InferenceContext, InferenceEngine, ModelSession,
    SessionState,
};
pub use task_log::{InMemoryTaskStore, JsonFileTaskStore, TaskHistoryStore, TaskLog, TaskRecord};
