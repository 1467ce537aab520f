use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::TaskHandler;
use crate::clock::Clock;
use crate::command::ModelCommand;
use crate::extract::Extractor;
use crate::intent::{IntentCategory, Utterance};
use crate::session::{CompletionParams, ModelSession};

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Analyze the user input and provide a concise, accurate answer.";

const QA_FAILED: &str = "⚠️ Error processing question. Please try again.";

/// Answers free-form questions with the model's own text.
pub struct QaHandler {
    extractor: Extractor,
    clock: Arc<dyn Clock>,
}

impl QaHandler {
    pub fn new(extractor: Extractor, clock: Arc<dyn Clock>) -> Self {
        Self { extractor, clock }
    }
}

#[async_trait]
impl TaskHandler for QaHandler {
    fn category(&self) -> IntentCategory {
        IntentCategory::QA
    }

    async fn handle(&self, utterance: &Utterance, session: &ModelSession) -> anyhow::Result<String> {
        debug!(input = %utterance.text(), "question");
        let raw = match session
            .complete_with(SYSTEM_PROMPT, utterance.text(), &CompletionParams::GENERAL)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "question completion failed");
                return Ok(QA_FAILED.to_string());
            }
        };

        let extraction = self
            .extractor
            .extract(IntentCategory::QA, &raw, self.clock.now());
        match extraction.command {
            ModelCommand::Answer(answer) => Ok(answer),
            _ => Ok(QA_FAILED.to_string()),
        }
    }
}
