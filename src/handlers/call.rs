use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{failure_reason, place_call, TaskHandler};
use crate::capability::Dialer;
use crate::clock::Clock;
use crate::command::ModelCommand;
use crate::extract::Extractor;
use crate::intent::{IntentCategory, Utterance};
use crate::session::{CompletionParams, ModelSession};

const SYSTEM_PROMPT: &str = r#"Generate a simple JSON format for the number in the given sentence. Extract only the number and return it as {"Number":""}"#;

/// Dials a number spoken in the request. Never consults contacts.
pub struct CallHandler {
    dialer: Arc<dyn Dialer>,
    extractor: Extractor,
    clock: Arc<dyn Clock>,
}

impl CallHandler {
    pub fn new(dialer: Arc<dyn Dialer>, extractor: Extractor, clock: Arc<dyn Clock>) -> Self {
        Self {
            dialer,
            extractor,
            clock,
        }
    }
}

#[async_trait]
impl TaskHandler for CallHandler {
    fn category(&self) -> IntentCategory {
        IntentCategory::Call
    }

    async fn handle(&self, utterance: &Utterance, session: &ModelSession) -> anyhow::Result<String> {
        debug!(input = %utterance.text(), "call request");
        let raw = match session
            .complete_with(SYSTEM_PROMPT, utterance.text(), &CompletionParams::TERSE)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "call completion failed");
                return Ok(format!("⚠️ Failed to make call. {e}"));
            }
        };

        let extraction = self
            .extractor
            .extract(IntentCategory::Call, &raw, self.clock.now());
        match &extraction.command {
            ModelCommand::Call(call) if !extraction.is_fallback() => {
                Ok(place_call(self.dialer.as_ref(), &call.number).await)
            }
            _ => Ok(format!("⚠️ Failed to make call. {}", failure_reason(&extraction))),
        }
    }
}
