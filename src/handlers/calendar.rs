use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::TaskHandler;
use crate::capability::{CalendarEvent, CalendarPresenter};
use crate::clock::Clock;
use crate::command::{CalendarCommand, ModelCommand};
use crate::extract::{fallback_event, Extractor};
use crate::intent::{IntentCategory, Utterance};
use crate::session::{CompletionParams, ModelSession};

const SYSTEM_PROMPT: &str = r#"Generate a simple json format if date or time given from given text. Parse the Date, Time and Event from the given sentence and give a pure json format like {"Date":"2025-12-24","Time":"13:00","Event":"appointment" }"#;

/// Opens the calendar's event dialog pre-filled from the request.
///
/// Even an unparseable reply produces a dialog, for an untitled event now.
pub struct CalendarHandler {
    presenter: Arc<dyn CalendarPresenter>,
    extractor: Extractor,
    clock: Arc<dyn Clock>,
}

impl CalendarHandler {
    pub fn new(
        presenter: Arc<dyn CalendarPresenter>,
        extractor: Extractor,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            presenter,
            extractor,
            clock,
        }
    }

    async fn present(&self, command: &CalendarCommand) -> Result<(), String> {
        let event = CalendarEvent {
            title: command.title.clone(),
            start: command.start(),
            end: command.end(),
            location: command.location.clone(),
            notes: command.notes.clone(),
        };
        info!(title = %event.title, start = %event.start, "presenting event dialog");
        self.presenter.present_event_dialog(&event).await.map_err(|e| {
            warn!(error = %e, "calendar dialog failed");
            format!("⚠️ Could not open the calendar: {e}")
        })
    }

    async fn present_fallback(&self, command: &CalendarCommand, reason: &str, raw: &str) -> String {
        if let Err(status) = self.present(command).await {
            return status;
        }
        format!(
            "⚠️ Failed to parse response. Showing fallback event:\n📅 {} at {} on {}\nError: {reason}\nRaw LLM Output: \"{raw}\"",
            command.title,
            command.time_label(),
            command.date_label(),
        )
    }
}

#[async_trait]
impl TaskHandler for CalendarHandler {
    fn category(&self) -> IntentCategory {
        IntentCategory::Calendar
    }

    async fn handle(&self, utterance: &Utterance, session: &ModelSession) -> anyhow::Result<String> {
        debug!(input = %utterance.text(), "calendar request");
        let raw = match session
            .complete_with(SYSTEM_PROMPT, utterance.text(), &CompletionParams::GENERAL)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "calendar completion failed");
                let event = fallback_event(self.clock.now());
                return Ok(self.present_fallback(&event, &e.to_string(), "").await);
            }
        };

        let extraction = self
            .extractor
            .extract(IntentCategory::Calendar, &raw, self.clock.now());
        match (extraction.command, extraction.failure) {
            (ModelCommand::Calendar(event), Some(err)) => {
                Ok(self.present_fallback(&event, &err.to_string(), &raw).await)
            }
            (ModelCommand::Calendar(event), None) => {
                if let Err(status) = self.present(&event).await {
                    return Ok(status);
                }
                Ok(format!(
                    "📅 Calendar event dialog shown for: {}\n🕒 {} to {}",
                    event.title,
                    event.start().format("%Y-%m-%d %H:%M"),
                    event.end().format("%Y-%m-%d %H:%M"),
                ))
            }
            (other, _) => anyhow::bail!("calendar extraction produced {other:?}"),
        }
    }
}
