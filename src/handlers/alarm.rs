use async_trait::async_trait;
use chrono::Timelike;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::TaskHandler;
use crate::capability::AlarmScheduler;
use crate::clock::Clock;
use crate::command::{AlarmCommand, ModelCommand};
use crate::error::CapabilityError;
use crate::extract::{fallback_alarm, Extractor};
use crate::intent::{IntentCategory, Utterance};
use crate::session::{CompletionParams, ModelSession};

const SYSTEM_PROMPT: &str = r#"Generate a simple JSON format if a day or time is given from the provided text. Parse the Day (e.g., "Monday", "Saturday") and Time, returning a pure JSON format like {"Day":"Saturday","Time":"08:00"}. If no valid day or time is found, return {"Day":null,"Time":null}"#;

/// Schedules alarms. An unparseable reply or a failing scheduler leads to an
/// alarm for "now" instead, unless no clock app exists at all.
pub struct AlarmHandler {
    scheduler: Arc<dyn AlarmScheduler>,
    extractor: Extractor,
    clock: Arc<dyn Clock>,
}

impl AlarmHandler {
    pub fn new(scheduler: Arc<dyn AlarmScheduler>, extractor: Extractor, clock: Arc<dyn Clock>) -> Self {
        Self {
            scheduler,
            extractor,
            clock,
        }
    }

    async fn schedule(&self, alarm: &AlarmCommand) -> Result<(), CapabilityError> {
        info!(time = %alarm.time_label(), weekday = alarm.weekday, "setting alarm");
        self.scheduler
            .set_alarm(alarm.time.hour(), alarm.time.minute(), &[alarm.weekday])
            .await
    }

    async fn schedule_fallback(&self, headline: &str, reason: &str, raw: &str) -> String {
        let alarm = fallback_alarm(self.clock.now());
        match self.schedule(&alarm).await {
            Ok(()) => format!(
                "⚠️ {headline}. Set fallback alarm at {} on {}\nError: {reason}\nRaw LLM Output: \"{raw}\"",
                alarm.time_label(),
                alarm.day_name(),
            ),
            Err(CapabilityError::NoCompatibleApp(msg)) => no_clock_app(&msg),
            Err(e) => {
                warn!(error = %e, "fallback alarm failed");
                format!("⚠️ {e}")
            }
        }
    }
}

fn no_clock_app(msg: &str) -> String {
    format!(
        "⚠️ {}. Please open Google Clock settings and ensure it's enabled, or install another app that supports AlarmClock intents.",
        msg.trim_end_matches('.')
    )
}

#[async_trait]
impl TaskHandler for AlarmHandler {
    fn category(&self) -> IntentCategory {
        IntentCategory::Alarm
    }

    async fn handle(&self, utterance: &Utterance, session: &ModelSession) -> anyhow::Result<String> {
        debug!(input = %utterance.text(), "alarm request");
        let raw = match session
            .complete_with(SYSTEM_PROMPT, utterance.text(), &CompletionParams::GENERAL)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "alarm completion failed");
                return Ok(self
                    .schedule_fallback("Model did not respond", &e.to_string(), "")
                    .await);
            }
        };

        let extraction = self
            .extractor
            .extract(IntentCategory::Alarm, &raw, self.clock.now());
        let alarm = match (extraction.command, extraction.failure) {
            (_, Some(err)) => {
                return Ok(self
                    .schedule_fallback("Failed to parse response", &err.to_string(), &raw)
                    .await);
            }
            (ModelCommand::Alarm(alarm), None) => alarm,
            (other, None) => anyhow::bail!("alarm extraction produced {other:?}"),
        };

        match self.schedule(&alarm).await {
            Ok(()) => Ok(format!(
                "⏰ Alarm set at {} on {} (Day: {})",
                alarm.time_label(),
                alarm.day_name(),
                alarm.weekday
            )),
            Err(CapabilityError::NoCompatibleApp(msg)) => Ok(no_clock_app(&msg)),
            Err(e) => {
                warn!(error = %e, "alarm scheduling failed, trying fallback");
                let fallback = fallback_alarm(self.clock.now());
                match self.schedule(&fallback).await {
                    Ok(()) => Ok(format!(
                        "⚠️ {e}\nSet fallback alarm at {} on {}",
                        fallback.time_label(),
                        fallback.day_name(),
                    )),
                    Err(again) => {
                        warn!(error = %again, "fallback alarm failed");
                        Ok(format!("⚠️ {e}\nFallback alarm failed: {again}"))
                    }
                }
            }
        }
    }
}
