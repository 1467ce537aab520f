//! Capability handlers: one per [`IntentCategory`].
//!
//! Each handler prompts the model, extracts a command, performs the device
//! action and reports a human-readable status. Expected failures become
//! status strings; an `Err` means something unexpected and is converted by
//! the router.

pub mod alarm;
pub mod calendar;
pub mod call;
pub mod contact_call;
pub mod open_app;
pub mod qa;

use async_trait::async_trait;
use std::sync::Arc;

use crate::capability::{CallPermission, Capabilities, Dialer};
use crate::clock::Clock;
use crate::extract::{Extraction, Extractor};
use crate::intent::{IntentCategory, Utterance};
use crate::session::ModelSession;

pub use alarm::AlarmHandler;
pub use calendar::CalendarHandler;
pub use call::CallHandler;
pub use contact_call::ContactCallHandler;
pub use open_app::{AppCatalog, OpenAppHandler};
pub use qa::QaHandler;

#[async_trait]
pub trait TaskHandler: Send + Sync {
    fn category(&self) -> IntentCategory;

    async fn handle(&self, utterance: &Utterance, session: &ModelSession) -> anyhow::Result<String>;
}

/// All six handlers wired to `caps`, in router precedence order.
pub fn standard(
    caps: &Capabilities,
    extractor: Extractor,
    apps: AppCatalog,
    clock: Arc<dyn Clock>,
) -> Vec<Arc<dyn TaskHandler>> {
    vec![
        Arc::new(AlarmHandler::new(caps.alarms.clone(), extractor.clone(), clock.clone())),
        Arc::new(CalendarHandler::new(
            caps.calendar.clone(),
            extractor.clone(),
            clock.clone(),
        )),
        Arc::new(CallHandler::new(caps.dialer.clone(), extractor.clone(), clock.clone())),
        Arc::new(ContactCallHandler::new(
            caps.dialer.clone(),
            caps.contacts.clone(),
            extractor.clone(),
            clock.clone(),
        )),
        Arc::new(OpenAppHandler::new(
            caps.launcher.clone(),
            apps,
            extractor.clone(),
            clock.clone(),
        )),
        Arc::new(QaHandler::new(extractor, clock)),
    ]
}

pub(crate) const CALL_PERMISSION_DENIED: &str = "⚠️ Permission denied to make direct call.";

/// Ask for permission, then dial `number`.
pub(crate) async fn place_call(dialer: &dyn Dialer, number: &str) -> String {
    if dialer.request_call_permission().await == CallPermission::Denied {
        return CALL_PERMISSION_DENIED.to_string();
    }
    match dialer.call(number).await {
        Ok(()) => format!("📞 Calling {number}..."),
        Err(e) => format!("⚠️ {e}"),
    }
}

/// Why `extraction` produced no usable command.
pub(crate) fn failure_reason(extraction: &Extraction) -> String {
    match &extraction.failure {
        Some(err) => err.to_string(),
        None => format!("unexpected command {:?}", extraction.command),
    }
}
