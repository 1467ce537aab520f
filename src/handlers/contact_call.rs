use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{failure_reason, place_call, TaskHandler};
use crate::capability::{CallPermission, Contact, ContactDirectory, Dialer};
use crate::clock::Clock;
use crate::command::ModelCommand;
use crate::extract::Extractor;
use crate::intent::{IntentCategory, Utterance};
use crate::normalize::{names_match, normalize_phone};
use crate::session::{CompletionParams, ModelSession};

const SYSTEM_PROMPT: &str = r#"Generate a simple JSON format for the word or phrase after "call" or "call to" from the given text. Parse that word or phrase exactly as it appears and return a pure JSON format like {"Name":""}"#;

/// Shortest digit run treated as a number to dial directly.
const DIRECT_DIAL_DIGITS: usize = 10;

/// Calls a contact by name, or dials directly when the request already
/// carries a number.
pub struct ContactCallHandler {
    dialer: Arc<dyn Dialer>,
    contacts: Arc<dyn ContactDirectory>,
    extractor: Extractor,
    clock: Arc<dyn Clock>,
}

impl ContactCallHandler {
    pub fn new(
        dialer: Arc<dyn Dialer>,
        contacts: Arc<dyn ContactDirectory>,
        extractor: Extractor,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            dialer,
            contacts,
            extractor,
            clock,
        }
    }

    async fn call_by_name(&self, name: &str) -> String {
        if self.dialer.request_call_permission().await == CallPermission::Denied {
            return "⚠️ Permissions denied for contacts or calling.".to_string();
        }
        let contacts = match self.contacts.list_contacts().await {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!(error = %e, "contact lookup failed");
                return format!("⚠️ {e}");
            }
        };
        let Some(contact) = find_contact(&contacts, name) else {
            info!(%name, searched = contacts.len(), "no matching contact");
            return format!("❌ No contact found with name \"{name}\"");
        };
        match self.dialer.call(&contact.number).await {
            Ok(()) => format!("📞 Calling {} ({})...", contact.name, contact.number),
            Err(e) => format!("⚠️ {e}"),
        }
    }
}

/// First contact with a dialable number whose full name matches `name`.
fn find_contact<'a>(contacts: &'a [Contact], name: &str) -> Option<&'a Contact> {
    contacts
        .iter()
        .filter(|c| !c.number.trim().is_empty())
        .find(|c| names_match(&c.name, name))
}

#[async_trait]
impl TaskHandler for ContactCallHandler {
    fn category(&self) -> IntentCategory {
        IntentCategory::ContactCall
    }

    async fn handle(&self, utterance: &Utterance, session: &ModelSession) -> anyhow::Result<String> {
        debug!(input = %utterance.text(), "contact call request");
        if let Some(number) = utterance.dialable_number(DIRECT_DIAL_DIGITS) {
            let number = normalize_phone(number, self.extractor.country_code());
            debug!(%number, "dialing number found in request");
            return Ok(place_call(self.dialer.as_ref(), &number).await);
        }

        let raw = match session
            .complete_with(SYSTEM_PROMPT, utterance.text(), &CompletionParams::TERSE)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "contact call completion failed");
                return Ok(format!("⚠️ Failed to call contact. {e}"));
            }
        };

        let extraction = self
            .extractor
            .extract(IntentCategory::ContactCall, &raw, self.clock.now());
        match &extraction.command {
            ModelCommand::ContactCall(cmd) if !extraction.is_fallback() => {
                Ok(self.call_by_name(&cmd.name).await)
            }
            _ => Ok(format!(
                "⚠️ Failed to call contact. {}",
                failure_reason(&extraction)
            )),
        }
    }
}
