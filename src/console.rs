//! Capabilities for running on a desktop terminal: actions are logged and
//! treated as performed.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use crate::capability::{
    AlarmScheduler, AppLauncher, CalendarEvent, CalendarPresenter, CallPermission, Capabilities,
    Contact, ContactDirectory, Dialer,
};
use crate::config::Config;
use crate::error::CapabilityError;

#[derive(Debug, Default)]
pub struct ConsoleAlarms;

#[async_trait]
impl AlarmScheduler for ConsoleAlarms {
    async fn set_alarm(&self, hour: u32, minute: u32, weekdays: &[u8]) -> Result<(), CapabilityError> {
        info!(hour, minute, ?weekdays, "alarm scheduled");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConsoleCalendar;

#[async_trait]
impl CalendarPresenter for ConsoleCalendar {
    async fn present_event_dialog(&self, event: &CalendarEvent) -> Result<(), CapabilityError> {
        info!(
            title = %event.title,
            start = %event.start,
            end = %event.end,
            location = ?event.location,
            "event dialog shown"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConsoleDialer;

#[async_trait]
impl Dialer for ConsoleDialer {
    async fn request_call_permission(&self) -> CallPermission {
        CallPermission::Granted
    }

    async fn call(&self, number: &str) -> Result<(), CapabilityError> {
        info!(%number, "dialing");
        Ok(())
    }
}

/// Contacts read from configuration.
#[derive(Debug, Default)]
pub struct StaticContacts {
    contacts: Vec<Contact>,
}

impl StaticContacts {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl ContactDirectory for StaticContacts {
    async fn list_contacts(&self) -> Result<Vec<Contact>, CapabilityError> {
        Ok(self.contacts.clone())
    }
}

/// Launcher that knows only the configured set of installed identifiers.
#[derive(Debug, Default)]
pub struct ConsoleLauncher {
    installed: BTreeSet<String>,
}

impl ConsoleLauncher {
    pub fn new(installed: BTreeSet<String>) -> Self {
        Self { installed }
    }
}

#[async_trait]
impl AppLauncher for ConsoleLauncher {
    async fn is_installed(&self, identifier: &str) -> bool {
        self.installed.contains(identifier)
    }

    async fn launch(&self, identifier: &str) -> Result<(), CapabilityError> {
        if !self.installed.contains(identifier) {
            return Err(CapabilityError::NotFound(format!(
                "{identifier} cannot be launched"
            )));
        }
        info!(%identifier, "app launched");
        Ok(())
    }
}

/// Console capabilities populated from `cfg`.
pub fn capabilities(cfg: &Config) -> Capabilities {
    Capabilities {
        alarms: Arc::new(ConsoleAlarms),
        calendar: Arc::new(ConsoleCalendar),
        dialer: Arc::new(ConsoleDialer),
        contacts: Arc::new(StaticContacts::new(cfg.contacts.clone())),
        launcher: Arc::new(ConsoleLauncher::new(cfg.apps.installed.clone())),
    }
}
