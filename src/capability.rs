//! Device capabilities the core cannot perform itself.
//!
//! Each trait is implemented by the host platform; tests substitute fakes.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::CapabilityError;

#[async_trait]
pub trait AlarmScheduler: Send + Sync {
    /// Schedule an alarm. `weekdays` are 1 (Sunday) through 7 (Saturday).
    async fn set_alarm(&self, hour: u32, minute: u32, weekdays: &[u8]) -> Result<(), CapabilityError>;
}

/// Event details handed to the calendar's creation dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[async_trait]
pub trait CalendarPresenter: Send + Sync {
    async fn present_event_dialog(&self, event: &CalendarEvent) -> Result<(), CapabilityError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPermission {
    Granted,
    Denied,
}

#[async_trait]
pub trait Dialer: Send + Sync {
    async fn request_call_permission(&self) -> CallPermission;
    async fn call(&self, number: &str) -> Result<(), CapabilityError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub number: String,
}

#[async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn list_contacts(&self) -> Result<Vec<Contact>, CapabilityError>;
}

#[async_trait]
pub trait AppLauncher: Send + Sync {
    async fn is_installed(&self, identifier: &str) -> bool;
    async fn launch(&self, identifier: &str) -> Result<(), CapabilityError>;
}

/// The full set of collaborators the standard handlers need.
#[derive(Clone)]
pub struct Capabilities {
    pub alarms: Arc<dyn AlarmScheduler>,
    pub calendar: Arc<dyn CalendarPresenter>,
    pub dialer: Arc<dyn Dialer>,
    pub contacts: Arc<dyn ContactDirectory>,
    pub launcher: Arc<dyn AppLauncher>,
}
