#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use errand::capability::{
    AlarmScheduler, AppLauncher, CalendarEvent, CalendarPresenter, CallPermission, Capabilities,
    Contact, ContactDirectory, Dialer,
};
use errand::handlers::AppCatalog;
use errand::{
    ChatMessage, CapabilityError, CompletionParams, ContextParams, Extractor, FixedClock,
    InferenceContext, InferenceEngine, ModelSession, Router,
};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Wednesday 2026-10-14 09:30:00.
pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 14)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

/// Engine whose context replays canned replies in order, then repeats the last.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    replies: Arc<Mutex<VecDeque<String>>>,
    pub prompts: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    pub params: Arc<Mutex<Vec<CompletionParams>>>,
}

impl ScriptedEngine {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.iter().map(|r| r.to_string()).collect())),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl InferenceEngine for ScriptedEngine {
    async fn initialize(
        &self,
        _path: &Path,
        _params: &ContextParams,
    ) -> anyhow::Result<Box<dyn InferenceContext>> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl InferenceContext for ScriptedEngine {
    async fn complete(
        &mut self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        self.params.lock().unwrap().push(*params);
        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        reply.ok_or_else(|| anyhow::anyhow!("no scripted reply"))
    }

    async fn release(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub async fn ready_session(engine: &ScriptedEngine) -> ModelSession {
    let session = ModelSession::new(Arc::new(engine.clone()), ContextParams::default());
    session.initialize(Path::new("model.gguf")).await.unwrap();
    session
}

/// Scheduler that fails with each queued error in turn, then succeeds.
#[derive(Default)]
pub struct RecordingAlarms {
    pub set: Mutex<Vec<(u32, u32, Vec<u8>)>>,
    pub attempts: Mutex<Vec<(u32, u32, Vec<u8>)>>,
    pub failures: Mutex<VecDeque<CapabilityError>>,
}

impl RecordingAlarms {
    pub fn failing(errors: Vec<CapabilityError>) -> Self {
        Self {
            failures: Mutex::new(errors.into()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl AlarmScheduler for RecordingAlarms {
    async fn set_alarm(&self, hour: u32, minute: u32, weekdays: &[u8]) -> Result<(), CapabilityError> {
        self.attempts.lock().unwrap().push((hour, minute, weekdays.to_vec()));
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.set.lock().unwrap().push((hour, minute, weekdays.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingCalendar {
    pub shown: Mutex<Vec<CalendarEvent>>,
}

#[async_trait]
impl CalendarPresenter for RecordingCalendar {
    async fn present_event_dialog(&self, event: &CalendarEvent) -> Result<(), CapabilityError> {
        self.shown.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct RecordingDialer {
    pub permission: CallPermission,
    pub dialed: Mutex<Vec<String>>,
}

impl Default for RecordingDialer {
    fn default() -> Self {
        Self {
            permission: CallPermission::Granted,
            dialed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Dialer for RecordingDialer {
    async fn request_call_permission(&self) -> CallPermission {
        self.permission
    }

    async fn call(&self, number: &str) -> Result<(), CapabilityError> {
        self.dialed.lock().unwrap().push(number.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingContacts {
    pub contacts: Vec<Contact>,
    pub lookups: Mutex<usize>,
}

impl RecordingContacts {
    pub fn with(entries: &[(&str, &str)]) -> Self {
        Self {
            contacts: entries
                .iter()
                .map(|(name, number)| Contact {
                    name: name.to_string(),
                    number: number.to_string(),
                })
                .collect(),
            lookups: Mutex::new(0),
        }
    }
}

#[async_trait]
impl ContactDirectory for RecordingContacts {
    async fn list_contacts(&self) -> Result<Vec<Contact>, CapabilityError> {
        *self.lookups.lock().unwrap() += 1;
        Ok(self.contacts.clone())
    }
}

#[derive(Default)]
pub struct RecordingLauncher {
    pub installed: HashSet<String>,
    pub probed: Mutex<Vec<String>>,
    pub launched: Mutex<Vec<String>>,
}

impl RecordingLauncher {
    pub fn with(installed: &[&str]) -> Self {
        Self {
            installed: installed.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl AppLauncher for RecordingLauncher {
    async fn is_installed(&self, identifier: &str) -> bool {
        self.probed.lock().unwrap().push(identifier.to_string());
        self.installed.contains(identifier)
    }

    async fn launch(&self, identifier: &str) -> Result<(), CapabilityError> {
        self.launched.lock().unwrap().push(identifier.to_string());
        Ok(())
    }
}

/// Recording fakes for every capability, kept for assertions.
pub struct Fakes {
    pub alarms: Arc<RecordingAlarms>,
    pub calendar: Arc<RecordingCalendar>,
    pub dialer: Arc<RecordingDialer>,
    pub contacts: Arc<RecordingContacts>,
    pub launcher: Arc<RecordingLauncher>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            alarms: Arc::default(),
            calendar: Arc::default(),
            dialer: Arc::default(),
            contacts: Arc::new(RecordingContacts::with(&[
                ("Johnny", "+15550101"),
                ("john", "+15550100"),
                ("John Smith", "+15550102"),
            ])),
            launcher: Arc::new(RecordingLauncher::with(&["com.google.android.youtube"])),
        }
    }
}

impl Fakes {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            alarms: self.alarms.clone(),
            calendar: self.calendar.clone(),
            dialer: self.dialer.clone(),
            contacts: self.contacts.clone(),
            launcher: self.launcher.clone(),
        }
    }

    pub fn router(&self) -> Router {
        Router::standard(
            &self.capabilities(),
            Extractor::default(),
            AppCatalog::default(),
            Arc::new(FixedClock(now())),
        )
    }
}
