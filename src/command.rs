use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;

use crate::intent::IntentCategory;
use crate::normalize::{format_date, format_time, weekday_name};

/// Placeholder title for calendar events without one.
pub const UNTITLED_EVENT: &str = "Untitled Event";

/// Calendar events last a fixed hour.
pub const EVENT_DURATION_MINUTES: i64 = 60;

/// Validated, normalized command produced by the [`crate::Extractor`].
///
/// `Unresolved` is the fallback for categories with no safe default action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ModelCommand {
    Alarm(AlarmCommand),
    Calendar(CalendarCommand),
    Call(CallCommand),
    ContactCall(ContactCallCommand),
    OpenApp(OpenAppCommand),
    Answer(String),
    Unresolved(IntentCategory),
}

impl ModelCommand {
    pub fn category(&self) -> IntentCategory {
        match self {
            ModelCommand::Alarm(_) => IntentCategory::Alarm,
            ModelCommand::Calendar(_) => IntentCategory::Calendar,
            ModelCommand::Call(_) => IntentCategory::Call,
            ModelCommand::ContactCall(_) => IntentCategory::ContactCall,
            ModelCommand::OpenApp(_) => IntentCategory::OpenApp,
            ModelCommand::Answer(_) => IntentCategory::QA,
            ModelCommand::Unresolved(category) => *category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct AlarmCommand {
    /// 1 (Sunday) through 7 (Saturday).
    pub weekday: u8,
    pub time: NaiveTime,
}

impl AlarmCommand {
    pub(crate) fn new(weekday: u8, time: NaiveTime) -> Self {
        Self { weekday, time }
    }

    pub fn day_name(&self) -> &'static str {
        weekday_name(self.weekday)
    }

    pub fn time_label(&self) -> String {
        format_time(self.time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct CalendarCommand {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub title: String,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl CalendarCommand {
    pub(crate) fn new(date: NaiveDate, time: NaiveTime, title: String) -> Self {
        Self {
            date,
            time,
            title,
            location: None,
            notes: None,
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn end(&self) -> NaiveDateTime {
        self.start() + TimeDelta::minutes(EVENT_DURATION_MINUTES)
    }

    pub fn date_label(&self) -> String {
        format_date(self.date)
    }

    pub fn time_label(&self) -> String {
        format_time(self.time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct CallCommand {
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct ContactCallCommand {
    /// Whitespace-normalized name as the model gave it.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct OpenAppCommand {
    /// Lower-cased, whitespace-normalized application label.
    pub label: String,
}
