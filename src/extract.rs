//! Structured extraction of commands from free-form model output.
//!
//! Every step returns a `Result`; the first failure short-circuits to the
//! category's fallback command, so [`Extractor::extract`] is total.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::command::{
    AlarmCommand, CalendarCommand, CallCommand, ContactCallCommand, ModelCommand,
    OpenAppCommand, UNTITLED_EVENT,
};
use crate::error::ExtractError;
use crate::intent::IntentCategory;
use crate::normalize::{
    fold_name, normalize_name, normalize_phone, parse_date, parse_time, weekday_index,
    weekday_of, DEFAULT_TIME,
};

/// Country code prepended to bare 10-digit numbers unless configured.
pub const DEFAULT_COUNTRY_CODE: &str = "+91";

static JSON_OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*?\}").expect("valid regex"));

static MARKUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?s>|<\|[^|>]*\|>").expect("valid regex"));

static TRAILING_COMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("valid regex"));

/// Outcome of [`Extractor::extract`]: always a command, plus the reason when
/// that command is a fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub command: ModelCommand,
    pub failure: Option<ExtractError>,
}

impl Extraction {
    pub fn is_fallback(&self) -> bool {
        self.failure.is_some()
    }

    fn parsed(command: ModelCommand) -> Self {
        Self {
            command,
            failure: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Extractor {
    country_code: String,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTRY_CODE)
    }
}

impl Extractor {
    pub fn new(country_code: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
        }
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Parse, repair, validate and normalize `raw` for `category`.
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use errand::{Extractor, IntentCategory, ModelCommand};
    /// let now = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap().and_hms_opt(8, 0, 0).unwrap();
    /// let out = Extractor::default().extract(IntentCategory::Call, r#"{"Number":"9876543210"}"#, now);
    /// match out.command {
    ///     ModelCommand::Call(call) => assert_eq!(call.number, "+919876543210"),
    ///     other => panic!("unexpected {other:?}"),
    /// }
    /// ```
    pub fn extract(&self, category: IntentCategory, raw: &str, now: NaiveDateTime) -> Extraction {
        if category == IntentCategory::QA {
            return answer(raw);
        }
        match self.parse(category, raw, now) {
            Ok(command) => {
                debug!(%category, ?command, "extracted command");
                Extraction::parsed(command)
            }
            Err(err) => {
                warn!(%category, %err, "extraction failed, using fallback");
                Extraction {
                    command: fallback(category, now),
                    failure: Some(err),
                }
            }
        }
    }

    fn parse(
        &self,
        category: IntentCategory,
        raw: &str,
        now: NaiveDateTime,
    ) -> Result<ModelCommand, ExtractError> {
        let object = find_json_object(raw).ok_or(ExtractError::NoJsonFound)?;
        let repaired = repair_json(object);
        trace!(%repaired, "repaired JSON");
        let fields = Fields::parse(&repaired)?;
        let today = now.date();

        let command = match category {
            IntentCategory::Alarm => {
                let day = fields.required("Day")?;
                let time = fields.required("Time")?;
                ModelCommand::Alarm(AlarmCommand::new(
                    weekday_index(&day, today),
                    time_or_default(&time),
                ))
            }
            IntentCategory::Calendar => {
                let date = fields
                    .get("Date")
                    .map(|d| date_or_today(&d, today))
                    .unwrap_or(today);
                let time = fields
                    .get("Time")
                    .map(|t| time_or_default(&t))
                    .unwrap_or_else(default_time);
                let title = fields
                    .get("Event")
                    .or_else(|| fields.get("Title"))
                    .map(|t| normalize_name(&t))
                    .unwrap_or_else(|| UNTITLED_EVENT.to_string());
                let mut event = CalendarCommand::new(date, time, title);
                event.location = fields.get("Location");
                event.notes = fields.get("Notes");
                ModelCommand::Calendar(event)
            }
            IntentCategory::Call => {
                let number = normalize_phone(&fields.required("Number")?, &self.country_code);
                if !number.chars().any(|c| c.is_ascii_digit()) {
                    return Err(ExtractError::MissingRequiredField("Number"));
                }
                ModelCommand::Call(CallCommand { number })
            }
            IntentCategory::ContactCall => ModelCommand::ContactCall(ContactCallCommand {
                name: normalize_name(&fields.required("Name")?),
            }),
            IntentCategory::OpenApp => ModelCommand::OpenApp(OpenAppCommand {
                label: fold_name(&fields.required("App")?),
            }),
            IntentCategory::QA => ModelCommand::Answer(raw.trim().to_string()),
        };
        Ok(command)
    }
}

/// The first `{...}` span, closing at the first `}` after the first `{`.
pub fn find_json_object(raw: &str) -> Option<&str> {
    JSON_OBJECT_RE.find(raw).map(|m| m.as_str())
}

/// Remove the corruption small models commonly add to JSON.
///
/// ```
/// use errand::extract::repair_json;
/// assert_eq!(repair_json("{\"a\":\u{00A0}\"b\",}</s>"), r#"{"a": "b"}"#);
/// ```
pub fn repair_json(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}'))
        .map(|c| match c {
            '\u{00A0}' => ' ',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect();
    let cleaned = MARKUP_RE.replace_all(&cleaned, "");
    TRAILING_COMMA_RE
        .replace_all(&cleaned, "$1")
        .trim()
        .to_string()
}

/// Top-level keys of a parsed object, looked up case-insensitively.
struct Fields(Map<String, Value>);

impl Fields {
    fn parse(text: &str) -> Result<Self, ExtractError> {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(ExtractError::MalformedJson(format!(
                "expected an object, got {other}"
            ))),
            Err(e) => Err(ExtractError::MalformedJson(e.to_string())),
        }
    }

    /// Non-blank string or number value for `key`.
    fn get(&self, key: &str) -> Option<String> {
        let value = self
            .0
            .iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
            .map(|(_, v)| v)?;
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    fn required(&self, key: &'static str) -> Result<String, ExtractError> {
        self.get(key).ok_or(ExtractError::MissingRequiredField(key))
    }
}

fn default_time() -> NaiveTime {
    parse_time(DEFAULT_TIME).unwrap_or(NaiveTime::MIN)
}

fn time_or_default(raw: &str) -> NaiveTime {
    parse_time(raw).unwrap_or_else(|err| {
        debug!(%err, "using default time");
        default_time()
    })
}

fn date_or_today(raw: &str, today: NaiveDate) -> NaiveDate {
    parse_date(raw, today).unwrap_or_else(|err| {
        debug!(%err, "using today's date");
        today
    })
}

fn current_minute(now: NaiveDateTime) -> NaiveTime {
    NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or(NaiveTime::MIN)
}

/// Alarm for the current minute on today's weekday.
pub fn fallback_alarm(now: NaiveDateTime) -> AlarmCommand {
    AlarmCommand::new(weekday_of(now.date()), current_minute(now))
}

/// Untitled event starting at the current minute today.
pub fn fallback_event(now: NaiveDateTime) -> CalendarCommand {
    CalendarCommand::new(now.date(), current_minute(now), UNTITLED_EVENT.to_string())
}

/// Deterministic command used when extraction fails.
pub fn fallback(category: IntentCategory, now: NaiveDateTime) -> ModelCommand {
    match category {
        IntentCategory::Alarm => ModelCommand::Alarm(fallback_alarm(now)),
        IntentCategory::Calendar => ModelCommand::Calendar(fallback_event(now)),
        other => ModelCommand::Unresolved(other),
    }
}

fn answer(raw: &str) -> Extraction {
    let text = raw.trim();
    if text.is_empty() {
        return Extraction {
            command: ModelCommand::Unresolved(IntentCategory::QA),
            failure: Some(ExtractError::EmptyResponse),
        };
    }
    Extraction::parsed(ModelCommand::Answer(text.to_string()))
}
