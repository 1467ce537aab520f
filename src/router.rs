//! Keyword routing from utterance to handler.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::capability::Capabilities;
use crate::clock::Clock;
use crate::extract::Extractor;
use crate::handlers::{self, AppCatalog, TaskHandler};
use crate::intent::{IntentCategory, Utterance};
use crate::session::ModelSession;
use crate::task_log::TaskLog;

/// Reply to an empty utterance. Nothing is routed or logged.
pub const EMPTY_INPUT: &str = "Please say or type something.";

/// Reply when a handler errors or panics.
pub const HANDLER_FAILED: &str = "⚠️ Something went wrong while handling that request. Please try again.";

/// Predicate over an utterance's lower-cased text.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// Contains any of the substrings.
    AnyKeyword(&'static [&'static str]),
    /// Starts with the prefix, ignoring leading whitespace.
    Prefix(&'static str),
    /// Contains a run of at least this many digits.
    DigitRun(usize),
    All(&'static [Matcher]),
    Any(&'static [Matcher]),
    Always,
}

impl Matcher {
    pub fn matches(&self, utterance: &Utterance) -> bool {
        let lowered = utterance.lowered();
        match self {
            Matcher::AnyKeyword(words) => words.iter().any(|w| lowered.contains(w)),
            Matcher::Prefix(prefix) => lowered.trim_start().starts_with(prefix),
            Matcher::DigitRun(min) => utterance.digit_run(*min).is_some(),
            Matcher::All(all) => all.iter().all(|m| m.matches(utterance)),
            Matcher::Any(any) => any.iter().any(|m| m.matches(utterance)),
            Matcher::Always => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub category: IntentCategory,
    pub matcher: Matcher,
}

const ALARM_KEYWORDS: &[&str] = &[
    "alarm",
    "set alarm",
    "add alarm",
    "alarm at",
    "wake up",
    "wake me",
    "add an alarm",
    "add a alarm",
];

const CALENDAR_KEYWORDS: &[&str] = &[
    "event",
    "set appointment",
    "appointment date",
    "calendar entry",
    "add to calendar",
    "create event",
    "reminder for",
    "book meeting",
    "schedule",
    "add reminder",
    "meeting at",
    "schedule for",
    "today",
    "tomorrow",
];

/// Digits needed before a "call" request is treated as a number.
pub const DIAL_DIGITS: usize = 10;

/// Precedence order, highest first. QA always matches.
pub const DEFAULT_RULES: &[Rule] = &[
    Rule {
        category: IntentCategory::Alarm,
        matcher: Matcher::AnyKeyword(ALARM_KEYWORDS),
    },
    Rule {
        category: IntentCategory::Calendar,
        matcher: Matcher::AnyKeyword(CALENDAR_KEYWORDS),
    },
    Rule {
        category: IntentCategory::Call,
        matcher: Matcher::All(&[Matcher::AnyKeyword(&["call"]), Matcher::DigitRun(DIAL_DIGITS)]),
    },
    Rule {
        category: IntentCategory::ContactCall,
        matcher: Matcher::AnyKeyword(&["call"]),
    },
    Rule {
        category: IntentCategory::OpenApp,
        matcher: Matcher::Any(&[Matcher::Prefix("open "), Matcher::AnyKeyword(&["open app"])]),
    },
    Rule {
        category: IntentCategory::QA,
        matcher: Matcher::Always,
    },
];

/// Ordered rules; the first match wins.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Category of the first matching rule, or QA when none match.
    ///
    /// ```
    /// use errand::{IntentCategory, Utterance};
    /// use errand::router::RuleTable;
    /// let rules = RuleTable::default();
    /// let category = rules.classify(&Utterance::new("Set an alarm for tomorrow"));
    /// assert_eq!(category, IntentCategory::Alarm);
    /// ```
    pub fn classify(&self, utterance: &Utterance) -> IntentCategory {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(utterance))
            .map(|rule| rule.category)
            .unwrap_or(IntentCategory::QA)
    }
}

/// Classifies each utterance, logs it, and hands it to one handler.
pub struct Router {
    rules: RuleTable,
    handlers: Vec<Arc<dyn TaskHandler>>,
}

impl Router {
    pub fn new(rules: RuleTable, handlers: Vec<Arc<dyn TaskHandler>>) -> Self {
        Self { rules, handlers }
    }

    /// Default rules wired to the six standard handlers.
    pub fn standard(
        caps: &Capabilities,
        extractor: Extractor,
        apps: AppCatalog,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(
            RuleTable::default(),
            handlers::standard(caps, extractor, apps, clock),
        )
    }

    pub fn classify(&self, text: &str) -> IntentCategory {
        self.rules.classify(&Utterance::new(text))
    }

    fn handler(&self, category: IntentCategory) -> Option<&Arc<dyn TaskHandler>> {
        self.handlers.iter().find(|h| h.category() == category)
    }

    /// Route one utterance. Always returns a status string.
    pub async fn route(&self, text: &str, session: &ModelSession, history: Option<&TaskLog>) -> String {
        let utterance = Utterance::new(text);
        if utterance.is_blank() {
            debug!("ignoring blank input");
            return EMPTY_INPUT.to_string();
        }

        let category = self.rules.classify(&utterance);
        info!(%category, input = %utterance.text(), "routing");

        if let Some(log) = history {
            if let Err(e) = log.record(&utterance, category).await {
                warn!(error = %e, "failed to record task");
            }
        }

        let Some(handler) = self.handler(category) else {
            error!(%category, "no handler registered");
            return HANDLER_FAILED.to_string();
        };

        match AssertUnwindSafe(handler.handle(&utterance, session))
            .catch_unwind()
            .await
        {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                error!(%category, error = ?e, "handler failed");
                HANDLER_FAILED.to_string()
            }
            Err(_) => {
                error!(%category, "handler panicked");
                HANDLER_FAILED.to_string()
            }
        }
    }
}
