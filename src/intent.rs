use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of tasks an utterance can be dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentCategory {
    Alarm,
    Calendar,
    Call,
    ContactCall,
    OpenApp,
    QA,
}

impl IntentCategory {
    pub const ALL: [IntentCategory; 6] = [
        IntentCategory::Alarm,
        IntentCategory::Calendar,
        IntentCategory::Call,
        IntentCategory::ContactCall,
        IntentCategory::OpenApp,
        IntentCategory::QA,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentCategory::Alarm => "alarm",
            IntentCategory::Calendar => "calendar",
            IntentCategory::Call => "call",
            IntentCategory::ContactCall => "contact call",
            IntentCategory::OpenApp => "open app",
            IntentCategory::QA => "question",
        }
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One turn of user input.
///
/// The lower-cased form exists only for classification; handlers always see
/// the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    text: String,
    lowered: String,
}

impl Utterance {
    /// ```
    /// use errand::Utterance;
    /// let u = Utterance::new("Call John");
    /// assert_eq!(u.text(), "Call John");
    /// assert_eq!(u.lowered(), "call john");
    /// ```
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let lowered = text.to_lowercase();
        Self { text, lowered }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lowered(&self) -> &str {
        &self.lowered
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// First run of at least `min` consecutive ASCII digits.
    ///
    /// ```
    /// use errand::Utterance;
    /// let u = Utterance::new("call 98765 43210 or 9876543210");
    /// assert_eq!(u.digit_run(10), Some("9876543210"));
    /// assert_eq!(Utterance::new("call 12345").digit_run(10), None);
    /// ```
    pub fn digit_run(&self, min: usize) -> Option<&str> {
        let bytes = self.text.as_bytes();
        let mut start = None;
        for (i, b) in bytes.iter().enumerate() {
            match (b.is_ascii_digit(), start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s >= min {
                        return Some(&self.text[s..i]);
                    }
                    start = None;
                }
                _ => {}
            }
        }
        match start {
            Some(s) if bytes.len() - s >= min => Some(&self.text[s..]),
            _ => None,
        }
    }

    /// Digit run of at least `min` digits including a directly preceding `+`.
    pub fn dialable_number(&self, min: usize) -> Option<&str> {
        let run = self.digit_run(min)?;
        let offset = run.as_ptr() as usize - self.text.as_ptr() as usize;
        if offset > 0 && self.text.as_bytes()[offset - 1] == b'+' {
            Some(&self.text[offset - 1..offset + run.len()])
        } else {
            Some(run)
        }
    }
}

impl From<&str> for Utterance {
    fn from(text: &str) -> Self {
        Utterance::new(text)
    }
}
