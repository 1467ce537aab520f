//! Pure conversions from loosely formatted model output to canonical values.
//!
//! The `parse_*` functions report a [`NormalizationFailure`]; the
//! `normalize_*` functions absorb it into the documented default and never
//! fail.

use chrono::{Datelike, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::NormalizationFailure;

/// Time used when a category treats time as optional and none was given.
pub const DEFAULT_TIME: &str = "09:00";

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,2})(?:[:.](\d{2}))?(?::\d{2})?\s*(?:([ap])\.?\s*m\.?)?$")
        .expect("valid regex")
});

static ORDINAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("valid regex"));

const FULL_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %B %Y",
    "%B %d %Y",
    "%B %d, %Y",
];

const MONTH_DAY_FORMATS: &[&str] = &["%B %d", "%d %B", "%m-%d"];

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Parse "H:MM", "HH:MM", "H AM/PM", "HH:MM AM/PM" (plus "noon"/"midnight").
///
/// ```
/// use chrono::NaiveTime;
/// use errand::normalize::parse_time;
/// assert_eq!(parse_time("7am").unwrap(), NaiveTime::from_hms_opt(7, 0, 0).unwrap());
/// assert_eq!(parse_time("3:15 PM").unwrap(), NaiveTime::from_hms_opt(15, 15, 0).unwrap());
/// assert!(parse_time("soon").is_err());
/// ```
pub fn parse_time(raw: &str) -> Result<NaiveTime, NormalizationFailure> {
    let fail = || NormalizationFailure::new("time", raw);
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "noon" => return NaiveTime::from_hms_opt(12, 0, 0).ok_or_else(fail),
        "midnight" => return NaiveTime::from_hms_opt(0, 0, 0).ok_or_else(fail),
        _ => {}
    }

    let caps = TIME_RE.captures(trimmed).ok_or_else(fail)?;
    let hour: u32 = caps[1].parse().map_err(|_| fail())?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().map_err(|_| fail())?,
        None => 0,
    };
    let meridiem = caps.get(3).map(|m| m.as_str().to_ascii_lowercase());
    if caps.get(2).is_none() && meridiem.is_none() {
        return Err(fail());
    }

    let hour = match meridiem.as_deref() {
        Some(m) => {
            if !(1..=12).contains(&hour) {
                return Err(fail());
            }
            if m == "p" { hour % 12 + 12 } else { hour % 12 }
        }
        None => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(fail)
}

/// Strict 24-hour "HH:MM".
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Canonical "HH:MM", or [`DEFAULT_TIME`] when `raw` cannot be read.
///
/// ```
/// use errand::normalize::normalize_time;
/// assert_eq!(normalize_time("7:05"), "07:05");
/// assert_eq!(normalize_time("12 am"), "00:00");
/// assert_eq!(normalize_time(""), "09:00");
/// ```
pub fn normalize_time(raw: &str) -> String {
    match parse_time(raw) {
        Ok(time) => format_time(time),
        Err(err) => {
            debug!(%err, "using default time");
            DEFAULT_TIME.to_string()
        }
    }
}

/// Parse relative ("today", "tomorrow"), month-day and full dates.
///
/// Month-day forms take the current year. Full dates earlier than the current
/// year or later than next year are moved into the current year.
pub fn parse_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, NormalizationFailure> {
    let fail = || NormalizationFailure::new("date", raw);
    let cleaned = ORDINAL_RE.replace_all(raw.trim(), "$1");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    match cleaned.to_lowercase().as_str() {
        "" => return Err(fail()),
        "today" | "tonight" => return Ok(today),
        "tomorrow" => return today.succ_opt().ok_or_else(fail),
        _ => {}
    }

    let year = today.year();
    for fmt in FULL_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            if date.year() < year || date.year() > year + 1 {
                return date.with_year(year).ok_or_else(fail);
            }
            return Ok(date);
        }
    }

    let with_year = format!("{cleaned} {year}");
    for fmt in MONTH_DAY_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&with_year, &format!("{fmt} %Y")) {
            return Ok(date);
        }
    }
    Err(fail())
}

/// Strict ISO "YYYY-MM-DD".
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Canonical ISO date, or `today` when `raw` cannot be read.
pub fn normalize_date(raw: &str, today: NaiveDate) -> String {
    format_date(parse_date(raw, today).unwrap_or_else(|err| {
        debug!(%err, "using today's date");
        today
    }))
}

/// Weekday index of `date`, 1 (Sunday) through 7 (Saturday).
pub fn weekday_of(date: NaiveDate) -> u8 {
    date.weekday().number_from_sunday() as u8
}

/// English name for a weekday index produced by [`weekday_of`].
pub fn weekday_name(index: u8) -> &'static str {
    let slot = usize::from(index.clamp(1, 7)) - 1;
    WEEKDAY_NAMES[slot]
}

/// Map a day name to its weekday index, tolerating a few known misspellings.
pub fn parse_weekday(raw: &str, today: NaiveDate) -> Result<u8, NormalizationFailure> {
    let index = match raw.trim().to_lowercase().as_str() {
        "sunday" | "sun" => 1,
        "monday" | "mon" => 2,
        "tuesday" | "tue" | "tues" => 3,
        "wednesday" | "wed" | "wensday" => 4,
        "thursday" | "thu" | "thur" | "thurs" | "thrusday" => 5,
        "friday" | "fri" => 6,
        "saturday" | "sat" | "satuday" | "satu" => 7,
        "today" => weekday_of(today),
        "tomorrow" => today.succ_opt().map(weekday_of).unwrap_or(weekday_of(today)),
        _ => return Err(NormalizationFailure::new("day", raw)),
    };
    Ok(index)
}

/// Weekday index for `raw`, falling back to today's weekday.
///
/// ```
/// use chrono::NaiveDate;
/// use errand::normalize::weekday_index;
/// let wed = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
/// assert_eq!(weekday_index("Monday", wed), 2);
/// assert_eq!(weekday_index("SATUDAY", wed), 7);
/// assert_eq!(weekday_index("someday", wed), 4);
/// ```
pub fn weekday_index(raw: &str, today: NaiveDate) -> u8 {
    parse_weekday(raw, today).unwrap_or_else(|err| {
        debug!(%err, "using today's weekday");
        weekday_of(today)
    })
}

/// Keep the digits of `raw`; a bare 10-digit number gets `country_code`.
///
/// Numbers that already carry a leading `+` are left as they are.
///
/// ```
/// use errand::normalize::normalize_phone;
/// assert_eq!(normalize_phone("98765 43210", "+91"), "+919876543210");
/// assert_eq!(normalize_phone("+919876543210", "+91"), "+919876543210");
/// assert_eq!(normalize_phone("5550100", "+91"), "5550100");
/// ```
pub fn normalize_phone(raw: &str, country_code: &str) -> String {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if trimmed.starts_with('+') {
        return format!("+{digits}");
    }
    if digits.len() == 10 {
        let code = country_code.trim().trim_start_matches('+');
        if code.is_empty() {
            return digits;
        }
        return format!("+{code}{digits}");
    }
    digits
}

/// Trim and collapse internal whitespace.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-folded [`normalize_name`], the form used for comparisons.
pub fn fold_name(raw: &str) -> String {
    normalize_name(raw).to_lowercase()
}

/// Full-name equality after folding. Partial words never match.
///
/// ```
/// use errand::normalize::names_match;
/// assert!(names_match("  John   Smith", "john smith"));
/// assert!(!names_match("John Smith", "john"));
/// ```
pub fn names_match(a: &str, b: &str) -> bool {
    let a = fold_name(a);
    !a.is_empty() && a == fold_name(b)
}
