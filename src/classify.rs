//! Column type classification.
//!
//! Two entry points feed the inspector:
//!
//! - [`classify_samples`] looks at raw cell values below the header row.
//! - [`classify_format_pattern`] maps a store number-format pattern to a type and
//!   returns `None` for anything it does not recognize.
//!
//! Sample classification is deliberately conservative: a single value that is
//! neither boolean, datetime, nor numeric turns the whole column into `string`.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;

use crate::schema::FieldType;

const INTEGER_PATTERNS: &[&str] = &["0", "#,##0", "#,###", "0.#####", "#.#####"];
const DECIMAL_PATTERNS: &[&str] = &["0.00", "#,##0.00", "0.0", "#,##0.0"];
const TEXT_PATTERN: &str = "@";
const DATE_TOKENS: &[&str] = &["yyyy", "yy", "mm", "dd"];
const TIME_TOKENS: &[&str] = &["hh", "ss"];
const CURRENCY_SYMBOLS: &[char] = &['$', '¥', '€', '£'];

fn datetime_recognizers() -> &'static [Regex] {
    static RECOGNIZERS: OnceLock<Vec<Regex>> = OnceLock::new();
    RECOGNIZERS.get_or_init(|| {
        [
            // 2024-01-15T10:30:00, also the prefix of RFC3339 values
            r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}",
            r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}",
            r"^\d{4}-\d{2}-\d{2}$",
            r"^\d{1,2}/\d{1,2}/\d{4}",
            r"^\d{1,2}-\d{1,2}-\d{4}",
            r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?[+-]\d{2}:\d{2}$",
            r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?Z$",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("valid datetime recognizer"))
        .collect()
    })
}

pub fn is_datetime(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    if datetime_recognizers().iter().any(|re| re.is_match(value)) {
        return true;
    }
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDate::parse_from_str(value, "%Y/%m/%d").is_ok()
}

/// Optional leading sign, digits, at most one decimal point. Thousands separators are ignored.
pub fn is_numeric(value: &str) -> bool {
    let stripped = value.replace(',', "");
    let body = stripped
        .strip_prefix(|c: char| c == '+' || c == '-')
        .unwrap_or(stripped.as_str());
    let mut digits = 0usize;
    let mut dots = 0usize;
    for ch in body.chars() {
        match ch {
            '0'..='9' => digits += 1,
            '.' => {
                dots += 1;
                if dots > 1 {
                    return false;
                }
            }
            _ => return false,
        }
    }
    digits > 0
}

#[derive(Debug, Clone)]
struct SampleProfile {
    boolean_possible: bool,
    datetime_possible: bool,
    all_datetime: bool,
    numeric_possible: bool,
    string_possible: bool,
    has_decimal_point: bool,
}

impl SampleProfile {
    fn new() -> Self {
        Self {
            boolean_possible: false,
            datetime_possible: false,
            all_datetime: true,
            numeric_possible: false,
            string_possible: false,
            has_decimal_point: false,
        }
    }

    fn update(&mut self, raw: &str) {
        if raw.contains('.') {
            self.has_decimal_point = true;
        }
        let value = raw.trim();

        if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
            self.boolean_possible = true;
            self.all_datetime = false;
            return;
        }

        let datetime = is_datetime(value);
        if datetime {
            self.datetime_possible = true;
        } else {
            self.all_datetime = false;
        }

        if is_numeric(value) {
            self.numeric_possible = true;
        } else if !value.is_empty() && !datetime {
            self.string_possible = true;
        }
    }

    fn decide(&self) -> FieldType {
        if self.datetime_possible && self.all_datetime {
            FieldType::DateTime
        } else if self.string_possible {
            FieldType::String
        } else if self.numeric_possible {
            if self.has_decimal_point {
                FieldType::Number
            } else {
                FieldType::Integer
            }
        } else if self.boolean_possible {
            FieldType::Boolean
        } else {
            FieldType::String
        }
    }
}

/// Infer a column type from its sample values. `None` entries are blank cells and are ignored.
pub fn classify_samples<S: AsRef<str>>(values: &[Option<S>]) -> FieldType {
    let mut profile = SampleProfile::new();
    for value in values.iter().flatten() {
        profile.update(value.as_ref());
    }
    profile.decide()
}

/// Map a number-format pattern to a type. Unknown patterns yield `None`, never a guess.
pub fn classify_format_pattern(pattern: &str) -> Option<FieldType> {
    if pattern.is_empty() {
        return None;
    }
    if INTEGER_PATTERNS.contains(&pattern) {
        return Some(FieldType::Integer);
    }
    if DECIMAL_PATTERNS.contains(&pattern) {
        return Some(FieldType::Number);
    }
    if pattern == TEXT_PATTERN {
        return Some(FieldType::String);
    }
    let lowered = pattern.to_lowercase();
    if contains_any(&lowered, DATE_TOKENS) || contains_any(&lowered, TIME_TOKENS) {
        return Some(FieldType::DateTime);
    }
    if pattern.contains('%') || pattern.contains(CURRENCY_SYMBOLS) {
        return Some(FieldType::Number);
    }
    None
}

/// Schema-level datetime format (`default`, `date`, `time`) implied by a format pattern.
pub fn datetime_format_for_pattern(pattern: &str) -> Option<&'static str> {
    let lowered = pattern.to_lowercase();
    let has_date = lowered.contains("yy") || lowered.contains("dd");
    let has_time = contains_any(&lowered, TIME_TOKENS);
    match (has_date, has_time) {
        (true, true) => Some("default"),
        (true, false) => Some("date"),
        (false, true) => Some("time"),
        // a bare `mm` is ambiguous between month and minute
        (false, false) if lowered.contains("mm") => Some("default"),
        (false, false) => None,
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
