//! Resource locators and A1 column references.
//!
//! A resource's `path` is a URL such as
//! `https://docs.google.com/spreadsheets/d/<id>/edit#gid=0`; the store id is the
//! path segment following `d`. Column letters follow spreadsheet convention:
//! index 0 is `A`, 25 is `Z`, 26 is `AA`.

use url::Url;

use crate::error::{MigrateError, Result};

/// Extract the store id from a resource URL.
pub fn parse_store_id(locator: &str) -> Result<String> {
    let url = Url::parse(locator.trim())
        .map_err(|err| MigrateError::schema(format!("invalid URL '{locator}': {err}")))?;
    let mut segments = url.path_segments().into_iter().flatten();
    segments
        .by_ref()
        .find(|segment| *segment == "d")
        .and_then(|_| segments.next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| MigrateError::schema(format!("store id not found in URL '{locator}'")))
}

/// Convert a 0-based column index to its letter reference.
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = index + 1;
    while remaining > 0 {
        let rem = (remaining - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Convert a letter reference back to a 0-based index. Lowercase is accepted.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut value = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        value = value.checked_mul(26)?.checked_add(digit)?;
    }
    Some(value - 1)
}
