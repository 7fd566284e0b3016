//! Salary extraction from free text.
//!
//! An ordered pattern list with first-match-wins semantics. Range detection
//! must run before single-value detection, otherwise "80-100k" would be
//! mis-read as its lower bound alone.

use regex::Regex;
use std::sync::LazyLock;

// "80-100k", "80 - 100k", "80k - 100k".
static RANGE_K: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{2,3})\s*k?\s*-\s*(\d{2,3})\s*k\b").unwrap());

// "60k", "60 k".
static SINGLE_K: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{2,3})\s*k\b").unwrap());

// "€45000", "$ 52000".
static CURRENCY_PREFIXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[€$£]\s*(\d{4,6})\b").unwrap());

// "45000€", "52000 $".
static CURRENCY_SUFFIXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4,6})\s*[€$£]").unwrap());

// A thousands separator between digits: "45,000", "45 000".
static THOUSANDS_SEP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)[,\s\u{202f}](\d{3})\b").unwrap());

fn strip_thousands_separators(text: &str) -> String {
    let mut s = text.to_string();
    // Replacements don't overlap within a pass; iterate until stable for
    // multi-group numbers like "1 234 567".
    loop {
        let next = THOUSANDS_SEP.replace_all(&s, "${1}${2}").into_owned();
        if next == s {
            return s;
        }
        s = next;
    }
}

/// First matching pattern wins; no match means the salary is absent
/// (callers substitute "Not specified" at the presentation boundary).
pub fn extract_salary(text: &str) -> Option<String> {
    let t = strip_thousands_separators(&text.to_lowercase());

    if let Some(c) = RANGE_K.captures(&t) {
        return Some(format!("{}k - {}k", &c[1], &c[2]));
    }
    if let Some(c) = SINGLE_K.captures(&t) {
        return Some(format!("{}k", &c[1]));
    }
    if let Some(c) = CURRENCY_PREFIXED.captures(&t) {
        let v: u64 = c[1].parse().ok()?;
        return Some(format!("{}k", v / 1000));
    }
    if let Some(c) = CURRENCY_SUFFIXED.captures(&t) {
        let v: u64 = c[1].parse().ok()?;
        return Some(format!("{}k", v / 1000));
    }
    None
}
