//! Helpers for date normalization, body/summary formatting, and log output.
//!
//! - Date parsing accepts the handful of formats the listing and article
//!   pages have used, and renders them as ISO-8601 UTC
//! - Body formatting wraps paragraphs and appends the "visit source" block
//! - Summaries are the first words of the tag-stripped body

use crate::extract::ExtractError;
use crate::models::RESOURCE;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

/// Number of words kept in an article summary.
pub const SUMMARY_WORDS: usize = 25;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%b %d, %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%b %d, %Y",
    "%A, %B %d, %Y",
    "%a, %b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
];

/// Parse a displayed date string into a UTC instant.
///
/// Tries RFC 3339 and RFC 2822 first, then naive date-time and date-only
/// layouts. Naive values are taken to be UTC; date-only values are midnight.
pub fn parse_display_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.split_whitespace().join(" ");
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&s, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// Normalize a displayed date to an ISO-8601 UTC string (`2025-10-17T00:00:00.000Z`).
pub fn normalize_date(raw: &str) -> Result<String, ExtractError> {
    parse_display_date(raw)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| ExtractError::UnparsableDate(raw.to_string()))
}

/// Today's UTC date as `YYYY-MM-DD`; the stored date when the page's is unusable.
pub fn today_iso() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Wrap each paragraph text in `<p>` tags and concatenate.
pub fn paragraphs_to_html<S: AsRef<str>>(paragraphs: &[S]) -> String {
    paragraphs
        .iter()
        .map(|p| format!("<p>{}</p>", p.as_ref().trim()))
        .collect()
}

/// The trailing block appended to every stored body.
pub fn source_link_block(link: &str) -> String {
    format!("<br><br><ul><li><a href='{link}'>Visit {RESOURCE}</a></li></ul>")
}

/// Full stored body: paragraph HTML followed by the source link block.
pub fn build_body(paragraph_html: &str, link: &str) -> String {
    format!("{paragraph_html}{}", source_link_block(link))
}

/// Plain-text summary of a paragraph fragment: first [`SUMMARY_WORDS`] words plus `...`.
///
/// Returns an empty string when the fragment has no text.
pub fn summarize(paragraph_html: &str) -> String {
    let plain = TAG_RE.replace_all(paragraph_html, " ");
    let mut words = plain.split_whitespace().peekable();
    if words.peek().is_none() {
        return String::new();
    }
    format!("{}...", words.take(SUMMARY_WORDS).join(" "))
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with
/// `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}
