//! Plain-text email for a newly detected notice.

use std::sync::LazyLock;

use chrono::{DateTime, TimeZone};
use regex::Regex;

use crate::NoticeRecord;

const DESCRIPTION_MAX_CHARS: usize = 500;
const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Subject and body of a notice email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeEmail {
    pub subject: String,
    pub body: String,
}

impl NoticeEmail {
    /// Compose the email for `record`, stamped with `detected_at`.
    ///
    /// `notice_page` is the link readers follow to see the full notice.
    pub fn compose<Tz>(record: &NoticeRecord, notice_page: &str, detected_at: DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let subject = format!(
            "[ERP Notice] {} - {}",
            or(&record.category, "NOTICE"),
            or(&record.company, "New Notice"),
        );

        let title = strip_markup(&record.title);
        let description = strip_markup(&record.description);
        let (description, cut) = clip(&description, DESCRIPTION_MAX_CHARS);
        let ellipsis = if cut { "..." } else { "" };

        let body = format!(
            "\nNew ERP Notice Detected!\n\n\
             {RULE}\n\
             Notice ID: {id}\n\
             Category: {category}\n\
             Priority: {priority}\n\
             Company: {company}\n\
             {RULE}\n\n\
             Title: {title}\n\n\
             Description:\n\
             {description}{ellipsis}\n\n\
             {RULE}\n\
             View full notice: {notice_page}\n\
             Detected at: {detected}\n\
             {RULE}\n",
            id = record.id,
            category = or(&record.category, "N/A"),
            priority = or(&record.priority, "N/A"),
            company = or(&record.company, "N/A"),
            title = or(&title, "No Title"),
            detected = detected_at.format("%Y-%m-%d %H:%M:%S"),
        );

        Self { subject, body }
    }
}

/// Remove HTML tags and non-breaking-space entities, then trim.
pub fn strip_markup(text: &str) -> String {
    TAG.replace_all(text, "")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

fn or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

fn clip(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}
