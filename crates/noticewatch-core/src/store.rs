//! The Notice Store contract and its persisted entry type.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::NoticeRecord;

/// Stored titles are capped at this many characters.
pub const TITLE_MAX_CHARS: usize = 200;

/// One row of `seen_notices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenEntry {
    pub id: String,
    pub fingerprint: String,
    pub title: String,
    pub category: String,
    pub priority: String,
    pub company: String,
    /// Set once, when the id is first upserted.
    pub first_seen: DateTime<Utc>,
    /// Refreshed on every upsert of the id.
    pub last_seen: DateTime<Utc>,
}

/// Durable record of every notice id ever observed.
///
/// Implementations persist each call immediately; there is no batching.
pub trait NoticeStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create the backing table if it does not exist. Idempotent.
    fn initialize(&self) -> Result<(), Self::Error>;

    /// True iff no entries exist.
    fn is_empty(&self) -> Result<bool, Self::Error> {
        Ok(self.count()? == 0)
    }

    /// Every known id (trimmed) with its stored fingerprint.
    fn seen_ids(&self) -> Result<HashMap<String, String>, Self::Error>;

    /// Insert the id with `first_seen = last_seen = now`, or, if present,
    /// replace its fingerprint and bump `last_seen`. Other columns of an
    /// existing entry are left untouched.
    fn upsert(
        &self,
        id: &str,
        fingerprint: &str,
        record: &NoticeRecord,
    ) -> Result<(), Self::Error>;

    /// Total number of entries.
    fn count(&self) -> Result<usize, Self::Error>;
}

/// Cap a title to [`TITLE_MAX_CHARS`] characters (not bytes).
pub fn truncate_title(title: &str) -> &str {
    match title.char_indices().nth(TITLE_MAX_CHARS) {
        Some((idx, _)) => &title[..idx],
        None => title,
    }
}
