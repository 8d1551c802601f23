//! Notice records and normalisation of raw endpoint rows.
//!
//! The notice board answers with one of two row shapes: a pre-shaped
//! `{"notice": {...}}` object, or a jqGrid `{"cell": [...]}` list. Both are
//! turned into a single [`NoticeRecord`] here so nothing downstream branches
//! on payload shape.

use ring::digest;
use serde::Deserialize;
use serde_json::Value;

// Positional layout of a jqGrid cell list.
const CELL_ID: usize = 0;
const CELL_CATEGORY: usize = 1;
const CELL_PRIORITY: usize = 2;
const CELL_COMPANY: usize = 3;
const CELL_TITLE: usize = 4;

/// One observed notice, normalised from whatever shape the endpoint sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeRecord {
    /// Trimmed external identifier. Never empty.
    pub id: String,
    pub title: String,
    pub category: String,
    pub priority: String,
    pub company: String,
    pub description: String,
}

impl NoticeRecord {
    /// Build a record, trimming the id. Returns `None` when the id is blank.
    pub fn new(id: &str) -> Option<Self> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            title: String::new(),
            category: String::new(),
            priority: String::new(),
            company: String::new(),
            description: String::new(),
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = priority.into();
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Content fingerprint over `(id, title, company)`.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.id, &self.title, &self.company)
    }
}

/// Deterministic digest of the identity-relevant fields of a notice.
///
/// Lowercase hex SHA-256 of `"{id}_{title}_{company}"`.
pub fn fingerprint(id: &str, title: &str, company: &str) -> String {
    let key = format!("{id}_{title}_{company}");
    let hash = digest::digest(&digest::SHA256, key.as_bytes());
    hex::encode(hash.as_ref())
}

/// Pre-shaped notice object as sent inside `{"notice": {...}}` rows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNotice {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub category: Value,
    #[serde(default)]
    pub priority: Value,
    #[serde(default)]
    pub company: Value,
    #[serde(default)]
    pub description: Value,
}

/// A row exactly as delivered by the fetch collaborator.
///
/// Variant order matters for untagged deserialisation: a row carrying both a
/// `notice` object and a `cell` list is read as [`RawRow::Notice`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRow {
    Notice { notice: RawNotice },
    Cells { cell: Vec<Value> },
    Unrecognized(Value),
}

impl RawRow {
    /// Build a cell row from plain strings (used by the XML reader).
    pub fn from_cells<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RawRow::Cells {
            cell: cells.into_iter().map(|c| Value::String(c.into())).collect(),
        }
    }

    /// Normalise into a [`NoticeRecord`].
    ///
    /// Returns `None` for unrecognised shapes and for rows whose id is blank.
    pub fn into_record(self) -> Option<NoticeRecord> {
        match self {
            RawRow::Notice { notice } => {
                let record = NoticeRecord::new(&text(&notice.id))?;
                Some(
                    record
                        .with_title(text(&notice.title))
                        .with_category(text(&notice.category))
                        .with_priority(text(&notice.priority))
                        .with_company(text(&notice.company))
                        .with_description(text(&notice.description)),
                )
            }
            RawRow::Cells { cell } => {
                let at = |i: usize| cell.get(i).map(text).unwrap_or_default();
                let record = NoticeRecord::new(&at(CELL_ID))?;
                let title = at(CELL_TITLE);
                Some(
                    record
                        .with_category(at(CELL_CATEGORY))
                        .with_priority(at(CELL_PRIORITY))
                        .with_company(at(CELL_COMPANY))
                        // No separate description cell; the title doubles as one.
                        .with_description(title.clone())
                        .with_title(title),
                )
            }
            RawRow::Unrecognized(_) => None,
        }
    }
}

/// Normalise a batch of raw rows, keeping delivery order and dropping rows
/// that carry no usable id.
pub fn normalize(rows: Vec<RawRow>) -> Vec<NoticeRecord> {
    rows.into_iter().filter_map(RawRow::into_record).collect()
}

/// Canonical string form of a JSON scalar: strings verbatim, numbers and
/// booleans via `Display`, null and containers as empty.
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Range of the ids that are plain decimal numbers, if any.
pub fn numeric_id_range<'a, I>(ids: I) -> Option<(u64, u64)>
where
    I: IntoIterator<Item = &'a str>,
{
    ids.into_iter()
        .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|id| id.parse::<u64>().ok())
        .fold(None, |range, n| match range {
            None => Some((n, n)),
            Some((lo, hi)) => Some((lo.min(n), hi.max(n))),
        })
}
