//! DuckDB storage for the `seen_notices` table.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use duckdb::{Connection, Row, params};
use noticewatch_core::{NoticeRecord, NoticeStore, SeenEntry, StoreConfig, truncate_title};
use tracing::{debug, info};

use crate::StoreError;

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS seen_notices (
        notice_id   TEXT PRIMARY KEY,
        notice_hash TEXT,
        title       TEXT,
        category    TEXT,
        priority    TEXT,
        company     TEXT,
        first_seen  TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        last_seen   TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )";

const SELECT_ENTRY: &str = "
    SELECT notice_id,
           coalesce(notice_hash, ''),
           coalesce(title, ''),
           coalesce(category, ''),
           coalesce(priority, ''),
           coalesce(company, ''),
           epoch_us(first_seen),
           epoch_us(last_seen)
    FROM seen_notices";

/// DuckDB store of every notice id ever observed.
///
/// Each write is a single autocommitted statement, so a crash mid-batch
/// leaves every earlier upsert durable and nothing half-written.
///
/// Use [`open`](Self::open) for an ephemeral in-memory database and
/// [`open_persistent`](Self::open_persistent) for a file that survives restarts.
pub struct DuckStore {
    conn: Connection,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened notice store");
        Ok(Self { conn })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::open_persistent(&config.path)
    }

    // ── Writes ──

    /// Upsert with an explicit timestamp.
    ///
    /// New ids get `first_seen = last_seen = at`. Known ids only have their
    /// fingerprint replaced and `last_seen` set to `at`.
    pub fn upsert_at(
        &self,
        id: &str,
        fingerprint: &str,
        record: &NoticeRecord,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let micros = at.timestamp_micros();
        self.conn.execute(
            "INSERT INTO seen_notices
                 (notice_id, notice_hash, title, category, priority, company, first_seen, last_seen)
             VALUES (?, ?, ?, ?, ?, ?, make_timestamp(?::BIGINT), make_timestamp(?::BIGINT))
             ON CONFLICT (notice_id) DO UPDATE
                 SET notice_hash = excluded.notice_hash,
                     last_seen = excluded.last_seen",
            params![
                id,
                fingerprint,
                truncate_title(&record.title),
                record.category,
                record.priority,
                record.company,
                micros,
                micros,
            ],
        )?;
        debug!(id, "upserted notice");
        Ok(())
    }

    /// Insert the id if it is absent; never touches an existing row.
    ///
    /// Returns whether a row was inserted.
    pub fn insert_missing(
        &self,
        id: &str,
        fingerprint: &str,
        record: &NoticeRecord,
    ) -> Result<bool, StoreError> {
        let micros = Utc::now().timestamp_micros();
        let changed = self.conn.execute(
            "INSERT INTO seen_notices
                 (notice_id, notice_hash, title, category, priority, company, first_seen, last_seen)
             VALUES (?, ?, ?, ?, ?, ?, make_timestamp(?::BIGINT), make_timestamp(?::BIGINT))
             ON CONFLICT (notice_id) DO NOTHING",
            params![
                id,
                fingerprint,
                truncate_title(&record.title),
                record.category,
                record.priority,
                record.company,
                micros,
                micros,
            ],
        )?;
        Ok(changed > 0)
    }

    // ── Reads ──

    /// Fetch one entry by id.
    pub fn get(&self, id: &str) -> Result<Option<SeenEntry>, StoreError> {
        let sql = format!("{SELECT_ENTRY} WHERE notice_id = ?");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map([id], read_raw)?;
        rows.next().transpose()?.map(into_entry).transpose()
    }

    /// The `limit` most recently first-seen entries, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<SeenEntry>, StoreError> {
        let sql = format!("{SELECT_ENTRY} ORDER BY first_seen DESC, notice_id LIMIT {limit}");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], read_raw)?;
        rows.map(|row| into_entry(row?)).collect()
    }

    /// Access the underlying DuckDB connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl NoticeStore for DuckStore {
    type Error = StoreError;

    fn initialize(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(CREATE_TABLE)?;
        Ok(())
    }

    fn seen_ids(&self) -> Result<HashMap<String, String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT notice_id, coalesce(notice_hash, '') FROM seen_notices")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut seen = HashMap::new();
        for row in rows {
            let (id, hash) = row?;
            seen.insert(id.trim().to_string(), hash);
        }
        Ok(seen)
    }

    fn upsert(
        &self,
        id: &str,
        fingerprint: &str,
        record: &NoticeRecord,
    ) -> Result<(), StoreError> {
        self.upsert_at(id, fingerprint, record, Utc::now())
    }

    fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT count(*) FROM seen_notices", [], |row| row.get(0))?;
        usize::try_from(n).map_err(|_| StoreError::Other(format!("negative count {n}")))
    }
}

type RawEntry = (String, String, String, String, String, String, i64, i64);

fn read_raw(row: &Row<'_>) -> duckdb::Result<RawEntry> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn into_entry(raw: RawEntry) -> Result<SeenEntry, StoreError> {
    let (id, fingerprint, title, category, priority, company, first, last) = raw;
    Ok(SeenEntry {
        id,
        fingerprint,
        title,
        category,
        priority,
        company,
        first_seen: from_micros(first)?,
        last_seen: from_micros(last)?,
    })
}

fn from_micros(micros: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_micros(micros).ok_or(StoreError::Timestamp(micros))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn store() -> DuckStore {
        let store = DuckStore::open().unwrap();
        store.initialize().unwrap();
        store
    }

    fn notice(id: &str, title: &str) -> NoticeRecord {
        NoticeRecord::new(id)
            .unwrap()
            .with_title(title)
            .with_category("Internship")
            .with_priority("HIGH")
            .with_company("Acme")
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn initialize_is_idempotent() {
        let store = store();
        store.initialize().unwrap();
        store.initialize().unwrap();
        assert!(store.is_empty().unwrap());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn upsert_inserts_with_equal_timestamps() {
        let store = store();
        let n = notice("101", "Campus drive");
        store.upsert_at("101", &n.fingerprint(), &n, t(0)).unwrap();

        let entry = store.get("101").unwrap().unwrap();
        assert_eq!(entry.fingerprint, n.fingerprint());
        assert_eq!(entry.title, "Campus drive");
        assert_eq!(entry.category, "Internship");
        assert_eq!(entry.priority, "HIGH");
        assert_eq!(entry.company, "Acme");
        assert_eq!(entry.first_seen, t(0));
        assert_eq!(entry.last_seen, t(0));
        assert!(!store.is_empty().unwrap());
    }

    #[test]
    fn upsert_is_idempotent() {
        let store = store();
        let n = notice("7", "Test");
        store.upsert_at("7", &n.fingerprint(), &n, t(0)).unwrap();
        store.upsert_at("7", &n.fingerprint(), &n, t(5)).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let entry = store.get("7").unwrap().unwrap();
        assert_eq!(entry.first_seen, t(0));
        assert_eq!(entry.last_seen, t(5));
    }

    #[test]
    fn upsert_of_known_id_only_touches_hash_and_last_seen() {
        let store = store();
        let original = notice("X", "Old title");
        store.upsert_at("X", &original.fingerprint(), &original, t(0)).unwrap();

        let changed = notice("X", "New title").with_company("Other Co");
        store.upsert_at("X", &changed.fingerprint(), &changed, t(60)).unwrap();

        let entry = store.get("X").unwrap().unwrap();
        assert_eq!(entry.fingerprint, changed.fingerprint());
        assert_eq!(entry.title, "Old title");
        assert_eq!(entry.company, "Acme");
        assert_eq!(entry.first_seen, t(0));
        assert_eq!(entry.last_seen, t(60));
    }

    #[test]
    fn long_titles_are_truncated_on_write() {
        let store = store();
        let n = notice("9", &"a".repeat(450));
        store.upsert("9", &n.fingerprint(), &n).unwrap();
        let entry = store.get("9").unwrap().unwrap();
        assert_eq!(entry.title.chars().count(), 200);
    }

    #[test]
    fn seen_ids_maps_id_to_fingerprint() {
        let store = store();
        for id in ["1", "2", "30"] {
            let n = notice(id, "t");
            store.upsert(id, &n.fingerprint(), &n).unwrap();
        }
        let seen = store.seen_ids().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen["30"], notice("30", "t").fingerprint());
        assert!(!seen.contains_key("3"));
    }

    #[test]
    fn seen_ids_trims_legacy_padded_ids() {
        let store = store();
        store
            .connection()
            .execute_batch(
                "INSERT INTO seen_notices (notice_id, notice_hash) VALUES (' 55 ', NULL)",
            )
            .unwrap();
        let seen = store.seen_ids().unwrap();
        assert_eq!(seen.get("55").map(String::as_str), Some(""));
    }

    #[test]
    fn insert_missing_never_overwrites() {
        let store = store();
        let first = notice("4", "first");
        assert!(store.insert_missing("4", &first.fingerprint(), &first).unwrap());

        let second = notice("4", "second");
        assert!(!store.insert_missing("4", &second.fingerprint(), &second).unwrap());

        let entry = store.get("4").unwrap().unwrap();
        assert_eq!(entry.fingerprint, first.fingerprint());
        assert_eq!(entry.title, "first");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn recent_orders_newest_first() {
        let store = store();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let n = notice(id, "t");
            store.upsert_at(id, &n.fingerprint(), &n, t(i as i64)).unwrap();
        }
        let ids: Vec<String> = store.recent(2).unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, ["c", "b"]);
    }

    #[test]
    fn get_unknown_id_is_none() {
        assert!(store().get("missing").unwrap().is_none());
    }

    // ── Persistent storage tests ──

    #[test]
    fn open_persistent_creates_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("notices.duckdb");
        assert!(!db_path.exists());

        let store = DuckStore::open_persistent(&db_path).unwrap();
        store.initialize().unwrap();
        assert!(db_path.exists());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn entries_survive_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = StoreConfig {
            path: tmp.path().join("notices.duckdb"),
        };

        let store = DuckStore::from_config(&config).unwrap();
        store.initialize().unwrap();
        let n = notice("500", "Persisted");
        store.upsert_at("500", &n.fingerprint(), &n, t(0)).unwrap();
        drop(store);

        let store = DuckStore::from_config(&config).unwrap();
        store.initialize().unwrap();
        assert_eq!(store.count().unwrap(), 1);
        let entry = store.get("500").unwrap().unwrap();
        assert_eq!(entry.title, "Persisted");
        assert_eq!(entry.first_seen, t(0));
    }
}
