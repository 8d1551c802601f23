//! Re-seed the store from the current notice board without notifying.
//!
//! Repairs a store that missed notices (for example after running against
//! an expired session) by inserting every currently listed id that is not
//! already tracked. Existing rows are left exactly as they are.

use anyhow::Context;
use noticewatch_core::{Fetcher, NoticeStore, normalize, numeric_id_range};
use noticewatch_store::DuckStore;

pub struct ReseedStats {
    pub before: usize,
    pub fetched: usize,
    pub processed: usize,
    pub inserted: usize,
    pub after: usize,
    pub id_range: Option<(u64, u64)>,
}

/// Fetch once and insert every missing notice.
pub async fn run_reseed<F>(store: &DuckStore, fetcher: &F) -> anyhow::Result<ReseedStats>
where
    F: Fetcher + Sync,
{
    store.initialize().context("initialising notice store")?;
    let before = store.count()?;

    let rows = fetcher.fetch().await.context("fetching current notices")?;
    let fetched = rows.len();
    let notices = normalize(rows);

    let mut inserted = 0usize;
    for notice in &notices {
        if store.insert_missing(&notice.id, &notice.fingerprint(), notice)? {
            inserted += 1;
        }
    }

    Ok(ReseedStats {
        before,
        fetched,
        processed: notices.len(),
        inserted,
        after: store.count()?,
        id_range: numeric_id_range(notices.iter().map(|n| n.id.as_str())),
    })
}
