//! Diff engine: classify a fetched batch against the store and notify on
//! notices that have never been seen.
//!
//! Identity gates notification. A known id whose fingerprint changed is
//! refreshed in the store but is not reported as new.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::{NoticeRecord, NoticeStore, Notifier};

/// Whether new notices in a batch trigger notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// First-ever run: record the baseline, notify nobody.
    Backfill,
    /// Steady state: notify once per id absent from the baseline.
    Incremental,
}

/// Result of applying one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOutcome {
    /// Records with a usable id that were upserted.
    pub processed: usize,
    /// Records classified as new (first occurrence of an unseen id).
    pub new_count: usize,
    /// New ids whose notification was delivered, in batch order.
    pub notified_ids: Vec<String>,
    /// New ids whose notification failed, in batch order.
    pub failed_ids: Vec<String>,
}

/// Apply `batch` to `store`, notifying through `notifier` in
/// [`Mode::Incremental`].
///
/// The set of seen ids is read once up front, so an id repeated within the
/// batch counts as new only on its first occurrence. Every record is upserted
/// regardless of classification, and before its notification is attempted. A
/// notification failure is logged and does not stop the batch; a storage failure
/// aborts it, leaving earlier upserts durable and the failed record unnotified.
pub async fn apply_batch<S, N>(
    store: &S,
    notifier: &N,
    batch: &[NoticeRecord],
    mode: Mode,
) -> Result<DiffOutcome, S::Error>
where
    S: NoticeStore + ?Sized,
    N: Notifier + Sync + ?Sized,
{
    let seen = store.seen_ids()?;
    let mut fresh: HashSet<&str> = HashSet::new();
    let mut outcome = DiffOutcome::default();

    for record in batch {
        let id = record.id.trim();
        if id.is_empty() {
            continue;
        }
        let fingerprint = record.fingerprint();
        let is_new = !seen.contains_key(id) && fresh.insert(id);
        if !is_new && seen.get(id).is_some_and(|stored| *stored != fingerprint) {
            debug!(id, "content changed under a known id");
        }

        // Record before notifying: a notice is never emailed unless it is durable.
        store.upsert(id, &fingerprint, record)?;
        outcome.processed += 1;

        if !is_new {
            continue;
        }
        outcome.new_count += 1;
        match mode {
            Mode::Backfill => {
                debug!(id, "recorded notice without notification");
            }
            Mode::Incremental => {
                info!(id, company = %record.company, "new notice detected");
                match notifier.notify(record).await {
                    Ok(()) => outcome.notified_ids.push(id.to_string()),
                    Err(e) => {
                        warn!(id, error = %e, "notification failed");
                        outcome.failed_ids.push(id.to_string());
                    }
                }
            }
        }
    }

    Ok(outcome)
}
