//! Polling orchestrator: owns the collaborators and the process-wide mode.

use std::error::Error as StdError;

use thiserror::Error;
use tracing::{info, warn};

use crate::diff::{self, DiffOutcome, Mode};
use crate::notice::{normalize, numeric_id_range};
use crate::{Fetcher, NoticeStore, Notifier};

#[derive(Debug, Error)]
pub enum MonitorError<E>
where
    E: std::error::Error + 'static,
{
    #[error("storage error: {0}")]
    Storage(#[source] E),

    #[error("initial backfill could not fetch notices: {0}")]
    Backfill(#[source] Box<dyn StdError + Send + Sync>),
}

/// Summary of one fetch → diff cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// False when the fetch failed and the cycle did nothing.
    pub fetched: bool,
    /// Rows delivered by the fetcher, before normalisation.
    pub rows: usize,
    pub outcome: DiffOutcome,
}

/// Runs fetch → normalise → diff cycles against one store.
///
/// The mode is decided once in [`start`](Self::start): an empty store means
/// the first completed cycle is a backfill. Every later cycle is incremental.
pub struct Monitor<S, F, N> {
    store: S,
    fetcher: F,
    notifier: N,
    mode: Mode,
}

impl<S, F, N> Monitor<S, F, N>
where
    S: NoticeStore,
    F: Fetcher,
    N: Notifier + Sync,
{
    /// Initialise the store and pick the starting mode.
    pub fn start(store: S, fetcher: F, notifier: N) -> Result<Self, MonitorError<S::Error>> {
        store.initialize().map_err(MonitorError::Storage)?;
        let mode = if store.is_empty().map_err(MonitorError::Storage)? {
            info!("store is empty, first cycle will backfill without notifying");
            Mode::Backfill
        } else {
            let count = store.count().map_err(MonitorError::Storage)?;
            info!(count, "tracking existing notices, only new ones will notify");
            Mode::Incremental
        };
        Ok(Self {
            store,
            fetcher,
            notifier,
            mode,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one cycle.
    ///
    /// A fetch failure is a logged no-op, except during backfill where it is
    /// returned as [`MonitorError::Backfill`]: without a baseline the next
    /// cycle would notify on every existing notice.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, MonitorError<S::Error>> {
        let rows = match self.fetcher.fetch().await {
            Ok(rows) => rows,
            Err(e) if self.mode == Mode::Backfill => {
                return Err(MonitorError::Backfill(Box::new(e)));
            }
            Err(e) => {
                warn!(error = %e, "fetch failed, skipping cycle");
                return Ok(CycleReport::default());
            }
        };

        let row_count = rows.len();
        let batch = normalize(rows);
        let outcome = diff::apply_batch(&self.store, &self.notifier, &batch, self.mode)
            .await
            .map_err(MonitorError::Storage)?;

        match self.mode {
            Mode::Backfill => {
                info!(count = outcome.processed, "backfill complete, baseline recorded");
                if let Some((lo, hi)) = numeric_id_range(batch.iter().map(|n| n.id.as_str())) {
                    info!(lo, hi, "notice id range");
                }
                self.mode = Mode::Incremental;
            }
            Mode::Incremental if outcome.new_count == 0 => {
                info!(checked = row_count, "no new notices");
            }
            Mode::Incremental => {
                info!(
                    new = outcome.new_count,
                    sent = outcome.notified_ids.len(),
                    failed = outcome.failed_ids.len(),
                    "processed new notices"
                );
            }
        }

        Ok(CycleReport {
            fetched: true,
            rows: row_count,
            outcome,
        })
    }
}
