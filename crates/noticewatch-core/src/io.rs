//! I/O collaborators around the diff core.

use async_trait::async_trait;

use crate::{NoticeRecord, RawRow};

/// Retrieves the current page of notices from the notice board.
#[async_trait]
pub trait Fetcher {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Rows in delivery order, not yet normalised.
    async fn fetch(&self) -> Result<Vec<RawRow>, Self::Error>;
}

/// Delivers a single new notice to the distribution list.
#[async_trait]
pub trait Notifier {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn notify(&self, record: &NoticeRecord) -> Result<(), Self::Error>;
}
