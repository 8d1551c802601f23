//! Change detection for a polled notice board: records, fingerprints, the
//! seen-notice store contract, and the diff engine that decides who gets told.

pub mod config;
pub mod diff;
pub mod io;
pub mod message;
pub mod monitor;
pub mod notice;
pub mod store;

pub use config::{Config, FetchConfig, MailConfig, StoreConfig};
pub use diff::{DiffOutcome, Mode, apply_batch};
pub use io::{Fetcher, Notifier};
pub use message::NoticeEmail;
pub use monitor::{CycleReport, Monitor, MonitorError};
pub use notice::{NoticeRecord, RawNotice, RawRow, fingerprint, normalize, numeric_id_range};
pub use store::{NoticeStore, SeenEntry, TITLE_MAX_CHARS, truncate_title};
