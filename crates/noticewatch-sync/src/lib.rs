//! I/O edges: the notice board fetcher and the email notifier.

pub mod payload;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "smtp")]
pub mod mail;

pub use payload::{PayloadError, parse_page};

#[cfg(feature = "http")]
pub use http::{ErpClient, FetchError};

#[cfg(feature = "smtp")]
pub use mail::{NotifyError, SmtpNotifier};
