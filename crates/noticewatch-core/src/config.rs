//! Configuration value objects, built once at startup and passed by reference
//! into the fetcher, notifier, and store constructors.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str =
    "https://erp.iitkgp.ac.in/TrainingPlacementSSO/ERPMonitoring.htm";
pub const DEFAULT_NOTICE_PAGE: &str = "https://erp.iitkgp.ac.in/TrainingPlacementSSO/Notice.jsp";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Everything the monitor needs, assembled by the binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub fetch: FetchConfig,
    pub mail: MailConfig,
    pub store: StoreConfig,
    pub poll_interval: Duration,
}

/// Notice board endpoint and session.
#[derive(Clone)]
pub struct FetchConfig {
    /// jqGrid data endpoint.
    pub endpoint: String,
    /// Page the grid lives on; sent as `Referer` and linked from emails.
    pub notice_page: String,
    /// Session cookie header value.
    pub cookie: String,
    /// Rows requested per fetch.
    pub page_size: u32,
    pub timeout: Duration,
}

impl FetchConfig {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            notice_page: DEFAULT_NOTICE_PAGE.to_string(),
            cookie: cookie.into(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout: FETCH_TIMEOUT,
        }
    }
}

impl fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchConfig")
            .field("endpoint", &self.endpoint)
            .field("notice_page", &self.notice_page)
            .field("cookie", &"<redacted>")
            .field("page_size", &self.page_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// SMTP relay and distribution list.
#[derive(Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Address every notice email is sent to.
    pub recipient: String,
    /// Link included in each email.
    pub notice_page: String,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .field("notice_page", &self.notice_page)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}
