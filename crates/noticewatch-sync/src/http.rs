//! HTTP fetcher for the notice board's jqGrid endpoint.

use async_trait::async_trait;
use noticewatch_core::{FetchConfig, Fetcher, RawRow};
use reqwest::header::{
    ACCEPT, COOKIE, HeaderMap, HeaderValue, InvalidHeaderValue, REFERER, USER_AGENT,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::payload::{PayloadError, parse_page};

const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const GRID_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";
const NOTICE_QUERY_ID: &str = "54";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(#[from] PayloadError),
    #[error("invalid header value: {0}")]
    Header(#[from] InvalidHeaderValue),
}

/// Client for the notice board's data endpoint.
///
/// Authenticates with a session cookie copied from a browser; when it
/// expires the endpoint answers with a login page, which surfaces as
/// [`FetchError::Malformed`].
pub struct ErpClient {
    client: reqwest::Client,
    endpoint: String,
    page_size: u32,
}

impl ErpClient {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(GRID_ACCEPT));
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        let mut cookie = HeaderValue::from_str(&config.cookie)?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);
        headers.insert(REFERER, HeaderValue::from_str(&config.notice_page)?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            page_size: config.page_size,
        })
    }

    /// Fetch the first page of notices.
    pub async fn fetch_page(&self) -> Result<Vec<RawRow>, FetchError> {
        let page_size = self.page_size.to_string();
        let query = [
            ("action", "fetchData"),
            ("jqqueryid", NOTICE_QUERY_ID),
            ("_search", "false"),
            ("rows", page_size.as_str()),
            ("page", "1"),
        ];

        debug!(endpoint = %self.endpoint, "fetching notices");
        let resp = self.client.get(&self.endpoint).query(&query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let rows = parse_page(&body)?;
        info!(count = rows.len(), "fetched notices");
        Ok(rows)
    }
}

#[async_trait]
impl Fetcher for ErpClient {
    type Error = FetchError;

    async fn fetch(&self) -> Result<Vec<RawRow>, FetchError> {
        self.fetch_page().await
    }
}
