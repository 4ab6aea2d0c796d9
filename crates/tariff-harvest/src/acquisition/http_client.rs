//! Page fetcher wrapping reqwest.
//!
//! One GET per call with a fixed user-agent and a bounded timeout. No retry
//! happens here; failures are classified into [`FetchError`] and handed back
//! so the harvester can decide whether to move on or try again.

use crate::types::FetchError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// Final URL after redirects, including the query string.
    pub url: String,
    /// HTTP status code (always 2xx).
    pub status: u16,
    /// Content-Type header, if sent.
    pub content_type: Option<String>,
    /// Response body as text.
    pub body: String,
}

/// Anything that can hand back a page for a URL.
///
/// The harvester is generic over this so tests can feed canned pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str, query: &[(&str, &str)]) -> Result<RawPage, FetchError>;
}

/// HTTP fetcher for the tariff site.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with the given client identity and per-request timeout.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &str, query: &[(&str, &str)]) -> Result<RawPage, FetchError> {
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let resp = request.send().await.map_err(|e| classify(url, e))?;
        let status = resp.status();
        let final_url = resp.url().to_string();

        if !status.is_success() {
            return Err(FetchError::Status {
                url: final_url,
                status: status.as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = resp.text().await.map_err(|e| classify(&final_url, e))?;

        Ok(RawPage {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

fn classify(url: &str, err: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if err.is_timeout() {
        FetchError::Timeout { url }
    } else if err.is_connect() {
        FetchError::Connection {
            url,
            message: err.to_string(),
        }
    } else if let Some(status) = err.status() {
        FetchError::Status {
            url,
            status: status.as_u16(),
        }
    } else {
        FetchError::Unknown {
            url,
            message: err.to_string(),
        }
    }
}
