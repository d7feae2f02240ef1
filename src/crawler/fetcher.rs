//! HTTP fetcher implementation
//!
//! This module handles every outbound document request of the crawler:
//! - Building the HTTP client with the configured identity header and timeout
//! - Single-shot GET requests (no retries; callers decide what a failure means)
//! - Classifying failures into [`FetchCause`]

use crate::config::UserAgentConfig;
use crate::{FetchCause, FetchError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// A fetched HTML document
#[derive(Debug, Clone)]
pub struct Document {
    /// Final URL after redirects
    pub url: Url,

    /// Page body content
    pub body: String,
}

/// Source of documents for the crawl orchestrator
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` once. Any non-2xx status or transport failure is a [`FetchError`].
    async fn fetch(&self, url: &Url) -> Result<Document, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Upper bound for a whole request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.value.clone())
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL with a single GET request
///
/// | Condition | Result |
/// |-----------|--------|
/// | HTTP 2xx | `Ok(Document)` |
/// | Any other status | `FetchCause::Status` |
/// | Timeout, connection or body error | `FetchCause::Transport` |
pub async fn fetch_url(client: &Client, url: &Url) -> Result<Document, FetchError> {
    let fail = |cause: FetchCause| FetchError {
        url: url.to_string(),
        cause,
    };

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| fail(classify_transport_error(&e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fail(FetchCause::Status(status.as_u16())));
    }

    let final_url = response.url().clone();
    let body = response
        .text()
        .await
        .map_err(|e| fail(classify_transport_error(&e)))?;

    Ok(Document {
        url: final_url,
        body,
    })
}

fn classify_transport_error(error: &reqwest::Error) -> FetchCause {
    if error.is_timeout() {
        FetchCause::Transport("Request timeout".to_string())
    } else if error.is_connect() {
        FetchCause::Transport("Connection refused".to_string())
    } else {
        FetchCause::Transport(error.to_string())
    }
}

/// [`PageFetcher`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Document, FetchError> {
        fetch_url(&self.client, url).await
    }
}
