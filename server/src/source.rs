//! The scraped page: an opaque fetch returning raw text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use crate::retry::{with_retry, RetryConfig, RetryError};

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Short name of the source for user-facing messages.
    fn name(&self) -> String;

    async fn fetch(&self) -> Result<String>;
}

/// Fetches the history page over HTTP, retrying transient failures.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
    retry: RetryConfig,
}

impl HttpSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("windlog/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(HttpSource {
            client,
            url: url.to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_once(&self) -> Result<String, RetryError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RetryError::Retryable(e.into()))?;

        match response.status() {
            status if status.is_success() => response
                .text()
                .await
                .map_err(|e| RetryError::Retryable(e.into())),
            status if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => Err(
                RetryError::Retryable(anyhow::anyhow!("Scrape failed with status: {}", status)),
            ),
            status => Err(RetryError::NonRetryable(anyhow::anyhow!(
                "Scrape failed with status: {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl PageSource for HttpSource {
    fn name(&self) -> String {
        source_name(&self.url)
    }

    async fn fetch(&self) -> Result<String> {
        log::debug!("Fetching {}", self.url);
        with_retry(|| self.fetch_once(), &self.retry)
            .await
            .map_err(RetryError::into_inner)
    }
}

/// Host of `url` without a leading `www.`, or the url itself.
pub fn source_name(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| url.to_string())
}
