//! HTTP JSON-RPC Transport - reqwest POST Client
//!
//! Sends one JSON body per call and returns the raw response text.
//! No request timeout is configured here: the workflow deadline bounds
//! every oracle exchange.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::ports::price_oracle::JsonRpcTransport;

/// reqwest-backed `JsonRpcTransport`.
#[derive(Debug, Clone)]
pub struct HttpJsonRpcTransport {
    http: Client,
    url: String,
}

impl HttpJsonRpcTransport {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .pool_max_idle_per_host(2)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl JsonRpcTransport for HttpJsonRpcTransport {
    async fn post_json(&self, body: String) -> Result<String> {
        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .context("Oracle POST request failed")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read oracle response body")?;

        debug!(status = %status, bytes = text.len(), "Oracle response received");

        if !status.is_success() {
            anyhow::bail!("Oracle HTTP {status}: {text}");
        }
        Ok(text)
    }
}
