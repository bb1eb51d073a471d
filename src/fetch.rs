//! Direct-HTTP fetcher.
//!
//! Not a browser — a single GET with a browser-like user agent. Whether a
//! response is good enough, and whether to escalate to a browser strategy,
//! is the orchestrator's call, not this component's.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{PagelensError, Result};

/// Browser-like user agent sent on direct requests and browser sessions.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";

/// Direct request timeout.
pub const DIRECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Response from a direct GET.
#[derive(Debug, Clone)]
pub struct DirectResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

/// Seam for the direct-HTTP strategy so the orchestrator can be exercised
/// without a network.
#[async_trait]
pub trait DirectFetcher: Send + Sync {
    /// Issue one GET and return the status and body.
    async fn get(&self, url: &str) -> Result<DirectResponse>;
}

/// Production fetcher wrapping a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(DIRECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectFetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<DirectResponse> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PagelensError::Fetch(format!("request failed: {e}")))?;

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();

        Ok(DirectResponse { status, body })
    }
}
