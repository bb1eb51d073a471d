//! Browser abstraction for rendered-page retrieval.
//!
//! Defines the `BrowserEngine` and `Session` traits that abstract over the
//! automation engine (currently Chromium via chromiumoxide) so the
//! orchestrator and the interaction driver never depend on a specific engine.

pub mod chromium;
pub mod driver;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Options for launching a browser session.
#[derive(Debug, Clone, Copy)]
pub struct LaunchOptions {
    /// Run without a visible window. Headed mode is the escalation used when
    /// headless sessions are suspected of being blocked by anti-bot defenses.
    pub headless: bool,
}

/// A browser engine that can launch isolated sessions.
///
/// Each launch produces a fresh, isolated session; nothing is shared or
/// pooled across requests.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn launch(&self, opts: LaunchOptions) -> Result<Box<dyn Session>>;
}

/// One isolated browser session (its own browser process and page).
#[async_trait]
pub trait Session: Send + Sync {
    /// Navigate to a URL, bounded by the given timeout.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;
    /// Execute JavaScript in the page and return its JSON result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;
    /// Full page markup.
    async fn html(&self) -> Result<String>;
    /// Tear the session down. Must be called on every exit path.
    async fn close(self: Box<Self>) -> Result<()>;
}
