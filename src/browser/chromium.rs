//! Chromium-based browser engine using chromiumoxide.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;

use super::{BrowserEngine, LaunchOptions, Session};
use crate::error::{PagelensError, Result};
use crate::fetch::USER_AGENT;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. PAGELENS_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("PAGELENS_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium engine. Launches one isolated browser process per session.
pub struct ChromiumEngine {
    executable: Option<PathBuf>,
}

impl ChromiumEngine {
    /// Create an engine, discovering the Chromium binary up front.
    ///
    /// Discovery failure is not fatal here — sessions will fail to launch and
    /// the orchestrator treats that as a fetch failure for the strategy.
    pub fn new() -> Self {
        let executable = find_chromium();
        if executable.is_none() {
            tracing::warn!("Chromium not found; browser strategies will fail");
        }
        Self { executable }
    }
}

impl Default for ChromiumEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn launch(&self, opts: LaunchOptions) -> Result<Box<dyn Session>> {
        let executable = self
            .executable
            .clone()
            .ok_or_else(|| PagelensError::Browser("Chromium not found in PATH".into()))?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .window_size(1920, 1080)
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={USER_AGENT}"));

        if opts.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        let config = builder
            .build()
            .map_err(|e| PagelensError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| PagelensError::Browser(format!("failed to launch Chromium: {e}")))?;

        // Drain browser events for the lifetime of the session.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| PagelensError::Browser(format!("failed to create page: {e}")))?;

        page.set_user_agent(USER_AGENT)
            .await
            .map_err(|e| PagelensError::Browser(format!("failed to set user agent: {e}")))?;

        Ok(Box::new(ChromiumSession { browser, page }))
    }
}

/// A single Chromium session: one browser process, one page.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
}

#[async_trait]
impl Session for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let result = tokio::time::timeout(timeout, self.page.goto(url)).await;

        match result {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;
                Ok(())
            }
            Ok(Err(e)) => Err(PagelensError::Browser(format!("navigation failed: {e}"))),
            Err(_) => Err(PagelensError::Browser(format!(
                "navigation timed out after {}s",
                timeout.as_secs()
            ))),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| PagelensError::Browser(format!("JS execution failed: {e}")))?;

        result
            .into_value()
            .map_err(|e| PagelensError::Browser(format!("failed to convert JS result: {e:?}")))
    }

    async fn html(&self) -> Result<String> {
        let value = self.evaluate("document.documentElement.outerHTML").await?;
        value
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| PagelensError::Browser("page markup was not a string".into()))
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        let _ = self.page.close().await;
        let _ = self.browser.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_chromium_env_override_missing_path() {
        // A nonexistent override must not be returned.
        std::env::set_var("PAGELENS_CHROMIUM_PATH", "/definitely/not/here");
        let found = find_chromium();
        std::env::remove_var("PAGELENS_CHROMIUM_PATH");
        if let Some(path) = found {
            assert_ne!(path, PathBuf::from("/definitely/not/here"));
        }
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_session_navigate_and_capture() {
        let engine = ChromiumEngine::new();
        let mut session = engine
            .launch(LaunchOptions { headless: true })
            .await
            .expect("failed to launch");

        session
            .navigate(
                "data:text/html,<title>Hi</title><p>World</p>",
                Duration::from_secs(10),
            )
            .await
            .expect("navigation failed");

        let html = session.html().await.expect("html capture failed");
        assert!(html.contains("<p>World</p>"));

        session.close().await.expect("close failed");
    }
}
