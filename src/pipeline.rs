// Copyright 2026 Pagelens Contributors
// SPDX-License-Identifier: Apache-2.0

//! Retrieval orchestrator.
//!
//! The state machine tying the direct fetcher, the browser engine, the
//! interaction driver, and the extractor together:
//!
//! ```text
//! Start → TryDirect → (Success | TryBrowserHeadless)
//!       → (Success | TryBrowserVisible-or-Multi) → Done(Success | Failure)
//! ```
//!
//! Escalation is strictly one-directional and each strategy runs at most once
//! per request, bounding worst-case latency to the sum of the per-strategy
//! timeouts.

use std::sync::Arc;
use std::time::Duration;

use crate::browser::driver::PageDriver;
use crate::browser::{BrowserEngine, LaunchOptions, Session};
use crate::error::{PagelensError, Result};
use crate::events::EventSink;
use crate::extract::{extract, PageContent};
use crate::fetch::DirectFetcher;
use crate::record::PageRecord;
use crate::sites::{SiteRules, TABLE_CONTROL_PATTERNS};
use crate::store::HistoryStore;

/// Retrieval strategies, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Direct,
    BrowserHeadless,
    BrowserVisible,
    BrowserMultiTable,
}

impl Strategy {
    pub fn describe(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct HTTP",
            Strategy::BrowserHeadless => "headless browser",
            Strategy::BrowserVisible => "visible browser",
            Strategy::BrowserMultiTable => "multi-table browser",
        }
    }
}

/// Title marker left by security-verification interstitials.
pub const SECURITY_MARKER: &str = "安全验证";
/// Fewer extracted paragraphs than this triggers the quality gate.
pub const MIN_PARAGRAPHS: usize = 5;

/// Page-load timeouts per browser mode.
const HEADLESS_NAV_TIMEOUT: Duration = Duration::from_secs(40);
const VISIBLE_NAV_TIMEOUT: Duration = Duration::from_secs(50);

/// A response status on which the direct strategy escalates to a browser:
/// 403 or any 5xx (covers the Cloudflare 520–524 range).
pub fn is_blocked_status(status: u16) -> bool {
    status == 403 || (500..600).contains(&status)
}

/// Quality gate: does this extraction look blocked or incomplete?
pub fn quality_gate(content: &PageContent) -> bool {
    content.title.contains(SECURITY_MARKER) || content.paragraphs.len() < MIN_PARAGRAPHS
}

/// One orchestrator instance serves many requests; each call to [`run`] is an
/// independent retrieval with its own browser sessions.
///
/// [`run`]: Pipeline::run
pub struct Pipeline {
    fetcher: Arc<dyn DirectFetcher>,
    engine: Arc<dyn BrowserEngine>,
    store: Arc<HistoryStore>,
    rules: SiteRules,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn DirectFetcher>,
        engine: Arc<dyn BrowserEngine>,
        store: Arc<HistoryStore>,
    ) -> Self {
        Self {
            fetcher,
            engine,
            store,
            rules: SiteRules::defaults(),
        }
    }

    /// Replace the site rule registry.
    pub fn with_rules(mut self, rules: SiteRules) -> Self {
        self.rules = rules;
        self
    }

    /// Run one retrieval. Emits log frames as the pipeline progresses and
    /// exactly one terminal frame; never leaves the request hanging.
    pub async fn run(&self, url: &str, events: &EventSink) {
        match self.run_inner(url, events).await {
            Ok(record) => events.finish(record),
            Err(e) => events.fail(e.to_string()),
        }
    }

    async fn run_inner(&self, url: &str, events: &EventSink) -> Result<PageRecord> {
        validate_url(url)?;
        events.log(format!("fetching {url} ..."));

        let chain = self.rules.chain_for(url);
        let mut visible_attempted = false;
        let mut html: Option<String> = None;

        for strategy in chain {
            match strategy {
                Strategy::Direct => {
                    events.log("trying direct HTTP fetch");
                    match self.fetcher.get(url).await {
                        Ok(resp) if is_blocked_status(resp.status) => {
                            events.log(format!(
                                "status {} looks blocked, escalating to a browser",
                                resp.status
                            ));
                        }
                        Ok(resp) => {
                            events.log("direct fetch succeeded");
                            html = Some(resp.body);
                        }
                        Err(e) => {
                            events.log(format!("direct fetch failed: {e}"));
                        }
                    }
                }
                _ => {
                    if strategy == Strategy::BrowserVisible {
                        visible_attempted = true;
                    }
                    match self.browser_attempt(url, strategy, events).await {
                        Ok(markup) => html = Some(markup),
                        Err(e) => {
                            events.log(format!("{} attempt failed: {e}", strategy.describe()));
                        }
                    }
                }
            }
            if html.is_some() {
                break;
            }
        }

        let markup = html
            .ok_or_else(|| PagelensError::Fetch("no strategy produced any HTML".to_string()))?;
        let mut content = extract(&markup);

        // One-shot final retry, applied uniformly regardless of which
        // strategy produced the extraction.
        if quality_gate(&content) && !visible_attempted {
            events.log("content looks blocked or incomplete, retrying with a visible browser");
            match self.browser_attempt(url, Strategy::BrowserVisible, events).await {
                Ok(markup) => content = extract(&markup),
                Err(e) => {
                    events.log(format!(
                        "visible browser retry failed: {e}, keeping first extraction"
                    ));
                }
            }
        }

        let record = PageRecord::new(url, content);
        self.store.upsert(record.clone()).await?;

        events.log(format!(
            "extracted {} paragraph(s), {} link(s), {} table(s); saved to history",
            record.paragraphs.len(),
            record.links.len(),
            record.tables.len()
        ));
        Ok(record)
    }

    /// One browser attempt: launch, navigate, settle, capture, tear down.
    /// The session is closed on every path out of here.
    async fn browser_attempt(
        &self,
        url: &str,
        strategy: Strategy,
        events: &EventSink,
    ) -> Result<String> {
        let headless = strategy != Strategy::BrowserVisible;
        events.log(match strategy {
            Strategy::BrowserHeadless => "launching headless browser",
            Strategy::BrowserVisible => "launching visible browser window",
            Strategy::BrowserMultiTable => "launching headless browser in multi-table mode",
            Strategy::Direct => unreachable!("direct strategy is not a browser attempt"),
        });

        let timeout = if headless {
            HEADLESS_NAV_TIMEOUT
        } else {
            VISIBLE_NAV_TIMEOUT
        };

        let mut session = self.engine.launch(LaunchOptions { headless }).await?;
        let result = drive_session(session.as_mut(), url, strategy, timeout, events).await;
        let _ = session.close().await;
        result
    }
}

async fn drive_session(
    session: &mut dyn Session,
    url: &str,
    strategy: Strategy,
    timeout: Duration,
    events: &EventSink,
) -> Result<String> {
    session.navigate(url, timeout).await?;
    events.log("page loaded, settling content");

    let driver = PageDriver::new(&*session, events);
    driver.settle().await?;

    if strategy == Strategy::BrowserMultiTable {
        driver.elicit_tables(TABLE_CONTROL_PATTERNS).await
    } else {
        session.html().await
    }
}

fn validate_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(PagelensError::Input("no URL provided".to_string()));
    }
    let parsed = url::Url::parse(url)
        .map_err(|e| PagelensError::Input(format!("malformed URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PagelensError::Input(format!(
            "unsupported URL scheme: {}",
            parsed.scheme()
        )));
    }
    Ok(())
}
