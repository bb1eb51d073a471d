//! Page interaction driver.
//!
//! Runs inside a browser strategy after the initial page load: elicits
//! lazily-loaded content by scrolling, waits for known content containers,
//! and — for multi-table sites — activates "view data table" controls and
//! accumulates the markup each one reveals. Everything goes through the
//! [`Session`] trait, so the driver is engine-agnostic.

use std::time::Duration;

use super::Session;
use crate::error::Result;
use crate::events::EventSink;

/// Selectors that signal the main content has rendered.
pub const CONTENT_SELECTORS: &str = "article, .blog-content-box, #content_views, .article-content";

/// Marker comment separating captured fragments in a multi-table buffer.
pub const FRAGMENT_MARKER: &str = "<!-- pagelens-fragment -->";

/// Upper bound on the content-readiness wait.
const READY_TIMEOUT: Duration = Duration::from_secs(15);
/// Upper bound on the per-control wait for a revealed table.
const TABLE_TIMEOUT: Duration = Duration::from_secs(15);
/// Poll interval for both waits.
const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Settle delay after each scroll pass.
const SETTLE_DELAY: Duration = Duration::from_secs(2);
/// Scroll passes are bounded; height stability stops the loop early.
const MAX_SCROLL_PASSES: usize = 5;

/// Driver over one live session.
pub struct PageDriver<'a> {
    session: &'a dyn Session,
    events: &'a EventSink,
}

impl<'a> PageDriver<'a> {
    pub fn new(session: &'a dyn Session, events: &'a EventSink) -> Self {
        Self { session, events }
    }

    /// Standard post-load settling: readiness wait, then lazy-load scrolling.
    pub async fn settle(&self) -> Result<()> {
        self.wait_for_content().await?;
        self.elicit_lazy_content().await
    }

    /// Wait up to 15s for a known content container. Absence is a warning,
    /// never a failure — extraction proceeds regardless.
    async fn wait_for_content(&self) -> Result<()> {
        let script = format!(
            "document.querySelector('{}') !== null",
            sanitize_js_string(CONTENT_SELECTORS)
        );
        if self.poll_until_true(&script, READY_TIMEOUT).await? {
            self.events.log("content container detected");
        } else {
            self.events
                .log("no known content container detected, continuing anyway");
        }
        Ok(())
    }

    /// Scroll to the bottom repeatedly to trigger lazy loading, stopping once
    /// the document height stabilizes.
    async fn elicit_lazy_content(&self) -> Result<()> {
        let mut last_height = self.document_height().await?;
        for pass in 1..=MAX_SCROLL_PASSES {
            self.session
                .evaluate(
                    "(() => { window.scrollTo(0, document.body.scrollHeight); return true; })()",
                )
                .await?;
            tokio::time::sleep(SETTLE_DELAY).await;

            let height = self.document_height().await?;
            if height == last_height {
                break;
            }
            last_height = height;
            self.events.log(format!("scroll pass {pass} complete"));
        }
        Ok(())
    }

    /// Multi-table elicitation: activate every control whose visible text
    /// matches one of `patterns`, capturing the page markup each reveals.
    ///
    /// Returns the accumulated fragment buffer, or the page as-is when no
    /// control matched or none could be activated.
    pub async fn elicit_tables(&self, patterns: &[&str]) -> Result<String> {
        let count = self
            .session
            .evaluate(&find_controls_script(patterns))
            .await?
            .as_u64()
            .unwrap_or(0);

        if count == 0 {
            self.events
                .log("no data-table controls found, capturing page as-is");
            return self.session.html().await;
        }
        self.events.log(format!("found {count} data-table control(s)"));

        let mut buffer = String::new();
        for index in 0..count {
            let activated = self
                .session
                .evaluate(&activate_control_script(patterns, index))
                .await?
                .as_bool()
                .unwrap_or(false);
            if !activated {
                self.events
                    .log(format!("control {} could not be activated, skipping", index + 1));
                continue;
            }

            let table_script = "document.querySelector('table') !== null";
            if !self.poll_until_true(table_script, TABLE_TIMEOUT).await? {
                self.events.log(format!(
                    "no table appeared for control {}, skipping",
                    index + 1
                ));
                continue;
            }

            let markup = self.session.html().await?;
            if !buffer.is_empty() {
                buffer.push('\n');
                buffer.push_str(FRAGMENT_MARKER);
                buffer.push('\n');
            }
            buffer.push_str(&markup);
            self.events
                .log(format!("captured table view {} of {count}", index + 1));

            // Best effort; a stuck overlay only affects later captures.
            let _ = self.session.evaluate(DISMISS_OVERLAY_SCRIPT).await;
        }

        if buffer.is_empty() {
            self.events
                .log("no table views captured, capturing page as-is");
            return self.session.html().await;
        }
        Ok(buffer)
    }

    async fn document_height(&self) -> Result<u64> {
        let value = self.session.evaluate("document.body.scrollHeight").await?;
        Ok(value.as_u64().unwrap_or(0))
    }

    /// Poll a boolean script until it returns true or the deadline passes.
    async fn poll_until_true(&self, script: &str, timeout: Duration) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let ready = self
                .session
                .evaluate(script)
                .await?
                .as_bool()
                .unwrap_or(false);
            if ready {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

const DISMISS_OVERLAY_SCRIPT: &str = r#"(() => {
    const close = document.querySelector(
        '.modal .close, .modal-dialog .close, [aria-label="Close"], .el-dialog__headerbtn');
    if (close) { close.click(); return true; }
    document.dispatchEvent(new KeyboardEvent('keydown', { key: 'Escape', keyCode: 27 }));
    return false;
})()"#;

/// JS array literal of sanitized pattern strings.
fn patterns_literal(patterns: &[&str]) -> String {
    patterns
        .iter()
        .map(|p| format!("'{}'", sanitize_js_string(p)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Count interactive elements whose visible text matches a pattern.
fn find_controls_script(patterns: &[&str]) -> String {
    format!(
        r#"(() => {{
            const pats = [{pats}];
            const els = Array.from(document.querySelectorAll('a, button'));
            return els.filter(el => {{
                const t = (el.textContent || '').trim();
                return pats.some(p => t.includes(p));
            }}).length;
        }})()"#,
        pats = patterns_literal(patterns)
    )
}

/// Scroll the nth matching control into view and click it.
fn activate_control_script(patterns: &[&str], index: u64) -> String {
    format!(
        r#"(() => {{
            const pats = [{pats}];
            const els = Array.from(document.querySelectorAll('a, button'));
            const hits = els.filter(el => {{
                const t = (el.textContent || '').trim();
                return pats.some(p => t.includes(p));
            }});
            const el = hits[{index}];
            if (!el) return false;
            el.scrollIntoView({{ block: 'center' }});
            el.click();
            return true;
        }})()"#,
        pats = patterns_literal(patterns)
    )
}

/// Sanitize a string for safe injection into a JavaScript string literal.
fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            _ => result.push(ch),
        }
    }
    result
}
