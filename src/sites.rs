//! Site rule registry.
//!
//! Site-specific behavior is a strategy variant selected by URL pattern
//! matching — an ordered list of `(pattern, strategy)` pairs, open to
//! extension, rather than inline special-casing.

use regex::Regex;

use crate::error::{PagelensError, Result};
use crate::pipeline::Strategy;

/// One routing rule: URLs matching `pattern` start at `strategy`.
#[derive(Debug)]
pub struct SiteRule {
    pattern: Regex,
    strategy: Strategy,
}

/// Ordered registry of site rules; first match wins.
#[derive(Debug)]
pub struct SiteRules {
    rules: Vec<SiteRule>,
}

/// Visible-text patterns denoting "view data table" controls on multi-table
/// sites (open-data catalogs).
pub const TABLE_CONTROL_PATTERNS: &[&str] = &["查看", "查看数据", "数据预览", "view data"];

impl SiteRules {
    /// Registry with the built-in rules: known open-data catalogs go straight
    /// to the browser multi-table strategy.
    pub fn defaults() -> Self {
        let mut rules = Self { rules: Vec::new() };
        for pattern in [r"opendata\.[a-z]+\.gov\.cn", r"data\.[a-z]+\.gov\.cn"] {
            rules = rules
                .with_rule(pattern, Strategy::BrowserMultiTable)
                .expect("built-in site rule must be a valid regex");
        }
        rules
    }

    /// Empty registry (every URL takes the standard chain).
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule. Patterns are matched against the full URL string.
    pub fn with_rule(mut self, pattern: &str, strategy: Strategy) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| PagelensError::Input(format!("invalid site pattern: {e}")))?;
        self.rules.push(SiteRule { pattern, strategy });
        Ok(self)
    }

    /// Strategy override for a URL, if any rule matches.
    pub fn strategy_for(&self, url: &str) -> Option<Strategy> {
        self.rules
            .iter()
            .find(|r| r.pattern.is_match(url))
            .map(|r| r.strategy)
    }

    /// The full escalation chain for a URL. Escalation is one-directional and
    /// each strategy appears at most once.
    pub fn chain_for(&self, url: &str) -> Vec<Strategy> {
        match self.strategy_for(url) {
            Some(Strategy::BrowserMultiTable) => {
                vec![Strategy::BrowserMultiTable, Strategy::BrowserVisible]
            }
            Some(Strategy::BrowserHeadless) => {
                vec![Strategy::BrowserHeadless, Strategy::BrowserVisible]
            }
            Some(Strategy::BrowserVisible) => vec![Strategy::BrowserVisible],
            Some(Strategy::Direct) | None => vec![
                Strategy::Direct,
                Strategy::BrowserHeadless,
                Strategy::BrowserVisible,
            ],
        }
    }
}

impl Default for SiteRules {
    fn default() -> Self {
        Self::defaults()
    }
}
