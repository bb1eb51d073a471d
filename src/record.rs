//! Canonical data model for extracted pages.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// A single table extracted from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Header cell texts. May be empty for headerless tables.
    #[serde(default)]
    pub headers: Vec<String>,
    /// Data rows. Every retained row has at least one cell capture.
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// A table is worth keeping only if it has headers or at least one row.
    pub fn is_meaningful(&self) -> bool {
        !self.headers.is_empty() || !self.rows.is_empty()
    }
}

/// One page's worth of extracted content, keyed by URL in the history store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub paragraphs: Vec<String>,
    pub links: Vec<String>,
    #[serde(default)]
    pub tables: Vec<Table>,
    /// Local wall-clock time of retrieval, `%Y-%m-%d %H:%M:%S`.
    pub retrieved_at: String,
}

impl PageRecord {
    /// Build a record from extracted content, stamped with the current time.
    pub fn new(url: &str, content: crate::extract::PageContent) -> Self {
        Self {
            url: url.to_string(),
            title: content.title,
            paragraphs: content.paragraphs,
            links: content.links,
            tables: content.tables,
            retrieved_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
