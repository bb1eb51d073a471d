//! Parse raw HTML into canonical page content.
//!
//! Pure functions, no I/O. Extraction runs over whatever markup the fetch
//! produced — including the concatenated multi-fragment buffers built by the
//! interaction driver, whose marker comments carry no meaning here: tables
//! from every fragment land in one flat sequence.

use scraper::{Html, Selector};
use std::collections::HashSet;

use crate::record::Table;

/// Paragraphs and links are deduplicated and capped at this many entries.
pub const MAX_ITEMS: usize = 200;

/// Title used when the document has no (or an empty) `<title>`.
pub const UNTITLED: &str = "(untitled)";

/// Content extracted from a single page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub title: String,
    pub paragraphs: Vec<String>,
    pub links: Vec<String>,
    pub tables: Vec<Table>,
}

/// Extract title, paragraphs, links, and tables from raw HTML.
pub fn extract(html: &str) -> PageContent {
    let document = Html::parse_document(html);

    PageContent {
        title: extract_title(&document),
        paragraphs: extract_paragraphs(&document),
        links: extract_links(&document),
        tables: extract_tables(&document),
    }
}

fn extract_title(document: &Html) -> String {
    let sel = Selector::parse("title").unwrap();
    let title = document
        .select(&sel)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default();
    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}

fn extract_paragraphs(document: &Html) -> Vec<String> {
    let sel = Selector::parse("p").unwrap();
    let texts = document
        .select(&sel)
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty());
    dedup_capped(texts)
}

fn extract_links(document: &Html) -> Vec<String> {
    let sel = Selector::parse("a[href]").unwrap();
    let hrefs = document
        .select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .map(|h| h.to_string());
    dedup_capped(hrefs)
}

fn extract_tables(document: &Html) -> Vec<Table> {
    let table_sel = Selector::parse("table").unwrap();
    let th_sel = Selector::parse("th").unwrap();
    let tr_sel = Selector::parse("tr").unwrap();
    let td_sel = Selector::parse("td").unwrap();

    let mut tables = Vec::new();
    for table in document.select(&table_sel) {
        let headers: Vec<String> = table
            .select(&th_sel)
            .map(|el| element_text(&el))
            .collect();

        let mut rows = Vec::new();
        for tr in table.select(&tr_sel) {
            let cells: Vec<String> = tr.select(&td_sel).map(|el| element_text(&el)).collect();
            // Header-only rows have zero data cells and are dropped.
            if !cells.is_empty() {
                rows.push(cells);
            }
        }

        let table = Table { headers, rows };
        if table.is_meaningful() {
            tables.push(table);
        }
    }
    tables
}

/// Whole text of an element, whitespace-trimmed.
fn element_text(el: &scraper::ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// First-occurrence-wins dedup in insertion order, capped at [`MAX_ITEMS`].
fn dedup_capped(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item.clone()) {
            out.push(item);
            if out.len() >= MAX_ITEMS {
                break;
            }
        }
    }
    out
}
