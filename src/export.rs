//! Export collaborators: standalone JSON documents and CSV tables.

use crate::error::{PagelensError, Result};
use crate::record::{PageRecord, Table};

/// Render a record as a standalone pretty JSON document.
pub fn record_to_json(record: &PageRecord) -> Result<String> {
    serde_json::to_string_pretty(record)
        .map_err(|e| PagelensError::Store(format!("failed to serialize record: {e}")))
}

/// Render one table as CSV. The header row is omitted when `headers` is
/// empty; cells get standard CSV escaping and nothing more.
pub fn table_to_csv(table: &Table) -> String {
    let mut out = String::new();
    if !table.headers.is_empty() {
        push_row(&mut out, &table.headers);
    }
    for row in &table.rows {
        push_row(&mut out, row);
    }
    out
}

fn push_row(out: &mut String, cells: &[String]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_csv(cell));
    }
    out.push_str("\r\n");
}

/// Quote a field only when it contains a comma, quote, or line break;
/// embedded quotes are doubled.
fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
