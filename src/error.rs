//! Error types for the retrieval pipeline and its collaborators.

/// Errors that can occur while fetching, extracting, or persisting a page.
#[derive(thiserror::Error, Debug)]
pub enum PagelensError {
    /// Missing or malformed caller input; surfaced immediately, no retrieval
    /// is attempted.
    #[error("invalid input: {0}")]
    Input(String),

    /// A single retrieval strategy failed (network error, timeout). Recovered
    /// locally by escalating to the next strategy; only reaches the caller
    /// when the whole escalation chain fails.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Browser launch or session failure. Treated like a fetch failure for
    /// escalation purposes.
    #[error("browser error: {0}")]
    Browser(String),

    /// History persistence failure. Fails the request even when extraction
    /// succeeded — a successful response implies the record was saved.
    #[error("store error: {0}")]
    Store(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PagelensError>;
