// Copyright 2026 Pagelens Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pagelens library — fetch one web page with escalating retrieval
//! strategies, extract structured content, and keep a local history.
//!
//! The core is the retrieval pipeline in [`pipeline`]; the REST layer in
//! [`rest`] and the CLI binary are thin consumers of its event stream.

pub mod browser;
pub mod error;
pub mod events;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod record;
pub mod rest;
pub mod sites;
pub mod store;

pub use error::{PagelensError, Result};
pub use record::{PageRecord, Table};
