// Copyright 2026 Pagelens Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-request event channel.
//!
//! The pipeline pushes [`FetchEvent`] values onto an unbounded mpsc channel;
//! the transport layer (SSE endpoint, CLI) drains it. Events arrive in the
//! exact order the pipeline produced them, with exactly one terminal frame
//! (`Result` or `Error`) closing every request.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::record::PageRecord;

/// A single frame on the wire. External tagging gives the wire shapes
/// `{"log": …}`, `{"result": …}` and `{"error": …}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum FetchEvent {
    #[serde(rename = "log")]
    Log(String),
    #[serde(rename = "result")]
    Result(PageRecord),
    #[serde(rename = "error")]
    Error(String),
}

impl FetchEvent {
    /// Whether this frame terminates the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchEvent::Result(_) | FetchEvent::Error(_))
    }
}

/// Sending half of a request's event stream.
///
/// Sends are infallible from the pipeline's point of view: if the consumer
/// went away the event is silently dropped and the pipeline runs to
/// completion regardless.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<FetchEvent>,
}

impl EventSink {
    /// Create a sink together with the receiver the transport will drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FetchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit a progress log line.
    pub fn log(&self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::debug!("{msg}");
        let _ = self.tx.send(FetchEvent::Log(msg));
    }

    /// Emit the terminal result frame.
    pub fn finish(&self, record: PageRecord) {
        let _ = self.tx.send(FetchEvent::Result(record));
    }

    /// Emit the terminal error frame.
    pub fn fail(&self, msg: impl Into<String>) {
        let _ = self.tx.send(FetchEvent::Error(msg.into()));
    }
}
