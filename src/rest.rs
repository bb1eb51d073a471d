// Copyright 2026 Pagelens Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API.
//!
//! The route layer is plumbing around the pipeline: `/fetch` streams the
//! per-request event channel as SSE frames, and the history endpoints expose
//! the store and the export collaborators.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::error::PagelensError;
use crate::events::EventSink;
use crate::export;
use crate::pipeline::Pipeline;
use crate::store::HistoryStore;

/// Shared state for all routes.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<HistoryStore>,
}

/// Build the axum Router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/fetch", post(fetch_stream))
        .route("/history", get(history_list))
        .route("/history/:index", get(history_show).delete(history_delete))
        .route("/history/:index/export", get(history_export))
        .route("/history/:index/table/:table", get(table_export))
        .layer(cors)
        .with_state(state)
}

/// Start the server on the given port.
pub async fn start(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(serde::Deserialize, Default)]
struct FetchRequest {
    url: Option<String>,
}

/// Run one retrieval, streaming `{log}` frames and exactly one terminal
/// `{result}` or `{error}` frame as SSE.
async fn fetch_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FetchRequest>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let (sink, mut rx) = EventSink::channel();
    let pipeline = Arc::clone(&state.pipeline);
    let url = req.url.unwrap_or_default();

    // The run outlives a disconnecting client; the sink drops frames nobody
    // reads and the session teardown still happens inside the pipeline.
    tokio::spawn(async move {
        pipeline.run(&url, &sink).await;
    });

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            if let Ok(json) = serde_json::to_string(&event) {
                yield Ok(Event::default().data(json));
            }
            if terminal {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn history_list(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list().await {
        Ok(records) => Json(records).into_response(),
        Err(e) => store_error(e),
    }
}

async fn history_show(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Response {
    match state.store.get(index).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => not_found("index out of range"),
        Err(e) => store_error(e),
    }
}

async fn history_delete(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Response {
    match state.store.delete(index).await {
        Ok(deleted) => Json(json!({ "ok": deleted })).into_response(),
        Err(e) => store_error(e),
    }
}

/// Export one record as a standalone JSON attachment.
async fn history_export(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Response {
    match state.store.get(index).await {
        Ok(Some(record)) => match export::record_to_json(&record) {
            Ok(body) => attachment(
                body,
                "application/json; charset=utf-8",
                &format!("export_{index}.json"),
            ),
            Err(e) => store_error(e),
        },
        Ok(None) => not_found("index out of range"),
        Err(e) => store_error(e),
    }
}

/// Export one table of one record as a CSV attachment.
async fn table_export(
    State(state): State<Arc<AppState>>,
    Path((index, table_idx)): Path<(usize, usize)>,
) -> Response {
    match state.store.get(index).await {
        Ok(Some(record)) => match record.tables.get(table_idx) {
            Some(table) => attachment(
                export::table_to_csv(table),
                "text/csv; charset=utf-8",
                &format!("table_{index}_{table_idx}.csv"),
            ),
            None => not_found("table not found"),
        },
        Ok(None) => not_found("index out of range"),
        Err(e) => store_error(e),
    }
}

fn attachment(body: String, content_type: &str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

fn not_found(msg: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
}

fn store_error(e: PagelensError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
        .into_response()
}
