//! End-to-end escalation scenarios: a real HTTP fetcher against a wiremock
//! server, with a stub browser engine standing in for Chromium.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pagelens::browser::{BrowserEngine, LaunchOptions, Session};
use pagelens::error::{PagelensError, Result};
use pagelens::events::{EventSink, FetchEvent};
use pagelens::fetch::HttpFetcher;
use pagelens::pipeline::Pipeline;
use pagelens::store::HistoryStore;

/// Engine that never launches; records every launch request.
struct StubEngine {
    launches: Mutex<Vec<bool>>,
}

impl StubEngine {
    fn new() -> Self {
        Self {
            launches: Mutex::new(Vec::new()),
        }
    }

    fn launches(&self) -> Vec<bool> {
        self.launches.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserEngine for StubEngine {
    async fn launch(&self, opts: LaunchOptions) -> Result<Box<dyn Session>> {
        self.launches.lock().unwrap().push(opts.headless);
        Err(PagelensError::Browser("no browser in tests".into()))
    }
}

const RICH_PAGE: &str = "<html><head><title>Article</title></head><body>\
    <p>one</p><p>two</p><p>three</p><p>four</p><p>five</p>\
    <a href=\"/next\">next</a>\
    <table><tr><th>h</th></tr><tr><td>v</td></tr></table>\
    </body></html>";

async fn run(pipeline: &Pipeline, url: &str) -> Vec<FetchEvent> {
    let (sink, mut rx) = EventSink::channel();
    pipeline.run(url, &sink).await;
    drop(sink);
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    events
}

fn setup(dir: &TempDir, engine: Arc<StubEngine>) -> Pipeline {
    let store = Arc::new(HistoryStore::new(dir.path().join("history.json")));
    Pipeline::new(Arc::new(HttpFetcher::new()), engine, store)
}

#[tokio::test]
async fn direct_success_produces_record_without_browser() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RICH_PAGE))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let engine = Arc::new(StubEngine::new());
    let pipeline = setup(&dir, engine.clone());

    let events = run(&pipeline, &format!("{}/article", server.uri())).await;

    // Log frames first, exactly one terminal frame last.
    assert!(events.len() >= 2);
    let (terminal, logs) = events.split_last().unwrap();
    assert!(logs.iter().all(|e| matches!(e, FetchEvent::Log(_))));
    match terminal {
        FetchEvent::Result(record) => {
            assert_eq!(record.title, "Article");
            assert_eq!(record.paragraphs.len(), 5);
            assert_eq!(record.links, vec!["/next"]);
            assert_eq!(record.tables.len(), 1);
        }
        other => panic!("expected result, got {other:?}"),
    }
    assert!(engine.launches().is_empty(), "no browser strategy may run");

    // The record was durably saved.
    let saved = HistoryStore::new(dir.path().join("history.json"))
        .list()
        .await
        .unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].title, "Article");
}

#[tokio::test]
async fn blocked_response_escalates_through_browser_chain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let engine = Arc::new(StubEngine::new());
    let pipeline = setup(&dir, engine.clone());

    let events = run(&pipeline, &server.uri()).await;

    let (terminal, logs) = events.split_last().unwrap();
    match terminal {
        FetchEvent::Error(msg) => assert!(msg.contains("fetch failed")),
        other => panic!("expected error, got {other:?}"),
    }
    // The direct attempt logged the blocked status before escalating.
    assert!(logs.iter().any(
        |e| matches!(e, FetchEvent::Log(m) if m.contains("403") && m.contains("blocked"))
    ));
    // Headless then visible, each exactly once.
    assert_eq!(engine.launches(), vec![true, false]);
}

#[tokio::test]
async fn server_error_escalates_like_a_block() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(522))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let engine = Arc::new(StubEngine::new());
    let pipeline = setup(&dir, engine.clone());

    let events = run(&pipeline, &server.uri()).await;
    assert!(matches!(events.last(), Some(FetchEvent::Error(_))));
    assert_eq!(engine.launches(), vec![true, false]);
}

#[tokio::test]
async fn plain_404_does_not_escalate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string(RICH_PAGE))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let engine = Arc::new(StubEngine::new());
    let pipeline = setup(&dir, engine.clone());

    let events = run(&pipeline, &server.uri()).await;
    // A 404 body is still content; no browser strategy may run for it.
    assert!(matches!(events.last(), Some(FetchEvent::Result(_))));
    assert!(engine.launches().is_empty());
}

#[tokio::test]
async fn refetch_updates_record_in_place() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RICH_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RICH_PAGE))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let engine = Arc::new(StubEngine::new());
    let pipeline = setup(&dir, engine.clone());

    let url_a = format!("{}/a", server.uri());
    let url_b = format!("{}/b", server.uri());
    run(&pipeline, &url_a).await;
    run(&pipeline, &url_b).await;
    // Fetch /a again: still two records, /a keeps its (older) position.
    run(&pipeline, &url_a).await;

    let saved = HistoryStore::new(dir.path().join("history.json"))
        .list()
        .await
        .unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].url, url_b);
    assert_eq!(saved[1].url, url_a);
}
