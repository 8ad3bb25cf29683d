use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use chrono::Utc;
use serde_json::{Value, json};
use summary_gateway::{
    AppState,
    cache::{MemoryCacheStore, Summary},
    database::{IdentityRecord, IdentityStore, MemoryIdentityStore},
    error::GenerationError,
    fetch::{FetchError, PageFetcher},
    middleware::RequestGate,
    plan::Plan,
    quota::QuotaTracker,
    router::create_router,
    routes::summarize::CACHE_STATUS_HEADER,
    service::SummaryService,
    summarizer::{Summarizer, SummaryInput},
};
use tower::ServiceExt;
use url::Url;

struct EchoSummarizer {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl Summarizer for EchoSummarizer {
    async fn summarize(&self, input: &SummaryInput) -> Result<Summary, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GenerationError::Empty);
        }
        let first_words: Vec<_> = input.text.split_whitespace().take(3).collect();
        Ok(Summary::new(first_words.join(" "), &input.text))
    }
}

struct StaticPages {
    body: String,
    fetches: AtomicUsize,
}

#[async_trait]
impl PageFetcher for StaticPages {
    async fn fetch(&self, _url: &Url) -> Result<String, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}

struct Harness {
    app: Router,
    identities: Arc<MemoryIdentityStore>,
    summarizer: Arc<EchoSummarizer>,
    pages: Arc<StaticPages>,
}

fn harness(records: Vec<IdentityRecord>, page: &str, fail: bool) -> Harness {
    let identities = Arc::new(MemoryIdentityStore::with_records(records));
    let summarizer = Arc::new(EchoSummarizer {
        calls: AtomicUsize::new(0),
        fail,
    });
    let pages = Arc::new(StaticPages {
        body: page.to_string(),
        fetches: AtomicUsize::new(0),
    });
    let state = AppState {
        gate: Arc::new(RequestGate::new(QuotaTracker::with_default_window(
            identities.clone(),
        ))),
        summaries: Arc::new(SummaryService::new(
            Arc::new(MemoryCacheStore::new()),
            summarizer.clone(),
        )),
        pages: pages.clone(),
    };

    Harness {
        app: create_router(state, "/api/v1"),
        identities,
        summarizer,
        pages,
    }
}

fn free_key() -> IdentityRecord {
    IdentityRecord::new("test-key", Plan::Free, Utc::now())
}

struct Reply {
    status: StatusCode,
    cache: Option<String>,
    raw: Vec<u8>,
    body: Value,
}

async fn send(app: &Router, path: &str, key: Option<&str>, body: Value) -> Reply {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cache = response
        .headers()
        .get(CACHE_STATUS_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let raw = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    let body = serde_json::from_slice(&raw).unwrap_or(Value::Null);
    Reply {
        status,
        cache,
        raw,
        body,
    }
}

async fn post(app: &Router, path: &str, key: Option<&str>, body: Value) -> (StatusCode, Value) {
    let reply = send(app, path, key, body).await;
    (reply.status, reply.body)
}

#[tokio::test]
async fn health_check_is_public() {
    let h = harness(vec![], "", false);
    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_key_is_unauthorized() {
    let h = harness(vec![free_key()], "", false);
    let (status, body) = post(&h.app, "/api/v1/summarize/text", None, json!({"text": "hi"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_message"], "API Key required.");
}

#[tokio::test]
async fn unknown_key_is_forbidden() {
    let h = harness(vec![free_key()], "", false);
    let (status, _) = post(
        &h.app,
        "/api/v1/summarize/text",
        Some("someone-else"),
        json!({"text": "hi"}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn text_summary_is_served_from_cache_the_second_time() {
    let h = harness(vec![free_key()], "", false);
    let body = json!({"text": "rust makes systems programming pleasant", "length": "medium"});

    let first = send(&h.app, "/api/v1/summarize/text", Some("test-key"), body.clone()).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.cache.as_deref(), Some("miss"));
    assert_eq!(first.body["code"], 0);
    assert_eq!(first.body["content"]["summary"], "rust makes systems");
    assert_eq!(first.body["content"]["original_length"], 5);

    let second = send(&h.app, "/api/v1/summarize/text", Some("test-key"), body).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.cache.as_deref(), Some("hit"));
    assert_eq!(second.raw, first.raw);

    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 1);
    // 命中缓存仍然计入额度
    let record = h.identities.lookup("test-key").await.unwrap().unwrap();
    assert_eq!(record.requests_made, 2);
}

#[tokio::test]
async fn empty_text_is_a_bad_request_and_still_counted() {
    let h = harness(vec![free_key()], "", false);
    let (status, body) =
        post(&h.app, "/api/v1/summarize/text", Some("test-key"), json!({"text": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_message"], "Text is required.");
    let record = h.identities.lookup("test-key").await.unwrap().unwrap();
    assert_eq!(record.requests_made, 1);
}

#[tokio::test]
async fn exhausted_quota_is_too_many_requests() {
    let mut record = free_key();
    record.requests_made = 50;
    let h = harness(vec![record], "", false);
    let (status, body) =
        post(&h.app, "/api/v1/summarize/text", Some("test-key"), json!({"text": "hello"})).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error_message"], "Request limit exceeded.");
    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn generation_failure_is_a_generic_server_error() {
    let h = harness(vec![free_key()], "", true);
    let (status, body) =
        post(&h.app, "/api/v1/summarize/text", Some("test-key"), json!({"text": "hello"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error_message"], "Failed to generate summary.");
}

#[tokio::test]
async fn url_summary_skips_fetch_on_cache_hit() {
    let page = "word ".repeat(60);
    let h = harness(vec![free_key()], &page, false);
    let body = json!({"url": "https://Example.com/post#intro", "language": "fr"});

    let first = send(&h.app, "/api/v1/summarize/url", Some("test-key"), body).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.cache.as_deref(), Some("miss"));
    assert_eq!(first.body["content"]["url"], "https://example.com/post");
    assert_eq!(first.body["content"]["language"], "fr");
    assert_eq!(first.body["content"]["length"], "short");

    // 片段不同的同一页面命中同一缓存
    let second = send(
        &h.app,
        "/api/v1/summarize/url",
        Some("test-key"),
        json!({"url": "https://example.com/post", "language": "fr"}),
    )
    .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.cache.as_deref(), Some("hit"));
    assert_eq!(second.raw, first.raw);

    assert_eq!(h.pages.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn short_pages_are_rejected() {
    let h = harness(vec![free_key()], "too short", false);
    let (status, body) = post(
        &h.app,
        "/api/v1/summarize/url",
        Some("test-key"),
        json!({"url": "https://example.com/"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error_message"],
        "Extracted text is too short for summarization."
    );
    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_urls_are_rejected() {
    let h = harness(vec![free_key()], "", false);
    for url in ["", "not a url", "ftp://example.com/file"] {
        let (status, _) = post(
            &h.app,
            "/api/v1/summarize/url",
            Some("test-key"),
            json!({ "url": url }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "url {url:?}");
    }
    assert_eq!(h.pages.fetches.load(Ordering::SeqCst), 0);
}
