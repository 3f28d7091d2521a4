#![cfg(not(target_arch = "wasm32"))]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use skitgen::services::generator::{DirectClient, GenerationClient};
use skitgen::services::llm::LlmClient;
use skitgen::services::server::{router, GENERATE_PATH};

const SKIT: &str = "TITLE: The Lost Sheep\n\nCHARACTERS:\nCharacter 1: A shepherd\n\n---\n\nCHARACTER 1: Ninety-nine!";

#[derive(Debug, Default)]
struct StubLlm {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl LlmClient for StubLlm {
    async fn chat(&self, _system: &str, _user: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("Overloaded"));
        }
        Ok(SKIT.to_string())
    }
}

fn app_with(llm: Option<Arc<StubLlm>>) -> Router {
    let llm = llm.map(|l| l as Arc<dyn LlmClient>);
    let client: Arc<dyn GenerationClient> = Arc::new(DirectClient::new(llm));
    router(client, None)
}

fn post_json(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(GENERATE_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_generate_returns_script() {
    let llm = Arc::new(StubLlm::default());
    let app = app_with(Some(llm.clone()));

    let body = json!({"topic": "Luke 15", "tone": "humorous", "numPeople": 3}).to_string();
    let resp = app.oneshot(post_json(&body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await, json!({"script": SKIT}));
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_fields_rejected_without_upstream_call() {
    let llm = Arc::new(StubLlm::default());
    let app = app_with(Some(llm.clone()));

    let resp = app.oneshot(post_json(r#"{"topic": "Jonah"}"#)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = read_json(resp).await;
    assert_eq!(body["error"], "Missing required fields: tone, numPeople");
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_people_out_of_range() {
    let llm = Arc::new(StubLlm::default());
    let app = app_with(Some(llm.clone()));

    let body = json!({"topic": "Jonah", "tone": "dramatic", "numPeople": 11}).to_string();
    let resp = app.oneshot(post_json(&body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json(resp).await["error"],
        "Number of people must be between 2 and 10"
    );
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_body() {
    let app = app_with(Some(Arc::new(StubLlm::default())));

    let resp = app.oneshot(post_json("{not json")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error = read_json(resp).await["error"].as_str().unwrap_or_default().to_string();
    assert!(error.starts_with("Invalid request body"), "{}", error);
}

#[tokio::test]
async fn test_get_is_not_allowed() {
    let app = app_with(Some(Arc::new(StubLlm::default())));

    let req = Request::builder()
        .method(Method::GET)
        .uri(GENERATE_PATH)
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(read_json(resp).await, json!({"error": "Method not allowed"}));
}

#[tokio::test]
async fn test_missing_credential_is_server_error() {
    let app = app_with(None);

    let body = json!({"topic": "Jonah", "tone": "dramatic", "numPeople": 2}).to_string();
    let resp = app.oneshot(post_json(&body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_json(resp).await["error"],
        "Server configuration error: API key not set"
    );
}

#[tokio::test]
async fn test_upstream_failure_message_is_relayed() {
    let llm = Arc::new(StubLlm {
        fail: true,
        ..Default::default()
    });
    let app = app_with(Some(llm.clone()));

    let body = json!({"topic": "Jonah", "tone": "dramatic", "numPeople": 2}).to_string();
    let resp = app.oneshot(post_json(&body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(read_json(resp).await["error"], "Overloaded");
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_plain_options_lists_allowed_methods_and_headers() {
    let app = app_with(None);

    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri(GENERATE_PATH)
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    for method in ["GET", "OPTIONS", "PATCH", "DELETE", "POST", "PUT"] {
        assert!(methods.contains(method), "{} missing from {}", method, methods);
    }
    let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("content-type"));
    assert!(allowed.contains("x-csrf-token"));
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = app_with(None);

    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri(GENERATE_PATH)
        .header(header::ORIGIN, "https://example.org")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("POST"));
    let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("content-type"));
    assert!(allowed.contains("x-api-version"));
}

#[tokio::test]
async fn test_cors_header_on_success() {
    let app = app_with(Some(Arc::new(StubLlm::default())));

    let body = json!({"topic": "Ruth", "tone": "reverent", "numPeople": 2}).to_string();
    let mut req = post_json(&body);
    req.headers_mut()
        .insert(header::ORIGIN, "https://example.org".parse().unwrap());
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
