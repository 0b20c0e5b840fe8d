//! Outcome classification of single-shot probes against mock servers.

mod common;

use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use probe_core::{ProbeOutcome, ProbeRequest, ProcessProbe, RerankRequest};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_success_keeps_json_body_intact() {
    let ranking = json!([
        {"index": 0, "score": 0.9876, "text": "Deep learning is a subset of machine learning."},
        {"index": 3, "score": 0.5012, "text": "Neural networks are computational models."}
    ]);
    let response = ranking.clone();
    let app = Router::new().route("/rerank", post(move || async move { Json(response) }));
    let addr = common::spawn_server(app).await;

    let request = RerankRequest::sample()
        .to_probe_request(&format!("http://{}", addr))
        .unwrap();
    let result = ProcessProbe::new().unwrap().probe(&request, TIMEOUT).await;

    assert_eq!(result.outcome, ProbeOutcome::Success);
    assert_eq!(result.status, Some(200));
    assert_eq!(result.body, Some(ranking));
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_request_body_and_headers_reach_server() {
    async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let probe = headers
            .get("x-probe")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Json(json!({"content_type": content_type, "probe": probe, "received": body}))
    }
    let addr = common::spawn_server(Router::new().route("/rerank", post(echo))).await;

    let request = RerankRequest::sample()
        .to_probe_request(&format!("http://{}", addr))
        .unwrap()
        .with_header("X-Probe", "smoke");
    let result = ProcessProbe::new().unwrap().probe(&request, TIMEOUT).await;

    assert_eq!(result.outcome, ProbeOutcome::Success);
    let body = result.body.unwrap();
    assert_eq!(body["content_type"], "application/json");
    assert_eq!(body["probe"], "smoke");
    assert_eq!(body["received"], serde_json::to_value(RerankRequest::sample()).unwrap());
}

#[tokio::test]
async fn test_server_error_is_http_failure() {
    let app = Router::new().route(
        "/rerank",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model exploded") }),
    );
    let addr = common::spawn_server(app).await;

    let request = ProbeRequest::post_json(format!("http://{}/rerank", addr), &json!({})).unwrap();
    let result = ProcessProbe::new().unwrap().probe(&request, TIMEOUT).await;

    assert_eq!(result.outcome, ProbeOutcome::HttpFailure);
    assert_eq!(result.status, Some(500));
    assert_eq!(result.raw_body.as_deref(), Some("model exploded"));
    assert!(result.body.is_none());
}

#[tokio::test]
async fn test_not_found_is_http_failure() {
    let addr = common::spawn_server(Router::new()).await;

    let request = ProbeRequest::get(format!("http://{}/missing", addr));
    let result = ProcessProbe::new().unwrap().probe(&request, TIMEOUT).await;

    assert_eq!(result.outcome, ProbeOutcome::HttpFailure);
    assert_eq!(result.status, Some(404));
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new()
        .route(
            "/rerank",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, "/other")])
                }
            }),
        )
        .route("/other", post(|| async { Json(json!([{"score": 1.0}])) }));
    let addr = common::spawn_server(app).await;

    let request = RerankRequest::sample()
        .to_probe_request(&format!("http://{}", addr))
        .unwrap();
    let result = ProcessProbe::new().unwrap().probe(&request, TIMEOUT).await;

    assert_eq!(result.outcome, ProbeOutcome::HttpFailure);
    assert_eq!(result.status, Some(307));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_success_status_with_non_json_body_is_http_failure() {
    let app = Router::new().route("/health", get(|| async { "ok" }));
    let addr = common::spawn_server(app).await;

    let request = ProbeRequest::get(format!("http://{}/health", addr));
    let result = ProcessProbe::new().unwrap().probe(&request, TIMEOUT).await;

    assert_eq!(result.outcome, ProbeOutcome::HttpFailure);
    assert_eq!(result.status, Some(200));
    assert_eq!(result.raw_body.as_deref(), Some("ok"));
    assert!(result.error.unwrap().contains("not valid JSON"));
}

#[tokio::test]
async fn test_unreachable_port_is_transport_error() {
    let addr = common::closed_addr();

    let request = ProbeRequest::post_json(format!("http://{}/rerank", addr), &json!({})).unwrap();
    let result = ProcessProbe::new().unwrap().probe(&request, TIMEOUT).await;

    assert_eq!(result.outcome, ProbeOutcome::TransportError);
    assert!(result.status.is_none());
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_unresolvable_host_is_transport_error() {
    let request = ProbeRequest::get("http://does-not-exist.invalid/health");
    let result = ProcessProbe::new().unwrap().probe(&request, TIMEOUT).await;

    assert_eq!(result.outcome, ProbeOutcome::TransportError);
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let addr = common::spawn_silent_server().await;

    let request = ProbeRequest::post_json(format!("http://{}/rerank", addr), &json!({})).unwrap();
    let started = Instant::now();
    let result = ProcessProbe::new()
        .unwrap()
        .probe(&request, Duration::from_secs(1))
        .await;
    let elapsed = started.elapsed();

    assert_eq!(result.outcome, ProbeOutcome::Timeout);
    assert!(elapsed >= Duration::from_millis(900), "returned too early: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "returned too late: {:?}", elapsed);
}
