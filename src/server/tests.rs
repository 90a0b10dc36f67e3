// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use super::*;
use crate::discovery::{DiscoveredUnit, UnitClass};
use crate::engine::{Inputs, InvocationContext, UnitOutput};
use crate::errors::UnitError;
use crate::gateway::{GatewayCatalog, GatewayDecl, GatewayRouter, InlineGateway};
use crate::logs::{read_recent, LogWriter};
use crate::traits::{EntryPoint, Unit};
use crate::units::Echo;

struct Broken;

impl Unit for Broken {
    fn forward(&self, _ctx: &InvocationContext, _inputs: Inputs) -> Result<UnitOutput, UnitError> {
        Err(UnitError::Failed("boom".to_string()))
    }
}

fn broken_class() -> UnitClass {
    UnitClass::new("Broken", || Ok(Box::new(Broken) as Box<dyn Unit>))
}

struct Slow;

#[async_trait]
impl Unit for Slow {
    fn entry_point(&self) -> EntryPoint {
        EntryPoint::Async
    }

    async fn aforward(&self, _ctx: &InvocationContext, _inputs: Inputs) -> Result<UnitOutput, UnitError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(json!({ "done": true }).into())
    }
}

fn api(path: Option<&str>, requires_auth: bool) -> GatewayDecl {
    GatewayDecl::Inline(InlineGateway::Api {
        path: path.map(str::to_string),
        method: HttpMethod::Post,
        requires_auth,
    })
}

fn state_for(classes: Vec<UnitClass>, logs_dir: &Path) -> AppState {
    let registry =
        UnitRegistry::from_units(classes.into_iter().map(DiscoveredUnit::from_class)).unwrap();
    let plan = GatewayRouter::new(GatewayCatalog::with_builtins())
        .plan(&registry)
        .unwrap();
    AppState {
        engine: Arc::new(ExecutionEngine::new(logs_dir)),
        registry: Arc::new(registry),
        plan: Arc::new(plan),
        backends: Arc::new(BackendRegistry::new()),
        trace_max_depth: 100,
    }
}

fn default_state(logs_dir: &Path) -> AppState {
    state_for(
        vec![
            Echo::class(),
            broken_class(),
            Echo::class()
                .with_name("Guarded")
                .with_gateways(vec![api(None, true)]),
        ],
        logs_dir,
    )
}

async fn send(router: Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.unwrap()
}

fn post(path: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(default_state(dir.path())).unwrap();

    let live = send(router.clone(), get("/health/live")).await;
    assert_eq!(live.status(), StatusCode::OK);

    let ready = send(router, get("/health/ready")).await;
    assert_eq!(ready.status(), StatusCode::OK);
    assert_eq!(json_body(ready).await["programs"], json!(3));
}

#[tokio::test]
async fn test_ready_without_units_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(state_for(Vec::new(), dir.path())).unwrap();

    let response = send(router, get("/health/ready")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_programs_lists_units_and_routes() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(default_state(dir.path())).unwrap();

    let body = json_body(send(router, get("/programs")).await).await;
    let programs = body["programs"].as_array().unwrap();
    let names: Vec<&str> = programs.iter().filter_map(|p| p["name"].as_str()).collect();
    assert_eq!(names, vec!["Echo", "Broken", "Guarded"]);

    let echo = &programs[0];
    assert_eq!(echo["signature"], json!("text -> processed_text, length"));
    assert_eq!(echo["typed"], json!(true));
    assert_eq!(echo["stream"], json!("/Echo/stream"));
    assert_eq!(echo["routes"][0]["path"], json!("/Echo"));
    assert_eq!(
        echo["routes"][0]["request_schema"]["required"],
        json!(["text"])
    );

    assert_eq!(programs[1]["typed"], json!(false));
    assert_eq!(programs[2]["routes"][0]["path"], json!("/Guarded/Api"));
}

#[tokio::test]
async fn test_identity_route_invokes_unit() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(default_state(dir.path())).unwrap();

    let response = send(router, post("/Echo", r#"{"text": "hello"}"#)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"length": 5, "processed_text": "hello"})
    );
}

#[tokio::test]
async fn test_request_validation_failures() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(default_state(dir.path())).unwrap();

    let missing = send(router.clone(), post("/Echo", "{}")).await;
    assert_eq!(missing.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(missing).await;
    assert_eq!(body["detail"][0]["loc"], json!(["body", "text"]));
    assert_eq!(body["detail"][0]["type"], json!("missing"));

    let wrong_type = send(router.clone(), post("/Echo", r#"{"text": 3}"#)).await;
    assert_eq!(wrong_type.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let invalid = send(router.clone(), post("/Echo", "{not json")).await;
    assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(invalid).await["detail"][0]["type"], json!("json_invalid"));

    let not_object = send(router, post("/Echo", "[1, 2]")).await;
    assert_eq!(not_object.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unit_failure_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(default_state(dir.path())).unwrap();

    let response = send(router, post("/Broken", "")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let detail = json_body(response).await["detail"].as_str().unwrap().to_string();
    assert!(detail.contains("boom"), "{}", detail);
}

#[tokio::test]
async fn test_dropped_request_still_completes_and_logs() {
    let dir = tempfile::tempdir().unwrap();
    let writer = LogWriter::start().unwrap();
    let mut state = state_for(
        vec![UnitClass::new("Slow", || Ok(Box::new(Slow) as Box<dyn Unit>))],
        dir.path(),
    );
    state.engine = Arc::new(ExecutionEngine::new(dir.path()).with_log_writer(writer.clone()));
    let router = build_router(state).unwrap();

    let request = send(router, post("/Slow", "{}"));
    assert!(tokio::time::timeout(Duration::from_millis(20), request).await.is_err());

    tokio::time::sleep(Duration::from_millis(300)).await;
    writer.flush().await;
    let entries = read_recent(dir.path(), "Slow", 10);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["success"], json!(true));
    assert_eq!(entries[0]["outputs"], json!({"done": true}));
    writer.shutdown().await;
}

#[tokio::test]
async fn test_auth_required_route() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(default_state(dir.path())).unwrap();

    let denied = send(router.clone(), post("/Guarded/Api", r#"{"text": "x"}"#)).await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let mut request = post("/Guarded/Api", r#"{"text": "x"}"#);
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer token".parse().unwrap());
    let allowed = send(router, request).await;
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_recent_logs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("Echo.log"),
        "{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n",
    )
    .unwrap();
    let router = build_router(default_state(dir.path())).unwrap();

    let body = json_body(send(router.clone(), get("/api/logs/Echo?limit=2")).await).await;
    assert_eq!(body, json!({"count": 2, "logs": [{"n": 3}, {"n": 2}]}));

    let empty = json_body(send(router.clone(), get("/api/logs/Broken")).await).await;
    assert_eq!(empty["count"], json!(0));

    let unknown = send(router, get("/api/logs/Nobody")).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(default_state(dir.path())).unwrap();

    let response = send(router, post("/Nobody", "{}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_route_on_reserved_path_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_for(
        vec![Echo::class().with_gateways(vec![api(Some("/programs"), false)])],
        dir.path(),
    );

    let err = build_router(state).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Route path conflict: '/programs' is used by both server and Echo.Api"
    );
}

#[test]
fn test_route_on_logs_path_is_rejected() {
    for path in ["/api/logs/:unit", "/api/logs/:name"] {
        let dir = tempfile::tempdir().unwrap();
        let state = state_for(
            vec![Echo::class().with_gateways(vec![api(Some(path), false)])],
            dir.path(),
        );

        let err = build_router(state).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Route path conflict: '{}' is used by both server and Echo.Api", path)
        );
    }
}

#[test]
fn test_route_key_collapses_captures() {
    assert_eq!(route_key("/api/logs/:unit"), route_key("/api/logs/:name"));
    assert_eq!(route_key("/files/*rest"), "/files/*");
    assert_ne!(route_key("/api/logs/Echo"), route_key("/api/logs/:unit"));
}

#[tokio::test]
async fn test_stream_emits_start_events_and_complete() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(default_state(dir.path())).unwrap();

    let response = send(router, post("/Echo/stream", r#"{"text": "hi"}"#)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let events: Vec<Value> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();

    let kinds: Vec<&str> = events.iter().filter_map(|e| e["type"].as_str()).collect();
    assert_eq!(
        kinds,
        vec!["stream_start", "module_start", "module_end", "complete"]
    );

    let complete = events.last().unwrap();
    assert_eq!(complete["result"], json!({"length": 2, "processed_text": "hi"}));
    assert_eq!(complete["trace"]["span_count"], json!(1));
}

#[tokio::test]
async fn test_stream_reports_unit_failure() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(default_state(dir.path())).unwrap();

    let response = send(router, post("/Broken/stream", "{}")).await;
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let last: Value = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .last()
        .map(|data| serde_json::from_str(data).unwrap())
        .unwrap();

    assert_eq!(last["type"], json!("error"));
    assert!(last["error"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn test_stream_validates_request() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(default_state(dir.path())).unwrap();

    let response = send(router, post("/Echo/stream", "{}")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
