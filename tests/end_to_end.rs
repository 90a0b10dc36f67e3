// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Discover the bundled units, plan routes, and drive them over HTTP and cron.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

use the_switchboard::backends::{BackendRegistry, ProviderCatalog};
use the_switchboard::config::{load_and_validate_config, Config};
use the_switchboard::discovery::{discover, UnitCatalog, UnitRegistry};
use the_switchboard::engine::{ExecutionEngine, WorkerPool};
use the_switchboard::gateway::{GatewayCatalog, GatewayRouter, RoutingPlan};
use the_switchboard::logs::{read_recent, LogWriter};
use the_switchboard::scheduler::{Scheduler, TriggerOutcome};
use the_switchboard::server::{build_router, AppState};

fn sample_config() -> Config {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("switchboard.yaml");
    load_and_validate_config(path).unwrap()
}

struct Harness {
    engine: Arc<ExecutionEngine>,
    registry: Arc<UnitRegistry>,
    plan: Arc<RoutingPlan>,
    backends: Arc<BackendRegistry>,
    writer: LogWriter,
}

fn harness(config: &Config, logs_dir: &std::path::Path) -> Harness {
    let registry = discover(&config.units_dir, &UnitCatalog::with_builtins()).unwrap();
    let plan = GatewayRouter::new(GatewayCatalog::with_builtins())
        .plan(&registry)
        .unwrap();
    let backends = Arc::new(BackendRegistry::from_config(
        &config.models,
        &config.program_models,
        &ProviderCatalog::with_builtins(),
    ));
    let writer = LogWriter::start().unwrap();
    let engine = Arc::new(
        ExecutionEngine::new(logs_dir)
            .with_pool(Arc::new(WorkerPool::new(4)))
            .with_backends(Arc::clone(&backends))
            .with_log_writer(writer.clone()),
    );
    Harness {
        engine,
        registry: Arc::new(registry),
        plan: Arc::new(plan),
        backends,
        writer,
    }
}

#[test]
fn test_discovery_and_plan_from_sample_manifests() {
    let config = sample_config();
    let logs = tempfile::tempdir().unwrap();
    let h = harness(&config, logs.path());

    assert_eq!(
        h.registry.names().collect::<Vec<_>>(),
        vec!["SummaryAndTags", "HeadlineGenerator", "ImageHeadliner", "Echo"]
    );

    let paths: Vec<&str> = h.plan.routes.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "/SummaryAndTags",
            "/blog/summarize",
            "/HeadlineGenerator",
            "/ImageHeadliner",
            "/Echo/Api"
        ]
    );
    assert_eq!(h.plan.cron_jobs.len(), 1);
    assert_eq!(h.plan.cron_jobs[0].unit.name, "HeadlineGenerator");

    assert_eq!(h.backends.alias_for("HeadlineGenerator"), Some("careful"));
    assert_eq!(h.backends.alias_for("SummaryAndTags"), Some("fast"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_http_invocation_is_served_and_logged() {
    let config = sample_config();
    let logs = tempfile::tempdir().unwrap();
    let h = harness(&config, logs.path());
    let router = build_router(AppState {
        engine: Arc::clone(&h.engine),
        registry: Arc::clone(&h.registry),
        plan: Arc::clone(&h.plan),
        backends: Arc::clone(&h.backends),
        trace_max_depth: config.tracing.max_depth,
    })
    .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/SummaryAndTags")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"blog_post": "Rust ownership explained", "summary_length": "short"}).to_string(),
        ))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["summary"].as_str().unwrap().starts_with("summary: "));
    assert!(body.get("tags").is_some());

    h.writer.flush().await;
    let entries = read_recent(logs.path(), "SummaryAndTags", 10);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["model"], json!("echo/fast"));
    assert_eq!(entries[0]["success"], json!(true));
    assert_eq!(entries[0]["lm_calls"].as_array().unwrap().len(), 2);

    let request = Request::builder()
        .uri("/api/logs/SummaryAndTags?limit=5")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["count"], json!(1));

    h.writer.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cron_gateway_runs_its_batch() {
    let config = sample_config();
    let logs = tempfile::tempdir().unwrap();
    let h = harness(&config, logs.path());
    let scheduler = Scheduler::with_jobs(Arc::clone(&h.engine), &h.plan.cron_jobs);
    assert_eq!(scheduler.job_count(), 1);

    let TriggerOutcome::Started(run) = scheduler.trigger("HeadlineGenerator") else {
        panic!("expected the job to start");
    };
    let report = run.await.unwrap();
    assert_eq!(report.items, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);

    h.writer.flush().await;
    let entries = read_recent(logs.path(), "HeadlineGenerator", 10);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["model"], json!("echo/careful"));
    assert!(entries[0]["inputs"].get("_source").is_none());

    assert!(matches!(scheduler.trigger("Nobody"), TriggerOutcome::UnknownJob));
    scheduler.shutdown().await;
    h.writer.shutdown().await;
}
