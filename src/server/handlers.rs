// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::consts::{DEFAULT_RECENT_LOG_LIMIT, MAX_RECENT_LOG_LIMIT};
use crate::gateway::RouteBinding;
use crate::logs::read_recent;
use crate::server::AppState;
use crate::signature::SchemaViolation;

pub(crate) async fn live() -> Json<Value> {
    Json(json!({ "status": "alive" }))
}

pub(crate) async fn ready(State(state): State<AppState>) -> Response {
    if state.registry.is_empty() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "reason": "no units discovered" })),
        )
            .into_response();
    }
    Json(json!({ "status": "ready", "programs": state.registry.len() })).into_response()
}

pub(crate) async fn programs(State(state): State<AppState>) -> Json<Value> {
    let programs: Vec<Value> = state
        .registry
        .iter()
        .map(|unit| {
            let routes: Vec<&RouteBinding> = state
                .plan
                .routes
                .iter()
                .filter(|route| route.unit.name == unit.name)
                .collect();
            let endpoint = routes
                .iter()
                .find(|route| route.gateway.is_identity())
                .or(routes.first())
                .map(|route| route.path.clone());
            let schedules: Vec<&str> = state
                .plan
                .cron_jobs
                .iter()
                .filter(|job| job.unit.name == unit.name)
                .map(|job| job.gateway.schedule())
                .collect();

            json!({
                "name": unit.name,
                "model": state.backends.alias_for(&unit.name),
                "endpoint": endpoint,
                "signature": unit.signature_string,
                "strategy": unit.strategy,
                "typed": unit.is_typed(),
                "routes": routes.iter().map(|route| json!({
                    "method": route.method.as_str(),
                    "path": route.path,
                    "gateway": route.gateway.type_name(),
                    "requires_auth": route.gateway.requires_auth(),
                    "request_schema": route.request_schema.json_schema(),
                    "response_schema": route.response_schema.json_schema(),
                })).collect::<Vec<_>>(),
                "schedules": schedules,
                "stream": format!("/{}/stream", unit.name),
            })
        })
        .collect();

    Json(json!({ "programs": programs }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct LogsQuery {
    limit: Option<usize>,
}

pub(crate) async fn recent_logs(
    State(state): State<AppState>,
    Path(unit): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Response {
    if state.registry.get(&unit).is_none() {
        return detail(StatusCode::NOT_FOUND, format!("Program '{}' not found", unit));
    }
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LOG_LIMIT)
        .min(MAX_RECENT_LOG_LIMIT);
    let dir = state.engine.logs_dir().to_path_buf();

    match tokio::task::spawn_blocking(move || read_recent(&dir, &unit, limit)).await {
        Ok(logs) => Json(json!({ "count": logs.len(), "logs": logs })).into_response(),
        Err(e) => detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Serve one on-demand route: transform, validate, invoke, transform back.
pub(crate) async fn invoke_route(
    state: AppState,
    binding: Arc<RouteBinding>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if binding.gateway.requires_auth() && !headers.contains_key(header::AUTHORIZATION) {
        return detail(StatusCode::UNAUTHORIZED, "Authorization header required");
    }

    let payload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let inputs = match binding.gateway.to_unit_inputs(payload) {
        Ok(inputs) => inputs,
        Err(e) => return detail(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    };
    let inputs = match binding.request_schema.validate(&Value::Object(inputs)) {
        Ok(inputs) => inputs,
        Err(violations) => return unprocessable(violations),
    };

    // A dropped connection must not cancel the call or its log entry.
    let invocation = {
        let engine = Arc::clone(&state.engine);
        let unit = Arc::clone(&binding.unit);
        tokio::spawn(async move { engine.invoke(&unit, inputs, None, Vec::new()).await })
    };

    match invocation.await {
        Ok(Ok(output)) => Json(binding.gateway.from_unit_output(output)).into_response(),
        Ok(Err(e)) => detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        Err(e) => detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub(crate) async fn not_found(uri: Uri) -> Response {
    detail(StatusCode::NOT_FOUND, format!("No route for '{}'", uri.path()))
}

/// Request body as JSON; an empty body is an empty object.
pub(crate) fn parse_body(body: &Bytes) -> Result<Value, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| {
        unprocessable(vec![SchemaViolation {
            loc: vec!["body".to_string()],
            msg: format!("JSON decode error: {}", e),
            kind: "json_invalid",
        }])
    })
}

pub(crate) fn unprocessable(violations: Vec<SchemaViolation>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "detail": violations })),
    )
        .into_response()
}

pub(crate) fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}
