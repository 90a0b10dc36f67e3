// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! HTTP transport.
//!
//! | method | path                   | purpose                                  |
//! |--------|------------------------|------------------------------------------|
//! | GET    | `/health/live`         | liveness probe                           |
//! | GET    | `/health/ready`        | readiness probe (503 until units exist)  |
//! | GET    | `/programs`            | units, routes and request/response schemas |
//! | GET    | `/api/logs/{unit}`     | most recent log entries, `?limit=N`      |
//! | POST   | `/{unit}/stream`       | invoke with a live SSE trace             |
//! | varies | routing plan paths     | on-demand gateway routes                 |

mod handlers;
mod streaming;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, on, post, MethodFilter};
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;

use crate::backends::BackendRegistry;
use crate::discovery::UnitRegistry;
use crate::engine::ExecutionEngine;
use crate::errors::RoutingError;
use crate::gateway::RoutingPlan;
use crate::signature::StructuralType;
use crate::traits::HttpMethod;

const RESERVED_PATHS: [&str; 4] = [
    "/health/live",
    "/health/ready",
    "/programs",
    "/api/logs/:unit",
];

/// Shared, read-only server state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ExecutionEngine>,
    pub registry: Arc<UnitRegistry>,
    pub plan: Arc<RoutingPlan>,
    pub backends: Arc<BackendRegistry>,
    pub trace_max_depth: usize,
}

/// Build the router for a routing plan.
///
/// Fails if a gateway route lands on a built-in path or on a unit's stream
/// path.
pub fn build_router(state: AppState) -> Result<Router, RoutingError> {
    let mut owners: HashMap<String, String> = RESERVED_PATHS
        .iter()
        .map(|path| (route_key(path), "server".to_string()))
        .collect();
    let mut claim = |path: &str, owner: String| -> Result<(), RoutingError> {
        let key = route_key(path);
        if let Some(first) = owners.get(&key) {
            return Err(RoutingError::PathConflict {
                path: path.to_string(),
                first: first.clone(),
                second: owner,
            });
        }
        owners.insert(key, owner);
        Ok(())
    };

    let mut router = Router::new()
        .route("/health/live", get(handlers::live))
        .route("/health/ready", get(handlers::ready))
        .route("/programs", get(handlers::programs))
        .route("/api/logs/:unit", get(handlers::recent_logs));

    for binding in &state.plan.routes {
        claim(&binding.path, binding.owner())?;
        let path = binding.path.clone();
        let binding = Arc::new(binding.clone());
        router = router.route(
            &path,
            on(
                method_filter(binding.method),
                move |State(state): State<AppState>, headers: HeaderMap, body: Bytes| {
                    handlers::invoke_route(state, Arc::clone(&binding), headers, body)
                },
            ),
        );
    }

    for unit in state.registry.iter() {
        let path = format!("/{}/stream", unit.name);
        claim(&path, format!("{}.Stream", unit.name))?;
        let schema = Arc::new(stream_schema(&state.plan, &unit.name));
        let unit = Arc::clone(unit);
        router = router.route(
            &path,
            post(move |State(state): State<AppState>, body: Bytes| {
                streaming::stream_unit(state, Arc::clone(&unit), Arc::clone(&schema), body)
            }),
        );
    }

    Ok(router.fallback(handlers::not_found).with_state(state))
}

/// A path with every capture segment collapsed, so `/a/:x` and `/a/:y` collide.
fn route_key(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.chars().next() {
            Some(':') => ":",
            Some('*') => "*",
            _ => segment,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// The unit's identity request schema, or an open one if it has no identity route.
fn stream_schema(plan: &RoutingPlan, unit: &str) -> StructuralType {
    plan.routes
        .iter()
        .find(|route| route.unit.name == unit && route.gateway.is_identity())
        .map(|route| route.request_schema.clone())
        .unwrap_or_else(|| StructuralType::open(format!("{}Request", unit)))
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Patch => MethodFilter::PATCH,
        HttpMethod::Delete => MethodFilter::DELETE,
    }
}

#[cfg(test)]
mod tests;
