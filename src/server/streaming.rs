// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Live trace over Server-Sent Events.
//!
//! The stream opens with `stream_start`, relays every lifecycle event as the
//! invocation produces it, and closes with either `complete` (result plus the
//! assembled trace) or `error`. Idle periods carry a keepalive comment.

use axum::body::Bytes;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Map, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::consts::STREAM_KEEPALIVE_SECS;
use crate::discovery::DiscoveredUnit;
use crate::errors::InvocationError;
use crate::observability::messages::trace::TraceStreamOpened;
use crate::server::handlers::{parse_body, unprocessable};
use crate::server::AppState;
use crate::signature::StructuralType;
use crate::trace::{TraceBuilder, TraceEvent, TraceRecorder};
use crate::traits::ExecutionCallback;

pub(crate) async fn stream_unit(
    state: AppState,
    unit: Arc<DiscoveredUnit>,
    schema: Arc<StructuralType>,
    body: Bytes,
) -> Response {
    let payload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let inputs = match schema.validate(&payload) {
        Ok(inputs) => inputs,
        Err(violations) => return unprocessable(violations),
    };

    let (tx, rx) = mpsc::channel::<Event>(64);
    tokio::spawn(relay(state, unit, inputs, tx));

    let events = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok::<_, Infallible>(event), rx))
    });
    Sse::new(events)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(STREAM_KEEPALIVE_SECS))
                .text("keepalive"),
        )
        .into_response()
}

/// Run the invocation and forward its events until it finishes.
///
/// A client that disconnects stops the relay; the invocation itself runs to
/// completion.
async fn relay(
    state: AppState,
    unit: Arc<DiscoveredUnit>,
    inputs: Map<String, Value>,
    tx: mpsc::Sender<Event>,
) {
    let mut builder = TraceBuilder::new();
    tracing::debug!(
        "{}",
        TraceStreamOpened {
            unit: &unit.name,
            trace_id: builder.trace_id(),
        }
    );
    if tx.send(data(&json!({ "type": "stream_start", "timestamp": now() }))).await.is_err() {
        return;
    }

    let recorder = Arc::new(TraceRecorder::new(state.trace_max_depth));
    let mut events = recorder.subscribe();
    let callback: Arc<dyn ExecutionCallback> = recorder.clone();
    let mut invocation = {
        let engine = Arc::clone(&state.engine);
        let unit = Arc::clone(&unit);
        tokio::spawn(async move { engine.invoke(&unit, inputs, None, vec![callback]).await })
    };

    let joined = loop {
        tokio::select! {
            Some(event) = events.recv() => {
                if !forward(&tx, &mut builder, &event).await {
                    return;
                }
            }
            joined = &mut invocation => break joined,
        }
    };
    while let Ok(event) = events.try_recv() {
        if !forward(&tx, &mut builder, &event).await {
            return;
        }
    }

    let result: Result<Map<String, Value>, String> = match joined {
        Ok(result) => result.map_err(|e: InvocationError| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    let last = match result {
        Ok(output) => json!({
            "type": "complete",
            "result": output,
            "trace": builder.build(),
        }),
        Err(error) => json!({
            "type": "error",
            "error": error,
            "trace": builder.build(),
        }),
    };
    let _ = tx.send(data(&last)).await;
}

async fn forward(tx: &mpsc::Sender<Event>, builder: &mut TraceBuilder, event: &TraceEvent) -> bool {
    builder.add_event(event);
    match serde_json::to_value(event) {
        Ok(value) => tx.send(data(&value)).await.is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "dropping unserializable trace event");
            true
        }
    }
}

fn data(value: &Value) -> Event {
    Event::default().data(value.to_string())
}

fn now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
