// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Live event sink for a single invocation.
//!
//! The recorder keeps a call stack to assign parents and depths, measures
//! durations from matched starts, and rolls model-call usage up into every
//! enclosing call. Each resulting [`TraceEvent`] is fanned out to all current
//! subscribers.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::config::consts::DEFAULT_TRACE_MAX_DEPTH;
use crate::observability::messages::trace::{TraceDepthExceeded, UnmatchedCallEnd};
use crate::observability::messages::StructuredLog;
use crate::trace::{TokenUsage, TraceEvent};
use crate::traits::{CallEnd, CallKind, CallStart, ExecutionCallback};

pub struct TraceRecorder {
    max_depth: usize,
    state: Mutex<RecorderState>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<TraceEvent>>>,
}

#[derive(Default)]
struct RecorderState {
    stack: Vec<String>,
    started: HashMap<String, Instant>,
    rejected: HashSet<String>,
    usage: HashMap<String, TokenUsage>,
}

impl TraceRecorder {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            state: Mutex::new(RecorderState::default()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Receive every event recorded after this call.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<TraceEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);
        rx
    }

    fn publish(&self, event: TraceEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for TraceRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_TRACE_MAX_DEPTH)
    }
}

impl ExecutionCallback for TraceRecorder {
    fn on_start(&self, call: CallStart<'_>) {
        let event = {
            let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let depth = state.stack.len();
            if depth > self.max_depth {
                TraceDepthExceeded {
                    call_id: call.call_id,
                    depth,
                    max_depth: self.max_depth,
                }
                .log();
                state.rejected.insert(call.call_id.to_string());
                return;
            }

            let parent = state.stack.last().cloned();
            state.stack.push(call.call_id.to_string());
            state.started.insert(call.call_id.to_string(), Instant::now());
            TraceEvent::started(call.kind, call.call_id, parent, depth, call.name, call.inputs.clone())
        };
        self.publish(event);
    }

    fn on_end(&self, call: CallEnd<'_>) {
        let event = {
            let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

            if let Some(usage) = call.usage {
                for ancestor in state.stack.clone() {
                    if ancestor != call.call_id {
                        state.usage.entry(ancestor).or_default().add(usage);
                    }
                }
            }

            if state.rejected.remove(call.call_id) {
                return;
            }

            let mut event = TraceEvent::ended(call.kind, call.call_id);
            match state.started.remove(call.call_id) {
                Some(started) => {
                    event.duration_ms = Some(started.elapsed().as_secs_f64() * 1000.0);
                }
                None => UnmatchedCallEnd {
                    call_id: call.call_id,
                }
                .log(),
            }
            if let Some(position) = state.stack.iter().rposition(|id| id == call.call_id) {
                state.stack.remove(position);
            }

            event.outputs = call.outputs.cloned();
            event.success = Some(call.error.is_none());
            event.error = call.error.map(str::to_string);

            let aggregated = state.usage.remove(call.call_id);
            event.token_usage = match call.kind {
                CallKind::Lm => call.usage.cloned(),
                _ => aggregated.filter(|usage| !usage.is_empty()),
            };
            event
        };
        self.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::EventKind;
    use serde_json::{json, Value};

    fn start(recorder: &TraceRecorder, id: &str, kind: CallKind, name: &str) {
        recorder.on_start(CallStart {
            call_id: id,
            kind,
            name,
            inputs: &Value::Null,
        });
    }

    fn end(recorder: &TraceRecorder, id: &str, kind: CallKind, usage: Option<&TokenUsage>) {
        recorder.on_end(CallEnd {
            call_id: id,
            kind,
            outputs: Some(&json!({"ok": true})),
            error: None,
            usage,
        });
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<TraceEvent>) -> Vec<TraceEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_parents_depths_and_usage_rollup() {
        let recorder = TraceRecorder::new(10);
        let mut rx = recorder.subscribe();
        let usage = TokenUsage::for_model("echo/test", 7, 3);

        start(&recorder, "m", CallKind::Module, "Summarize");
        start(&recorder, "p", CallKind::Module, "Predict");
        start(&recorder, "lm", CallKind::Lm, "echo/test");
        end(&recorder, "lm", CallKind::Lm, Some(&usage));
        end(&recorder, "p", CallKind::Module, None);
        end(&recorder, "m", CallKind::Module, None);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 6);
        assert_eq!(events[0].parent_call_id, None);
        assert_eq!(events[1].parent_call_id.as_deref(), Some("m"));
        assert_eq!(events[2].parent_call_id.as_deref(), Some("p"));
        assert_eq!(events[2].depth, Some(2));

        assert_eq!(events[3].kind, EventKind::LmEnd);
        assert_eq!(events[3].token_usage.as_ref(), Some(&usage));
        assert_eq!(events[4].token_usage.as_ref().map(TokenUsage::total), Some(10));
        assert_eq!(events[5].token_usage.as_ref().map(TokenUsage::total), Some(10));
        assert!(events[5].duration_ms.unwrap() >= 0.0);
    }

    #[test]
    fn test_depth_guard_rejects_deep_calls() {
        let recorder = TraceRecorder::new(1);
        let mut rx = recorder.subscribe();

        start(&recorder, "a", CallKind::Module, "A");
        start(&recorder, "b", CallKind::Module, "B");
        start(&recorder, "c", CallKind::Tool, "deep");
        end(&recorder, "c", CallKind::Tool, None);
        end(&recorder, "b", CallKind::Module, None);
        end(&recorder, "a", CallKind::Module, None);

        let ids: Vec<_> = drain(&mut rx).into_iter().map(|e| e.call_id).collect();
        assert_eq!(ids, vec!["a", "b", "b", "a"]);
    }

    #[test]
    fn test_end_without_start_is_published_without_duration() {
        let recorder = TraceRecorder::default();
        let mut rx = recorder.subscribe();

        end(&recorder, "ghost", CallKind::Tool, None);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration_ms, None);
    }

    #[test]
    fn test_fan_out_and_closed_subscribers() {
        let recorder = TraceRecorder::default();
        let mut first = recorder.subscribe();
        let second = recorder.subscribe();
        drop(second);

        start(&recorder, "m", CallKind::Module, "M");
        assert_eq!(drain(&mut first).len(), 1);
        assert_eq!(recorder.subscribers.lock().unwrap().len(), 1);
    }
}
