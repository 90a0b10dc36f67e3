// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Hierarchical trace reconstruction.
//!
//! [`TraceBuilder`] is a pure state machine over [`TraceEvent`]s. It accepts
//! events in any order: an end without a start creates a stub span, a child
//! seen before its parent is attached once the parent arrives, and spans
//! whose parent never arrives are promoted to roots by [`TraceBuilder::build`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::trace::{TokenUsage, TraceEvent};
use crate::traits::CallKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Module,
    Lm,
    Tool,
    Adapter,
    /// Span known only from its end event.
    Unknown,
}

impl From<CallKind> for SpanKind {
    fn from(kind: CallKind) -> Self {
        match kind {
            CallKind::Module => SpanKind::Module,
            CallKind::Lm => SpanKind::Lm,
            CallKind::Tool => SpanKind::Tool,
            CallKind::AdapterFormat | CallKind::AdapterParse => SpanKind::Adapter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub call_id: String,
    pub parent_call_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    pub name: String,
    pub depth: usize,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub duration_ms: Option<f64>,
    pub inputs: Option<Value>,
    pub outputs: Option<Value>,
    pub token_usage: Option<TokenUsage>,
    pub success: Option<bool>,
    pub error: Option<String>,
    pub children: Vec<String>,
}

impl Span {
    fn stub(call_id: &str) -> Self {
        Self {
            call_id: call_id.to_string(),
            parent_call_id: None,
            kind: SpanKind::Unknown,
            name: "Unknown".to_string(),
            depth: 0,
            start_time: None,
            end_time: None,
            duration_ms: None,
            inputs: None,
            outputs: None,
            token_usage: None,
            success: None,
            error: None,
            children: Vec::new(),
        }
    }

    pub fn is_stub(&self) -> bool {
        self.kind == SpanKind::Unknown
    }
}

/// A finished, serializable execution tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: String,
    pub root_call_ids: Vec<String>,
    pub spans: Vec<Span>,
    pub token_usage: Option<TokenUsage>,
    pub span_count: usize,
}

impl Trace {
    pub fn span(&self, call_id: &str) -> Option<&Span> {
        self.spans.iter().find(|span| span.call_id == call_id)
    }

    pub fn roots(&self) -> impl Iterator<Item = &Span> {
        self.root_call_ids.iter().filter_map(|id| self.span(id))
    }
}

pub struct TraceBuilder {
    trace_id: String,
    spans: IndexMap<String, Span>,
    roots: Vec<String>,
    waiting_for_parent: HashMap<String, Vec<String>>,
    event_count: usize,
}

impl TraceBuilder {
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            spans: IndexMap::new(),
            roots: Vec::new(),
            waiting_for_parent: HashMap::new(),
            event_count: 0,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn event_count(&self) -> usize {
        self.event_count
    }

    pub fn add_event(&mut self, event: &TraceEvent) {
        self.event_count += 1;
        if event.call_id.is_empty() {
            return;
        }
        if event.kind.is_start() {
            self.handle_start(event);
        } else {
            self.handle_end(event);
        }
    }

    fn handle_start(&mut self, event: &TraceEvent) {
        let kind = event.kind.call_kind();
        let raw_name = event.name.as_deref().unwrap_or("unknown");
        let name = match kind {
            CallKind::Module => raw_name.to_string(),
            CallKind::Lm => format!("LM({})", raw_name),
            CallKind::Tool => format!("Tool({})", raw_name),
            CallKind::AdapterFormat => format!("Adapter.format({})", raw_name),
            CallKind::AdapterParse => format!("Adapter.parse({})", raw_name),
        };

        let span = self
            .spans
            .entry(event.call_id.clone())
            .or_insert_with(|| Span::stub(&event.call_id));
        span.kind = SpanKind::from(kind);
        span.name = name;
        let previous_parent =
            std::mem::replace(&mut span.parent_call_id, event.parent_call_id.clone());
        span.depth = event.depth.unwrap_or(0);
        span.start_time = Some(event.timestamp);
        span.inputs = event.inputs.clone();

        if let Some(waiting) = self.waiting_for_parent.remove(&event.call_id) {
            for child in waiting {
                push_unique(&mut span.children, &child);
            }
        }

        // A repeated start that moves the call detaches it from its old parent.
        if previous_parent != event.parent_call_id {
            match &previous_parent {
                None => self.roots.retain(|id| id != &event.call_id),
                Some(old) => {
                    if let Some(parent) = self.spans.get_mut(old) {
                        parent.children.retain(|id| id != &event.call_id);
                    }
                    if let Some(waiting) = self.waiting_for_parent.get_mut(old) {
                        waiting.retain(|id| id != &event.call_id);
                    }
                }
            }
        }

        match &event.parent_call_id {
            None => push_unique(&mut self.roots, &event.call_id),
            Some(parent_id) => match self.spans.get_mut(parent_id) {
                Some(parent) => push_unique(&mut parent.children, &event.call_id),
                None => push_unique(
                    self.waiting_for_parent.entry(parent_id.clone()).or_default(),
                    &event.call_id,
                ),
            },
        }
    }

    fn handle_end(&mut self, event: &TraceEvent) {
        let span = self
            .spans
            .entry(event.call_id.clone())
            .or_insert_with(|| Span::stub(&event.call_id));
        span.end_time = Some(event.timestamp);
        span.duration_ms = event
            .duration_ms
            .or_else(|| span.start_time.map(|start| ((event.timestamp - start) * 1000.0).max(0.0)));
        span.outputs = event.outputs.clone();
        span.success = event.success;
        span.error = event.error.clone();
        if event.token_usage.is_some() {
            span.token_usage = event.token_usage.clone();
        }
    }

    /// Snapshot the current state as a [`Trace`] with usage rolled up.
    pub fn build(&self) -> Trace {
        let mut spans = self.spans.clone();

        let mut root_call_ids = self.roots.clone();
        for (call_id, span) in &spans {
            let orphaned = match &span.parent_call_id {
                None => true,
                Some(parent) => !spans.contains_key(parent),
            };
            if orphaned && !root_call_ids.contains(call_id) {
                root_call_ids.push(call_id.clone());
            }
        }

        let mut rolled = HashMap::new();
        let mut visiting = HashSet::new();
        let mut total = TokenUsage::default();
        for root in &root_call_ids {
            total.add(&rollup(root, &spans, &mut rolled, &mut visiting));
        }
        for (call_id, span) in spans.iter_mut() {
            if let Some(usage) = rolled.get(call_id).filter(|usage| !usage.is_empty()) {
                span.token_usage = Some(usage.clone());
            }
        }

        let span_count = spans.len();
        Trace {
            trace_id: self.trace_id.clone(),
            root_call_ids,
            spans: spans.into_values().collect(),
            token_usage: (!total.is_empty()).then_some(total),
            span_count,
        }
    }
}

impl Default for TraceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn push_unique(ids: &mut Vec<String>, id: &str) {
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
    }
}

/// Model-call spans contribute their own usage; every other span sums its
/// children, or keeps its reported usage when its children carry none.
fn rollup(
    call_id: &str,
    spans: &IndexMap<String, Span>,
    rolled: &mut HashMap<String, TokenUsage>,
    visiting: &mut HashSet<String>,
) -> TokenUsage {
    if let Some(done) = rolled.get(call_id) {
        return done.clone();
    }
    let Some(span) = spans.get(call_id) else {
        return TokenUsage::default();
    };
    if !visiting.insert(call_id.to_string()) {
        return TokenUsage::default();
    }

    let usage = if span.kind == SpanKind::Lm {
        span.token_usage.clone().unwrap_or_default()
    } else {
        let from_children: TokenUsage = span
            .children
            .iter()
            .map(|child| rollup(child, spans, rolled, visiting))
            .collect::<Vec<_>>()
            .iter()
            .sum();
        if from_children.is_empty() {
            span.token_usage.clone().unwrap_or_default()
        } else {
            from_children
        }
    };

    rolled.insert(call_id.to_string(), usage.clone());
    usage
}
