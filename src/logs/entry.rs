// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::trace::TokenUsage;

/// One model call made during an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LmCallRecord {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    pub duration_ms: f64,
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTokens {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl From<&TokenUsage> for LogTokens {
    fn from(usage: &TokenUsage) -> Self {
        Self {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage.total(),
        }
    }
}

/// Append-only record of one invocation, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub program: String,
    pub model: String,
    pub duration_ms: f64,
    pub inputs: Value,
    pub outputs: Value,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<LogTokens>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lm_calls: Vec<LmCallRecord>,
}

impl LogEntry {
    pub fn new(program: &str, model: &str, duration_ms: f64, inputs: Value) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            program: program.to_string(),
            model: model.to_string(),
            duration_ms: round_to(duration_ms, 2),
            inputs,
            outputs: Value::Object(Default::default()),
            success: true,
            error: None,
            tokens: None,
            cost_usd: None,
            lm_calls: Vec::new(),
        }
    }

    pub fn succeeded(mut self, outputs: Value) -> Self {
        self.outputs = outputs;
        self.success = true;
        self.error = None;
        self
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    /// Attach usage; empty usage is omitted from the record.
    pub fn with_usage(mut self, usage: &TokenUsage) -> Self {
        if !usage.is_empty() {
            self.tokens = Some(LogTokens::from(usage));
        }
        self
    }

    pub fn with_cost(mut self, cost_usd: Option<f64>) -> Self {
        self.cost_usd = cost_usd.map(|c| round_to(c, 8));
        self
    }

    pub fn with_lm_calls(mut self, lm_calls: Vec<LmCallRecord>) -> Self {
        self.lm_calls = lm_calls;
        self
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rounding_and_optional_fields() {
        let entry = LogEntry::new("Summarize", "openai/gpt-4o-mini", 12.34567, json!({"text": "hi"}))
            .succeeded(json!({"summary": "hi"}))
            .with_cost(Some(0.000_000_123_456))
            .with_usage(&TokenUsage::default());

        assert_eq!(entry.duration_ms, 12.35);
        assert_eq!(entry.cost_usd, Some(0.00000012));
        assert!(entry.tokens.is_none());

        let line = serde_json::to_value(&entry).unwrap();
        assert!(line.get("error").is_none());
        assert!(line.get("lm_calls").is_none());
        assert_eq!(line["success"], json!(true));
        assert!(line["timestamp"].as_str().unwrap().ends_with("+00:00"));
    }

    #[test]
    fn test_failed_entry_records_error_and_tokens() {
        let entry = LogEntry::new("Summarize", "m", 1.0, json!({}))
            .failed("boom")
            .with_usage(&TokenUsage::for_model("m", 7, 3));

        assert!(!entry.success);
        assert_eq!(entry.error.as_deref(), Some("boom"));
        assert_eq!(
            entry.tokens,
            Some(LogTokens {
                prompt_tokens: 7,
                completion_tokens: 3,
                total_tokens: 10
            })
        );
    }
}
