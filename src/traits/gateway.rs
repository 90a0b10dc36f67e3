// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Transport adapters binding a unit to the outside world.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{GatewayError, InvocationError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// On-demand (HTTP) gateway.
pub trait ApiGateway: Send + Sync {
    /// Type name, used in the default path and in conflict errors.
    fn type_name(&self) -> &str;

    /// Explicit path; `None` means the router derives one.
    fn path(&self) -> Option<&str> {
        None
    }

    fn method(&self) -> HttpMethod {
        HttpMethod::Post
    }

    fn requires_auth(&self) -> bool {
        false
    }

    /// Pass-through gateways expose the unit's contract directly on the wire.
    fn is_identity(&self) -> bool {
        false
    }

    fn to_unit_inputs(&self, request: Value) -> Result<Map<String, Value>, GatewayError> {
        match request {
            Value::Object(map) => Ok(map),
            _ => Err(GatewayError::NotAnObject),
        }
    }

    fn from_unit_output(&self, output: Map<String, Value>) -> Value {
        Value::Object(output)
    }
}

/// Time-triggered gateway driven by a cron schedule.
#[async_trait]
pub trait CronGateway: Send + Sync {
    fn type_name(&self) -> &str;

    /// Standard 5-field cron expression.
    fn schedule(&self) -> &str;

    async fn fetch_inputs(&self) -> Result<Vec<Map<String, Value>>, GatewayError>;

    /// Called with the original item (metadata keys included) and the unit's output.
    async fn on_complete(
        &self,
        inputs: &Map<String, Value>,
        output: &Map<String, Value>,
    ) -> Result<(), GatewayError>;

    async fn on_error(&self, _inputs: &Map<String, Value>, _error: &InvocationError) {}
}
