// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Mutex;

use crate::errors::GatewayError;
use crate::traits::{ApiGateway, CronGateway, HttpMethod};

/// Pass-through gateway: the request body is the unit's input, unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityGateway;

impl ApiGateway for IdentityGateway {
    fn type_name(&self) -> &str {
        "Identity"
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// Inline `type: api` gateway from a manifest.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredApiGateway {
    path: Option<String>,
    method: HttpMethod,
    requires_auth: bool,
}

impl ConfiguredApiGateway {
    pub fn new(path: Option<String>, method: HttpMethod, requires_auth: bool) -> Self {
        Self {
            path,
            method,
            requires_auth,
        }
    }
}

impl ApiGateway for ConfiguredApiGateway {
    fn type_name(&self) -> &str {
        "Api"
    }

    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn method(&self) -> HttpMethod {
        self.method
    }

    fn requires_auth(&self) -> bool {
        self.requires_auth
    }
}

/// Inline `type: cron` gateway that feeds a fixed list of items on every run
/// and keeps the results of the most recent run.
#[derive(Debug, Default)]
pub struct StaticCronGateway {
    schedule: String,
    items: Vec<Map<String, Value>>,
    results: Mutex<Vec<Map<String, Value>>>,
}

impl StaticCronGateway {
    pub fn new(schedule: impl Into<String>, items: Vec<Map<String, Value>>) -> Self {
        Self {
            schedule: schedule.into(),
            items,
            results: Mutex::new(Vec::new()),
        }
    }

    pub fn results(&self) -> Vec<Map<String, Value>> {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl CronGateway for StaticCronGateway {
    fn type_name(&self) -> &str {
        "Cron"
    }

    fn schedule(&self) -> &str {
        &self.schedule
    }

    async fn fetch_inputs(&self) -> Result<Vec<Map<String, Value>>, GatewayError> {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        Ok(self.items.clone())
    }

    async fn on_complete(
        &self,
        _inputs: &Map<String, Value>,
        output: &Map<String, Value>,
    ) -> Result<(), GatewayError> {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(output.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_passes_objects_through() {
        let gateway = IdentityGateway;
        let inputs = gateway
            .to_unit_inputs(json!({"text": "hi", "_meta": 1}))
            .unwrap();
        assert_eq!(inputs.len(), 2);
        assert!(matches!(
            gateway.to_unit_inputs(json!([1, 2])),
            Err(GatewayError::NotAnObject)
        ));
    }

    #[tokio::test]
    async fn test_static_cron_gateway_collects_results() {
        let item = json!({"text": "a"}).as_object().cloned().unwrap();
        let gateway = StaticCronGateway::new("*/5 * * * *", vec![item.clone()]);

        let items = gateway.fetch_inputs().await.unwrap();
        assert_eq!(items, vec![item.clone()]);
        let output = json!({"processed_text": "A"}).as_object().cloned().unwrap();
        gateway.on_complete(&item, &output).await.unwrap();
        assert_eq!(gateway.results(), vec![output]);

        gateway.fetch_inputs().await.unwrap();
        assert!(gateway.results().is_empty());
    }
}
