// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::GatewayConstructionError;
use crate::gateway::{ConfiguredApiGateway, Gateway, StaticCronGateway};
use crate::scheduler::CronTrigger;
use crate::traits::HttpMethod;

/// A gateway as written in a unit manifest: a catalog name or an inline table.
///
/// ```yaml
/// gateways:
///   - NightlyDigest
///   - { type: api, path: /echo/v2, method: PUT }
///   - { type: cron, schedule: "0 6 * * *", inputs: [{ text: morning }] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GatewayDecl {
    Named(String),
    Inline(InlineGateway),
}

impl GatewayDecl {
    /// Name used in logs when construction fails.
    pub fn label(&self) -> &str {
        match self {
            GatewayDecl::Named(name) => name,
            GatewayDecl::Inline(InlineGateway::Api { .. }) => "api",
            GatewayDecl::Inline(InlineGateway::Identity) => "identity",
            GatewayDecl::Inline(InlineGateway::Cron { .. }) => "cron",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InlineGateway {
    Api {
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        method: HttpMethod,
        #[serde(default)]
        requires_auth: bool,
    },
    Identity,
    Cron {
        schedule: String,
        #[serde(default)]
        inputs: Vec<Map<String, Value>>,
    },
}

pub type GatewayConstructor =
    Arc<dyn Fn() -> Result<Gateway, GatewayConstructionError> + Send + Sync>;

/// Named gateway constructors that manifests can refer to.
#[derive(Clone, Default)]
pub struct GatewayCatalog {
    constructors: HashMap<String, GatewayConstructor>,
}

impl GatewayCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register("Identity", || Ok(Gateway::identity()));
        catalog
    }

    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn() -> Result<Gateway, GatewayConstructionError> + Send + Sync + 'static,
    {
        self.constructors
            .insert(name.to_string(), Arc::new(constructor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn construct(&self, decl: &GatewayDecl) -> Result<Gateway, GatewayConstructionError> {
        match decl {
            GatewayDecl::Named(name) => {
                let constructor = self
                    .constructors
                    .get(name)
                    .ok_or_else(|| GatewayConstructionError::Unknown(name.clone()))?;
                constructor()
            }
            GatewayDecl::Inline(InlineGateway::Identity) => Ok(Gateway::identity()),
            GatewayDecl::Inline(InlineGateway::Api {
                path,
                method,
                requires_auth,
            }) => {
                if let Some(path) = path {
                    if !path.starts_with('/') {
                        return Err(GatewayConstructionError::Failed {
                            gateway: "api".to_string(),
                            reason: format!("path '{}' must start with '/'", path),
                        });
                    }
                }
                Ok(Gateway::OnDemand(Arc::new(ConfiguredApiGateway::new(
                    path.clone(),
                    *method,
                    *requires_auth,
                ))))
            }
            GatewayDecl::Inline(InlineGateway::Cron { schedule, inputs }) => {
                CronTrigger::parse(schedule)?;
                Ok(Gateway::TimeTriggered(Arc::new(StaticCronGateway::new(
                    schedule.clone(),
                    inputs.clone(),
                ))))
            }
        }
    }
}

impl fmt::Debug for GatewayCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.constructors.keys().collect();
        names.sort();
        f.debug_struct("GatewayCatalog")
            .field("constructors", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decl_forms() {
        let decls: Vec<GatewayDecl> = serde_yaml::from_str(
            r#"
- NightlyDigest
- { type: api, path: /echo/v2, method: PUT, requires_auth: true }
- { type: identity }
- { type: cron, schedule: "*/5 * * * *", inputs: [{ text: hello }] }
"#,
        )
        .unwrap();

        assert_eq!(decls[0], GatewayDecl::Named("NightlyDigest".to_string()));
        assert_eq!(
            decls[1],
            GatewayDecl::Inline(InlineGateway::Api {
                path: Some("/echo/v2".to_string()),
                method: HttpMethod::Put,
                requires_auth: true,
            })
        );
        assert_eq!(decls[2].label(), "identity");
        assert_eq!(decls[3].label(), "cron");
    }

    #[test]
    fn test_construct() {
        let mut catalog = GatewayCatalog::with_builtins();
        catalog.register("NeedsToken", || {
            Err(GatewayConstructionError::Failed {
                gateway: "NeedsToken".to_string(),
                reason: "DIGEST_TOKEN is not set".to_string(),
            })
        });

        let cases = vec![
            (GatewayDecl::Named("Identity".to_string()), Ok("Identity")),
            (GatewayDecl::Named("NeedsToken".to_string()), Err("DIGEST_TOKEN")),
            (GatewayDecl::Named("Nope".to_string()), Err("unknown gateway 'Nope'")),
            (
                GatewayDecl::Inline(InlineGateway::Cron {
                    schedule: "not a schedule".to_string(),
                    inputs: Vec::new(),
                }),
                Err("invalid cron schedule"),
            ),
            (
                GatewayDecl::Inline(InlineGateway::Cron {
                    schedule: "0 6 * * 1-5".to_string(),
                    inputs: Vec::new(),
                }),
                Ok("Cron"),
            ),
            (
                GatewayDecl::Inline(InlineGateway::Api {
                    path: Some("no-slash".to_string()),
                    method: HttpMethod::Post,
                    requires_auth: false,
                }),
                Err("must start with '/'"),
            ),
        ];

        for (decl, expected) in cases {
            match (catalog.construct(&decl), expected) {
                (Ok(gateway), Ok(name)) => assert_eq!(gateway.type_name(), name),
                (Err(error), Err(fragment)) => {
                    assert!(error.to_string().contains(fragment), "{}", error)
                }
                (result, expected) => panic!("{:?}: got {:?}, expected {:?}", decl, result.map(|g| g.type_name().to_string()), expected),
            }
        }
    }
}
