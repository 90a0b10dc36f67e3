// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resolves each unit's gateways and lays out the process-wide route table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::discovery::{DiscoveredUnit, UnitRegistry};
use crate::errors::RoutingError;
use crate::gateway::{Gateway, GatewayCatalog};
use crate::observability::messages::gateway::{
    CronJobPlanned, GatewaySkipped, IdentityFallback, RouteBound,
};
use crate::observability::messages::StructuredLog;
use crate::signature::{Direction, SchemaBuilder, StructuralType};
use crate::traits::{ApiGateway, CronGateway, HttpMethod};

/// One on-demand route: a unit served through one API gateway.
#[derive(Clone)]
pub struct RouteBinding {
    pub unit: Arc<DiscoveredUnit>,
    pub gateway: Arc<dyn ApiGateway>,
    pub path: String,
    pub method: HttpMethod,
    pub request_schema: StructuralType,
    pub response_schema: StructuralType,
}

impl RouteBinding {
    /// `Unit.GatewayType`, as used in conflict errors.
    pub fn owner(&self) -> String {
        format!("{}.{}", self.unit.name, self.gateway.type_name())
    }
}

impl fmt::Debug for RouteBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBinding")
            .field("owner", &self.owner())
            .field("method", &self.method)
            .field("path", &self.path)
            .finish()
    }
}

/// One time-triggered job.
#[derive(Clone)]
pub struct CronJob {
    pub unit: Arc<DiscoveredUnit>,
    pub gateway: Arc<dyn CronGateway>,
}

impl fmt::Debug for CronJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CronJob")
            .field("unit", &self.unit.name)
            .field("gateway", &self.gateway.type_name())
            .field("schedule", &self.gateway.schedule())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoutingPlan {
    pub routes: Vec<RouteBinding>,
    pub cron_jobs: Vec<CronJob>,
}

impl RoutingPlan {
    pub fn route(&self, method: HttpMethod, path: &str) -> Option<&RouteBinding> {
        self.routes
            .iter()
            .find(|route| route.method == method && route.path == path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GatewayRouter {
    catalog: GatewayCatalog,
}

impl GatewayRouter {
    pub fn new(catalog: GatewayCatalog) -> Self {
        Self { catalog }
    }

    /// Construct the gateways a unit declares.
    ///
    /// Failed declarations are logged and skipped. A unit with no declared
    /// gateways, or whose declarations all failed, gets the identity gateway.
    pub fn resolve(&self, unit: &DiscoveredUnit) -> Vec<Gateway> {
        let declared = unit.class.gateways();
        if declared.is_empty() {
            return vec![Gateway::identity()];
        }

        let gateways: Vec<Gateway> = declared
            .iter()
            .filter_map(|decl| match self.catalog.construct(decl) {
                Ok(gateway) => Some(gateway),
                Err(error) => {
                    GatewaySkipped {
                        unit: &unit.name,
                        gateway: decl.label(),
                        error: &error,
                    }
                    .log();
                    None
                }
            })
            .collect();

        if gateways.is_empty() {
            tracing::warn!(
                "{}",
                IdentityFallback {
                    unit: &unit.name,
                    declared: declared.len(),
                }
            );
            return vec![Gateway::identity()];
        }
        gateways
    }

    /// Explicit path if set, `/{unit}` for the identity gateway, otherwise
    /// `/{unit}/{gateway type}`.
    pub fn route_path(unit: &str, gateway: &dyn ApiGateway) -> String {
        if let Some(path) = gateway.path() {
            return path.to_string();
        }
        if gateway.is_identity() {
            format!("/{}", unit)
        } else {
            format!("/{}/{}", unit, gateway.type_name())
        }
    }

    /// Resolve every unit and fail on the first path claimed twice.
    pub fn plan(&self, registry: &UnitRegistry) -> Result<RoutingPlan, RoutingError> {
        let mut plan = RoutingPlan::default();
        let mut owners: HashMap<String, String> = HashMap::new();

        for unit in registry.iter() {
            for gateway in self.resolve(unit) {
                match gateway {
                    Gateway::OnDemand(gateway) => {
                        let binding = Self::bind(unit, gateway);
                        if let Some(first) = owners.get(&binding.path) {
                            return Err(RoutingError::PathConflict {
                                path: binding.path.clone(),
                                first: first.clone(),
                                second: binding.owner(),
                            });
                        }
                        tracing::info!(
                            "{}",
                            RouteBound {
                                unit: &unit.name,
                                gateway: binding.gateway.type_name(),
                                method: binding.method.as_str(),
                                path: &binding.path,
                            }
                        );
                        owners.insert(binding.path.clone(), binding.owner());
                        plan.routes.push(binding);
                    }
                    Gateway::TimeTriggered(gateway) => {
                        tracing::info!(
                            "{}",
                            CronJobPlanned {
                                unit: &unit.name,
                                gateway: gateway.type_name(),
                                schedule: gateway.schedule(),
                            }
                        );
                        plan.cron_jobs.push(CronJob {
                            unit: Arc::clone(unit),
                            gateway,
                        });
                    }
                }
            }
        }
        Ok(plan)
    }

    fn bind(unit: &Arc<DiscoveredUnit>, gateway: Arc<dyn ApiGateway>) -> RouteBinding {
        let path = Self::route_path(&unit.name, gateway.as_ref());
        // Only pass-through gateways expose the unit's own contract on the wire.
        let (request_schema, response_schema) = if gateway.is_identity() {
            (
                SchemaBuilder::build(&unit.name, unit.contract.as_ref(), Direction::Request),
                SchemaBuilder::build(&unit.name, unit.contract.as_ref(), Direction::Response),
            )
        } else {
            (
                StructuralType::open(format!("{}Request", unit.name)),
                StructuralType::open(format!("{}Response", unit.name)),
            )
        };

        RouteBinding {
            unit: Arc::clone(unit),
            method: gateway.method(),
            gateway,
            path,
            request_schema,
            response_schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::UnitClass;
    use crate::errors::GatewayConstructionError;
    use crate::gateway::{GatewayDecl, InlineGateway};
    use crate::signature::{ForwardDecl, SemanticType};
    use crate::traits::Unit;
    use std::path::Path;

    struct Nothing;

    impl Unit for Nothing {}

    fn unit(name: &str, file: &str, gateways: Vec<GatewayDecl>) -> DiscoveredUnit {
        DiscoveredUnit::from_class(
            UnitClass::new(name, || Ok(Box::new(Nothing) as Box<dyn Unit>))
                .with_source_file(Path::new(file))
                .with_gateways(gateways),
        )
    }

    fn api(path: Option<&str>) -> GatewayDecl {
        GatewayDecl::Inline(InlineGateway::Api {
            path: path.map(str::to_string),
            method: HttpMethod::Post,
            requires_auth: false,
        })
    }

    #[test]
    fn test_default_paths() {
        let registry = UnitRegistry::from_units(vec![
            unit("Echo", "a.yaml", vec![]),
            unit(
                "Digest",
                "b.yaml",
                vec![
                    api(None),
                    GatewayDecl::Inline(InlineGateway::Identity),
                    GatewayDecl::Inline(InlineGateway::Cron {
                        schedule: "0 6 * * *".to_string(),
                        inputs: Vec::new(),
                    }),
                ],
            ),
        ])
        .unwrap();

        let plan = GatewayRouter::default().plan(&registry).unwrap();
        let paths: Vec<&str> = plan.routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/Echo", "/Digest/Api", "/Digest"]);
        assert_eq!(plan.cron_jobs.len(), 1);
        assert_eq!(plan.cron_jobs[0].unit.name, "Digest");
        assert!(plan.route(HttpMethod::Post, "/Echo").is_some());
        assert!(plan.route(HttpMethod::Get, "/Echo").is_none());
    }

    #[test]
    fn test_path_conflict_names_both_owners() {
        let registry = UnitRegistry::from_units(vec![
            unit("Echo", "a.yaml", vec![api(Some("/shared"))]),
            unit("Other", "b.yaml", vec![api(Some("/shared"))]),
        ])
        .unwrap();

        let err = GatewayRouter::default().plan(&registry).unwrap_err();
        assert_eq!(
            err,
            RoutingError::PathConflict {
                path: "/shared".to_string(),
                first: "Echo.Api".to_string(),
                second: "Other.Api".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            "Route path conflict: '/shared' is used by both Echo.Api and Other.Api"
        );
    }

    #[test]
    fn test_identity_path_collides_with_explicit_path() {
        let registry = UnitRegistry::from_units(vec![
            unit("Echo", "a.yaml", vec![]),
            unit("Shout", "b.yaml", vec![api(Some("/Echo"))]),
        ])
        .unwrap();

        assert!(matches!(
            GatewayRouter::default().plan(&registry),
            Err(RoutingError::PathConflict { ref first, .. }) if first == "Echo.Identity"
        ));
    }

    #[test]
    fn test_failed_gateways_fall_back_to_identity() {
        let mut catalog = GatewayCatalog::with_builtins();
        catalog.register("Broken", || {
            Err(GatewayConstructionError::Failed {
                gateway: "Broken".to_string(),
                reason: "missing credential".to_string(),
            })
        });
        let router = GatewayRouter::new(catalog);

        let only_broken = unit("Echo", "a.yaml", vec![GatewayDecl::Named("Broken".to_string())]);
        let gateways = router.resolve(&only_broken);
        assert_eq!(gateways.len(), 1);
        assert_eq!(gateways[0].type_name(), "Identity");

        let partly_broken = unit(
            "Echo",
            "a.yaml",
            vec![GatewayDecl::Named("Broken".to_string()), api(Some("/echo/v2"))],
        );
        let gateways = router.resolve(&partly_broken);
        assert_eq!(gateways.len(), 1);
        assert_eq!(gateways[0].type_name(), "Api");
    }

    #[test]
    fn test_identity_route_uses_unit_contract() {
        let typed = DiscoveredUnit::from_class(
            UnitClass::new("Echo", || Ok(Box::new(Nothing) as Box<dyn Unit>))
                .with_forward_decl(
                    ForwardDecl::new()
                        .param("text", Some(SemanticType::Str))
                        .returns_record(&[("processed_text", SemanticType::Str)]),
                ),
        );
        let registry = UnitRegistry::from_units(vec![typed]).unwrap();
        let plan = GatewayRouter::default().plan(&registry).unwrap();

        let route = &plan.routes[0];
        assert_eq!(route.request_schema.name, "EchoRequest");
        assert!(!route.request_schema.open);
        assert!(route.request_schema.fields.contains_key("text"));
        assert!(route.response_schema.fields.contains_key("processed_text"));
    }
}
