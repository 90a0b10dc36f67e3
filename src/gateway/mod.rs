// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Gateways bind units to transports.
//!
//! A unit declares zero or more gateways in its manifest. Each resolves to
//! either an on-demand (HTTP) adapter or a time-triggered (cron) adapter; a
//! unit with no declared gateways gets an implicit pass-through
//! [`IdentityGateway`] served at `/{unit}`.

mod builtin;
mod catalog;
mod router;

use std::fmt;
use std::sync::Arc;

use crate::traits::{ApiGateway, CronGateway};

pub use builtin::{ConfiguredApiGateway, IdentityGateway, StaticCronGateway};
pub use catalog::{GatewayCatalog, GatewayConstructor, GatewayDecl, InlineGateway};
pub use router::{CronJob, GatewayRouter, RouteBinding, RoutingPlan};

/// A constructed gateway, polymorphic over the two transport kinds.
#[derive(Clone)]
pub enum Gateway {
    OnDemand(Arc<dyn ApiGateway>),
    TimeTriggered(Arc<dyn CronGateway>),
}

impl Gateway {
    pub fn type_name(&self) -> &str {
        match self {
            Gateway::OnDemand(gateway) => gateway.type_name(),
            Gateway::TimeTriggered(gateway) => gateway.type_name(),
        }
    }

    pub fn identity() -> Self {
        Gateway::OnDemand(Arc::new(IdentityGateway))
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gateway::OnDemand(gateway) => f
                .debug_tuple("OnDemand")
                .field(&gateway.type_name())
                .finish(),
            Gateway::TimeTriggered(gateway) => f
                .debug_tuple("TimeTriggered")
                .field(&gateway.type_name())
                .field(&gateway.schedule())
                .finish(),
        }
    }
}
