// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for gateway resolution and route planning.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// A declared gateway failed to construct and was skipped.
///
/// # Log Level
/// `warn!` - Gateway unavailable, unit still served
///
/// # Example
/// ```
/// use the_switchboard::observability::messages::gateway::GatewaySkipped;
/// use the_switchboard::errors::GatewayConstructionError;
///
/// let error = GatewayConstructionError::Unknown("SlackDigest".to_string());
/// let msg = GatewaySkipped {
///     unit: "SummaryAndTags",
///     gateway: "SlackDigest",
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct GatewaySkipped<'a> {
    pub unit: &'a str,
    pub gateway: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for GatewaySkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipping gateway '{}' for unit '{}': {}",
            self.gateway, self.unit, self.error
        )
    }
}

impl StructuredLog for GatewaySkipped<'_> {
    fn log(&self) {
        tracing::warn!(
            unit = self.unit,
            gateway = self.gateway,
            error = %self.error,
            "{}", self
        );
    }
}

/// Every declared gateway failed; the unit falls back to its identity route.
///
/// # Log Level
/// `warn!` - Degraded configuration
pub struct IdentityFallback<'a> {
    pub unit: &'a str,
    pub declared: usize,
}

impl Display for IdentityFallback<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "All {} declared gateways for unit '{}' failed; using identity gateway",
            self.declared, self.unit
        )
    }
}

/// An on-demand route was bound.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RouteBound<'a> {
    pub unit: &'a str,
    pub gateway: &'a str,
    pub method: &'a str,
    pub path: &'a str,
}

impl Display for RouteBound<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Route {} {} -> {}.{}",
            self.method, self.path, self.unit, self.gateway
        )
    }
}

/// A time-triggered job was planned.
///
/// # Log Level
/// `info!` - Important operational event
pub struct CronJobPlanned<'a> {
    pub unit: &'a str,
    pub gateway: &'a str,
    pub schedule: &'a str,
}

impl Display for CronJobPlanned<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Scheduled {}.{} on '{}'",
            self.unit, self.gateway, self.schedule
        )
    }
}
