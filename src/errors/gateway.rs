// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for gateway construction, gateway hooks and route resolution.

/// A declared gateway could not be constructed. Logged; the gateway is skipped.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayConstructionError {
    #[error("unknown gateway '{0}'")]
    Unknown(String),

    #[error("gateway '{gateway}' could not be constructed: {reason}")]
    Failed { gateway: String, reason: String },

    #[error("invalid cron schedule '{schedule}': {reason}")]
    InvalidSchedule { schedule: String, reason: String },
}

/// A gateway hook (input transform, fetch, completion) failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("request payload must be a JSON object")]
    NotAnObject,

    #[error("failed to fetch inputs: {0}")]
    Fetch(String),

    #[error("completion hook failed: {0}")]
    Complete(String),

    #[error("{0}")]
    Other(String),
}

/// Fatal routing failure detected while building the routing plan.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoutingError {
    #[error("Route path conflict: '{path}' is used by both {first} and {second}")]
    PathConflict {
        path: String,
        first: String,
        second: String,
    },
}
