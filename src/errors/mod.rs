// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod discovery;
mod execution;
mod gateway;

pub use config::{ConfigError, ValidationError};
pub use discovery::DiscoveryError;
pub use execution::{BackendError, InvocationError, UnitError};
pub use gateway::{GatewayConstructionError, GatewayError, RoutingError};
