// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for unit discovery and contract extraction.

use crate::observability::messages::StructuredLog;
use crate::signature::Strategy;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// A unit was found in a manifest and registered.
///
/// # Log Level
/// `info!` - Important operational event
pub struct UnitDiscovered<'a> {
    pub unit: &'a str,
    pub file: &'a Path,
}

impl Display for UnitDiscovered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Discovered unit: {} in {}", self.unit, self.file.display())
    }
}

/// A manifest names a unit whose implementation isn't in the catalog.
///
/// # Log Level
/// `warn!` - Unit skipped
pub struct UnitImplementationMissing<'a> {
    pub unit: &'a str,
    pub implementation: &'a str,
    pub file: &'a Path,
}

impl Display for UnitImplementationMissing<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unit '{}' in {} has no registered implementation '{}'; skipping",
            self.unit,
            self.file.display(),
            self.implementation
        )
    }
}

/// A class defined in another file was listed here; only its home file registers it.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct ReexportSkipped<'a> {
    pub unit: &'a str,
    pub defined_in: &'a str,
    pub file: &'a Path,
}

impl Display for ReexportSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipping '{}' in {}: defined in '{}'",
            self.unit,
            self.file.display(),
            self.defined_in
        )
    }
}

/// A manifest could not be read or parsed; its units are skipped.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_switchboard::observability::messages::discovery::ManifestSkipped;
/// use std::path::Path;
///
/// let error = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad yaml");
/// let msg = ManifestSkipped {
///     path: Path::new("units/blog_tools.yaml"),
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct ManifestSkipped<'a> {
    pub path: &'a Path,
    pub error: &'a dyn std::error::Error,
}

impl Display for ManifestSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Error loading unit manifest {}: {}", self.path.display(), self.error)
    }
}

impl StructuredLog for ManifestSkipped<'_> {
    fn log(&self) {
        tracing::error!(
            path = %self.path.display(),
            error = %self.error,
            "{}", self
        );
    }
}

/// Discovery finished.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DiscoveryCompleted<'a> {
    pub units_dir: &'a Path,
    pub manifests: usize,
    pub units: usize,
}

impl Display for DiscoveryCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Discovered {} units from {} manifests in {}",
            self.units,
            self.manifests,
            self.units_dir.display()
        )
    }
}

/// A contract was obtained for a unit.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_switchboard::observability::messages::discovery::ContractExtracted;
/// use the_switchboard::signature::Strategy;
///
/// let msg = ContractExtracted {
///     unit: "SummaryAndTags",
///     strategy: Strategy::ControlFlow,
///     signature: "blog_post -> summary, tags",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ContractExtracted<'a> {
    pub unit: &'a str,
    pub strategy: Strategy,
    pub signature: &'a str,
}

impl Display for ContractExtracted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Contract for '{}' via {}: {}",
            self.unit, self.strategy, self.signature
        )
    }
}

impl StructuredLog for ContractExtracted<'_> {
    fn log(&self) {
        tracing::info!(
            unit = self.unit,
            strategy = %self.strategy,
            signature = self.signature,
            "{}", self
        );
    }
}

/// No strategy produced a contract; the unit is served untyped.
///
/// # Log Level
/// `warn!` - Degraded but legal
pub struct ContractUnavailable<'a> {
    pub unit: &'a str,
}

impl Display for ContractUnavailable<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Could not determine a call contract for '{}'; requests will not be validated",
            self.unit
        )
    }
}

impl StructuredLog for ContractUnavailable<'_> {
    fn log(&self) {
        tracing::warn!(unit = self.unit, "{}", self);
    }
}

/// The entry point body could not be parsed for control-flow inference.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct ForwardBodyUnparseable<'a> {
    pub unit: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ForwardBodyUnparseable<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Could not parse forward body of '{}': {}", self.unit, self.error)
    }
}

impl StructuredLog for ForwardBodyUnparseable<'_> {
    fn log(&self) {
        tracing::debug!(unit = self.unit, error = %self.error, "{}", self);
    }
}

/// A schema had to fall back to an open object.
///
/// # Log Level
/// `warn!` - Degraded but legal
pub struct UntypedSchema<'a> {
    pub unit: &'a str,
    pub direction: &'a str,
}

impl Display for UntypedSchema<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "No contract for '{}'; {} schema accepts any object",
            self.unit,
            self.direction.to_lowercase()
        )
    }
}

impl StructuredLog for UntypedSchema<'_> {
    fn log(&self) {
        tracing::warn!(unit = self.unit, direction = self.direction, "{}", self);
    }
}
