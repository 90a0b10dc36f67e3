// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Unit discovery: manifests on disk resolved against compiled-in implementations.

mod catalog;
mod finder;
pub mod manifest;
mod registry;

pub use catalog::{UnitCatalog, UnitClass, UnitConstructor};
pub use finder::discover;
pub use manifest::{ClassManifest, UnitManifest};
pub use registry::{DiscoveredUnit, UnitRegistry};
