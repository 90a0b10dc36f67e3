// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Call contracts and how they are obtained.
//!
//! * [`types`] and [`contract`] model typed input/output fields.
//! * [`declared`] reads explicitly declared entry point types.
//! * [`forward`] parses an entry point body for control-flow inference.
//! * [`extractor`] runs the three inference strategies in order.
//! * [`schema`] turns a contract into request/response structural types.

pub mod contract;
pub mod declared;
pub mod extractor;
pub mod forward;
pub mod schema;
pub mod types;

pub use contract::{CallContract, ContractParseError, FieldMap, FieldSpec};
pub use declared::{ForwardDecl, ReturnDecl, TypeDecl};
pub use extractor::{ExtractedContract, SignatureExtractor, Strategy};
pub use forward::{ForwardBody, ForwardParseError};
pub use schema::{Direction, FieldKind, SchemaBuilder, SchemaViolation, StructuralField, StructuralType};
pub use types::{MediaKind, SemanticType};
