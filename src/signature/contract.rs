// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Call contracts: ordered, typed input and output fields.
//!
//! A contract is what a delegate (a `Predict` or a wrapper around one)
//! declares, and what the extractor infers for a whole unit. Contracts can be
//! built programmatically or parsed from the compact string form:
//!
//! ```
//! use the_switchboard::signature::{CallContract, SemanticType};
//!
//! let contract = CallContract::parse("blog_post, length: Literal['short', 'long'] -> summary").unwrap();
//! assert_eq!(contract.signature_string(), "blog_post, length -> summary");
//! assert_eq!(contract.inputs["blog_post"].ty, SemanticType::Str);
//! ```

use crate::signature::types::{split_top_level, SemanticType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub ty: SemanticType,
    #[serde(default)]
    pub description: String,
}

impl FieldSpec {
    pub fn new(ty: SemanticType, description: impl Into<String>) -> Self {
        Self {
            ty,
            description: description.into(),
        }
    }

    /// Untyped fields default to `str` with no description.
    pub fn generic() -> Self {
        Self::new(SemanticType::Str, "")
    }
}

pub type FieldMap = IndexMap<String, FieldSpec>;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ContractParseError {
    #[error("signature '{0}' is missing '->'")]
    MissingArrow(String),

    #[error("signature '{signature}' has an empty field name")]
    EmptyField { signature: String },

    #[error("field '{field}' appears twice in the {side} of '{signature}'")]
    DuplicateField {
        signature: String,
        field: String,
        side: &'static str,
    },
}

/// Typed input/output fields of a delegate or a unit.
///
/// Field names are unique within `inputs` and within `outputs`; the same
/// name may appear on both sides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallContract {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instructions: String,
    pub inputs: FieldMap,
    pub outputs: FieldMap,
}

impl CallContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn input(mut self, name: &str, ty: SemanticType, description: &str) -> Self {
        self.inputs
            .insert(name.to_string(), FieldSpec::new(ty, description));
        self
    }

    pub fn output(mut self, name: &str, ty: SemanticType, description: &str) -> Self {
        self.outputs
            .insert(name.to_string(), FieldSpec::new(ty, description));
        self
    }

    /// Parse `"a: str, b -> c: list[str]"`. Fields without a type are `str`.
    pub fn parse(signature: &str) -> Result<Self, ContractParseError> {
        let (lhs, rhs) = signature
            .split_once("->")
            .ok_or_else(|| ContractParseError::MissingArrow(signature.to_string()))?;

        Ok(Self {
            instructions: String::new(),
            inputs: parse_side(signature, lhs, "inputs")?,
            outputs: parse_side(signature, rhs, "outputs")?,
        })
    }

    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.keys().map(String::as_str)
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    /// Human readable form, e.g. `image -> image_description, headlines`.
    pub fn signature_string(&self) -> String {
        let inputs: Vec<&str> = self.input_names().collect();
        let outputs: Vec<&str> = self.output_names().collect();
        format!("{} -> {}", inputs.join(", "), outputs.join(", "))
    }

    /// Copy of this contract with an extra output placed before the others.
    pub fn prepend_output(&self, name: &str, spec: FieldSpec) -> Self {
        let mut outputs = FieldMap::new();
        outputs.insert(name.to_string(), spec);
        for (key, value) in &self.outputs {
            if key != name {
                outputs.insert(key.clone(), value.clone());
            }
        }
        Self {
            instructions: self.instructions.clone(),
            inputs: self.inputs.clone(),
            outputs,
        }
    }
}

fn parse_side(
    signature: &str,
    side: &str,
    label: &'static str,
) -> Result<FieldMap, ContractParseError> {
    let mut fields = FieldMap::new();
    for raw in split_top_level(side, ',') {
        let (name, ty) = match raw.split_once(':') {
            Some((name, ty)) => (name.trim(), SemanticType::parse(ty)),
            None => (raw.trim(), SemanticType::Str),
        };
        if name.is_empty() {
            return Err(ContractParseError::EmptyField {
                signature: signature.to_string(),
            });
        }
        if fields.contains_key(name) {
            return Err(ContractParseError::DuplicateField {
                signature: signature.to_string(),
                field: name.to_string(),
                side: label,
            });
        }
        fields.insert(name.to_string(), FieldSpec::new(ty, ""));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::types::MediaKind;

    #[test]
    fn test_parse_typed_signature() {
        let contract =
            CallContract::parse("image: dspy.Image, count: int -> headlines: list[str], note")
                .unwrap();

        assert_eq!(
            contract.inputs["image"].ty,
            SemanticType::Media(MediaKind::Image)
        );
        assert_eq!(contract.inputs["count"].ty, SemanticType::Int);
        assert_eq!(
            contract.outputs["headlines"].ty,
            SemanticType::List(Box::new(SemanticType::Str))
        );
        assert_eq!(contract.outputs["note"].ty, SemanticType::Str);
        assert_eq!(
            contract.signature_string(),
            "image, count -> headlines, note"
        );
    }

    #[test]
    fn test_same_name_on_both_sides_is_allowed() {
        let contract = CallContract::parse("text -> text").unwrap();
        assert!(contract.inputs.contains_key("text"));
        assert!(contract.outputs.contains_key("text"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            CallContract::parse("question"),
            Err(ContractParseError::MissingArrow(_))
        ));
        assert!(matches!(
            CallContract::parse("a, a -> b"),
            Err(ContractParseError::DuplicateField { side: "inputs", .. })
        ));
        assert!(matches!(
            CallContract::parse("a, : int -> b"),
            Err(ContractParseError::EmptyField { .. })
        ));
    }

    #[test]
    fn test_prepend_output_keeps_order() {
        let contract = CallContract::parse("question -> answer").unwrap();
        let extended = contract.prepend_output("reasoning", FieldSpec::generic());
        let names: Vec<&str> = extended.output_names().collect();
        assert_eq!(names, vec!["reasoning", "answer"]);
    }
}
