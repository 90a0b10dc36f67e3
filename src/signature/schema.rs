// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural request/response types derived from a call contract.
//!
//! Media fields are plain strings at the boundary (URL, data URI or base64);
//! the engine converts them back before the unit runs. Without a contract the
//! type is open and accepts any JSON object.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::observability::messages::discovery::UntypedSchema;
use crate::observability::messages::StructuredLog;
use crate::signature::{CallContract, FieldMap, SemanticType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Array(Box<FieldKind>),
    Object,
    Enum(Vec<String>),
    Any,
}

impl FieldKind {
    fn from_semantic(ty: &SemanticType) -> Self {
        match ty.required_form() {
            SemanticType::Str | SemanticType::Media(_) => FieldKind::String,
            SemanticType::Int => FieldKind::Integer,
            SemanticType::Float => FieldKind::Number,
            SemanticType::Bool => FieldKind::Boolean,
            SemanticType::List(inner) => FieldKind::Array(Box::new(FieldKind::from_semantic(inner))),
            SemanticType::Dict => FieldKind::Object,
            SemanticType::Literal(values) => FieldKind::Enum(values.clone()),
            SemanticType::Optional(inner) => FieldKind::from_semantic(inner),
            SemanticType::Any | SemanticType::Named(_) => FieldKind::Any,
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldKind::Any, _) => true,
            (FieldKind::String, Value::String(_)) => true,
            (FieldKind::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (FieldKind::Number, Value::Number(_)) => true,
            (FieldKind::Boolean, Value::Bool(_)) => true,
            (FieldKind::Array(inner), Value::Array(items)) => items.iter().all(|i| inner.accepts(i)),
            (FieldKind::Object, Value::Object(_)) => true,
            (FieldKind::Enum(values), Value::String(s)) => values.contains(s),
            _ => false,
        }
    }

    fn describe(&self) -> String {
        match self {
            FieldKind::String => "a string".to_string(),
            FieldKind::Integer => "an integer".to_string(),
            FieldKind::Number => "a number".to_string(),
            FieldKind::Boolean => "a boolean".to_string(),
            FieldKind::Array(inner) => format!("a list of {}", inner.describe()),
            FieldKind::Object => "an object".to_string(),
            FieldKind::Enum(values) => format!("one of {}", values.join(", ")),
            FieldKind::Any => "any value".to_string(),
        }
    }

    fn json_schema(&self) -> Value {
        match self {
            FieldKind::String => json!({ "type": "string" }),
            FieldKind::Integer => json!({ "type": "integer" }),
            FieldKind::Number => json!({ "type": "number" }),
            FieldKind::Boolean => json!({ "type": "boolean" }),
            FieldKind::Array(inner) => json!({ "type": "array", "items": inner.json_schema() }),
            FieldKind::Object => json!({ "type": "object" }),
            FieldKind::Enum(values) => json!({ "type": "string", "enum": values }),
            FieldKind::Any => json!({}),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuralField {
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
    pub description: String,
}

/// One entry of a validation failure, shaped like a 422 `detail` item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaViolation {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl SchemaViolation {
    fn at(field: &str, msg: impl Into<String>, kind: &'static str) -> Self {
        Self {
            loc: vec!["body".to_string(), field.to_string()],
            msg: msg.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuralType {
    pub name: String,
    pub fields: IndexMap<String, StructuralField>,
    /// Accepts any object; set when no contract is known.
    pub open: bool,
}

impl StructuralType {
    /// A type accepting any JSON object.
    pub fn open(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            open: true,
        }
    }

    /// Check a payload, returning it with defaults applied.
    ///
    /// Extra fields are kept so gateways and metadata keys pass through.
    pub fn validate(&self, value: &Value) -> Result<Map<String, Value>, Vec<SchemaViolation>> {
        let Value::Object(object) = value else {
            return Err(vec![SchemaViolation {
                loc: vec!["body".to_string()],
                msg: "Input should be a valid object".to_string(),
                kind: "model_type",
            }]);
        };

        let mut validated = object.clone();
        if self.open {
            return Ok(validated);
        }

        let mut violations = Vec::new();
        for (name, field) in &self.fields {
            match object.get(name) {
                None | Some(Value::Null) if field.required => {
                    violations.push(SchemaViolation::at(name, "Field required", "missing"));
                }
                None => {
                    if let Some(default) = &field.default {
                        validated.insert(name.clone(), default.clone());
                    }
                }
                Some(Value::Null) => {}
                Some(value) if !field.kind.accepts(value) => {
                    violations.push(SchemaViolation::at(
                        name,
                        format!("Input should be {}", field.kind.describe()),
                        "type_error",
                    ));
                }
                Some(_) => {}
            }
        }

        if violations.is_empty() {
            Ok(validated)
        } else {
            Err(violations)
        }
    }

    /// JSON Schema rendering for documentation.
    pub fn json_schema(&self) -> Value {
        if self.open {
            return json!({ "title": self.name, "type": "object", "additionalProperties": true });
        }

        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, field) in &self.fields {
            let mut schema = field.kind.json_schema();
            if let Value::Object(map) = &mut schema {
                if !field.description.is_empty() {
                    map.insert("description".to_string(), Value::String(field.description.clone()));
                }
                if let Some(default) = &field.default {
                    map.insert("default".to_string(), default.clone());
                }
            }
            properties.insert(name.clone(), schema);
            if field.required {
                required.push(Value::String(name.clone()));
            }
        }

        json!({
            "title": self.name,
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

pub struct SchemaBuilder;

impl SchemaBuilder {
    pub fn build(unit: &str, contract: Option<&CallContract>, direction: Direction) -> StructuralType {
        let suffix = match direction {
            Direction::Request => "Request",
            Direction::Response => "Response",
        };
        let name = format!("{}{}", unit, suffix);

        let Some(contract) = contract else {
            UntypedSchema { unit, direction: suffix }.log();
            return StructuralType::open(name);
        };

        let fields: &FieldMap = match direction {
            Direction::Request => &contract.inputs,
            Direction::Response => &contract.outputs,
        };

        StructuralType {
            name,
            fields: fields
                .iter()
                .map(|(name, spec)| {
                    let optional = spec.ty.is_optional();
                    (
                        name.clone(),
                        StructuralField {
                            kind: FieldKind::from_semantic(&spec.ty),
                            required: !optional,
                            default: optional.then_some(Value::Null),
                            description: spec.description.clone(),
                        },
                    )
                })
                .collect(),
            open: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(signature: &str) -> StructuralType {
        let contract = CallContract::parse(signature).unwrap();
        SchemaBuilder::build("Unit", Some(&contract), Direction::Request)
    }

    #[test]
    fn test_field_mapping() {
        let schema = request(
            "text, count: int, ratio: float, flag: bool, tags: list[str], meta: dict, \
             tone: Literal['formal', 'casual'], image: Image, note: Optional[str] -> out",
        );

        assert_eq!(schema.name, "UnitRequest");
        assert_eq!(schema.fields["count"].kind, FieldKind::Integer);
        assert_eq!(schema.fields["image"].kind, FieldKind::String);
        assert_eq!(schema.fields["tags"].kind, FieldKind::Array(Box::new(FieldKind::String)));
        assert!(!schema.fields["note"].required);
        assert_eq!(schema.fields["note"].default, Some(Value::Null));
        assert!(schema.fields["text"].required);
    }

    #[test]
    fn test_validate_applies_defaults_and_keeps_extras() {
        let schema = request("text, note: Optional[str] -> out");
        let validated = schema
            .validate(&json!({ "text": "hello", "_source": "cron" }))
            .unwrap();
        assert_eq!(validated["note"], Value::Null);
        assert_eq!(validated["_source"], "cron");
    }

    #[test]
    fn test_validate_reports_every_violation() {
        let schema = request("text, count: int, tone: Literal['a', 'b'] -> out");
        let violations = schema
            .validate(&json!({ "count": 1.5, "tone": "c" }))
            .unwrap_err();

        let fields: Vec<&str> = violations.iter().map(|v| v.loc[1].as_str()).collect();
        assert_eq!(fields, vec!["text", "count", "tone"]);
        assert_eq!(violations[0].kind, "missing");
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let schema = request("text -> out");
        assert!(schema.validate(&json!(["text"])).is_err());
    }

    #[test]
    fn test_missing_contract_is_open() {
        let schema = SchemaBuilder::build("Loose", None, Direction::Request);
        assert!(schema.open);
        assert!(schema.validate(&json!({ "anything": [1, 2] })).is_ok());
        assert_eq!(schema.json_schema()["additionalProperties"], true);
    }

    #[test]
    fn test_json_schema_documents_fields() {
        let contract = CallContract::new()
            .input("text", SemanticType::Str, "The post body")
            .output("summary", SemanticType::Str, "")
            .output("score", SemanticType::Float, "");
        let schema = SchemaBuilder::build("Summarize", Some(&contract), Direction::Response).json_schema();

        assert_eq!(schema["title"], "SummarizeResponse");
        assert_eq!(schema["properties"]["score"]["type"], "number");
        assert_eq!(schema["required"], json!(["summary", "score"]));
    }
}
