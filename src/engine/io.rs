// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Values flowing into and out of a unit.
//!
//! At the transport edge every field is JSON. Rich media fields travel as
//! string placeholders (a URL, a `data:` URI, or bare base64) and are
//! converted to [`MediaValue`]s before the unit sees them.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::errors::UnitError;
use crate::signature::{CallContract, MediaKind};

#[derive(Debug, Clone, PartialEq)]
pub enum MediaSource {
    Url(String),
    Inline { mime: String, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaValue {
    pub kind: MediaKind,
    pub source: MediaSource,
}

impl MediaValue {
    /// Convert a boundary placeholder back into a media value.
    pub fn from_placeholder(kind: MediaKind, placeholder: &str) -> Result<Self, String> {
        let raw = placeholder.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Self {
                kind,
                source: MediaSource::Url(raw.to_string()),
            });
        }

        if let Some(rest) = raw.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| "data URI is missing ','".to_string())?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| "only base64 data URIs are supported".to_string())?;
            let data = STANDARD
                .decode(payload)
                .map_err(|e| format!("invalid base64 payload: {}", e))?;
            return Ok(Self {
                kind,
                source: MediaSource::Inline {
                    mime: mime.to_string(),
                    data,
                },
            });
        }

        let data = STANDARD
            .decode(raw)
            .map_err(|e| format!("expected a URL, data URI or base64 payload: {}", e))?;
        Ok(Self {
            kind,
            source: MediaSource::Inline {
                mime: sniff_mime(kind, &data).to_string(),
                data,
            },
        })
    }

    /// Placeholder form suitable for sending back over the wire.
    pub fn to_placeholder(&self) -> String {
        match &self.source {
            MediaSource::Url(url) => url.clone(),
            MediaSource::Inline { mime, data } => {
                format!("data:{};base64,{}", mime, STANDARD.encode(data))
            }
        }
    }
}

impl Serialize for MediaValue {
    /// Summary form used in logs and traces; inline bytes are not copied out.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("type", self.kind.as_str())?;
        match &self.source {
            MediaSource::Url(url) => map.serialize_entry("url", url)?,
            MediaSource::Inline { mime, data } => {
                map.serialize_entry("mime", mime)?;
                map.serialize_entry("bytes", &data.len())?;
            }
        }
        map.end()
    }
}

fn sniff_mime(kind: MediaKind, data: &[u8]) -> &'static str {
    match data {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => "audio/wav",
        [b'I', b'D', b'3', ..] => "audio/mpeg",
        [b'O', b'g', b'g', b'S', ..] => "audio/ogg",
        _ => match kind {
            MediaKind::Image => "image/png",
            MediaKind::Audio => "audio/wav",
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Json(Value),
    Media(MediaValue),
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Json(value) => value.serialize(serializer),
            FieldValue::Media(media) => media.serialize(serializer),
        }
    }
}

/// Named inputs handed to a unit's entry point.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Inputs(IndexMap<String, FieldValue>);

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain JSON inputs with no placeholder conversion.
    pub fn from_json(map: Map<String, Value>) -> Self {
        Self(
            map.into_iter()
                .map(|(k, v)| (k, FieldValue::Json(v)))
                .collect(),
        )
    }

    /// Convert boundary placeholders using the unit's contract.
    ///
    /// Fields the contract types as media and that arrive as strings become
    /// [`MediaValue`]s; everything else passes through untouched.
    pub fn from_boundary(
        map: Map<String, Value>,
        contract: Option<&CallContract>,
    ) -> Result<Self, String> {
        let mut fields = IndexMap::with_capacity(map.len());
        for (name, value) in map {
            let kind = contract
                .and_then(|c| c.inputs.get(&name))
                .and_then(|spec| spec.ty.media_kind());
            let field = match (kind, value) {
                (Some(kind), Value::String(placeholder)) => FieldValue::Media(
                    MediaValue::from_placeholder(kind, &placeholder)
                        .map_err(|e| format!("field '{}': {}", name, e))?,
                ),
                (_, value) => FieldValue::Json(value),
            };
            fields.insert(name, field);
        }
        Ok(Self(fields))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.0.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, FieldValue::Json(value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// String value of a field; non-string JSON is rendered as JSON text.
    pub fn text(&self, name: &str) -> Result<String, UnitError> {
        match self.0.get(name) {
            Some(FieldValue::Json(Value::String(s))) => Ok(s.clone()),
            Some(FieldValue::Json(Value::Null)) | None => {
                Err(UnitError::MissingInput(name.to_string()))
            }
            Some(FieldValue::Json(other)) => Ok(other.to_string()),
            Some(FieldValue::Media(_)) => Err(UnitError::InvalidInput {
                field: name.to_string(),
                expected: "text".to_string(),
            }),
        }
    }

    pub fn optional_text(&self, name: &str) -> Option<String> {
        self.text(name).ok()
    }

    pub fn media(&self, name: &str) -> Result<&MediaValue, UnitError> {
        match self.0.get(name) {
            Some(FieldValue::Media(media)) => Ok(media),
            None => Err(UnitError::MissingInput(name.to_string())),
            Some(_) => Err(UnitError::InvalidInput {
                field: name.to_string(),
                expected: "a media value".to_string(),
            }),
        }
    }

    /// JSON snapshot for logs and traces.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Rich output bag returned by delegates and most units.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Prediction(Map<String, Value>);

impl Prediction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String value of a field, or an empty string when missing.
    pub fn text(&self, name: &str) -> String {
        match self.0.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Prediction {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// What an entry point may return.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutput {
    Prediction(Prediction),
    Mapping(Map<String, Value>),
    Value(Value),
}

impl UnitOutput {
    /// Normalize to a field mapping: predictions are flattened, mappings and
    /// JSON objects are used as-is, anything else lands under `result`.
    pub fn normalize(self) -> Map<String, Value> {
        match self {
            UnitOutput::Prediction(prediction) => prediction.into_fields(),
            UnitOutput::Mapping(map) | UnitOutput::Value(Value::Object(map)) => map,
            UnitOutput::Value(Value::String(s)) => single_result(Value::String(s)),
            UnitOutput::Value(other) => single_result(Value::String(other.to_string())),
        }
    }
}

fn single_result(value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("result".to_string(), value);
    map
}

impl From<Prediction> for UnitOutput {
    fn from(prediction: Prediction) -> Self {
        UnitOutput::Prediction(prediction)
    }
}

impl From<Map<String, Value>> for UnitOutput {
    fn from(map: Map<String, Value>) -> Self {
        UnitOutput::Mapping(map)
    }
}

impl From<Value> for UnitOutput {
    fn from(value: Value) -> Self {
        UnitOutput::Value(value)
    }
}
