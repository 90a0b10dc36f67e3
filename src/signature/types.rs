// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Semantic field types used in call contracts.
//!
//! Types are written the way unit authors write them in manifests and
//! compact signature strings (`str`, `list[str]`, `Optional[int]`,
//! `Literal['short', 'long']`, `Image`). Anything unrecognised is kept as a
//! [`SemanticType::Named`] type rather than rejected.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Rich media kinds that travel as string placeholders at the transport edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::Audio => "Audio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticType {
    Str,
    Int,
    Float,
    Bool,
    List(Box<SemanticType>),
    Dict,
    Literal(Vec<String>),
    Optional(Box<SemanticType>),
    Media(MediaKind),
    Any,
    Named(String),
}

impl SemanticType {
    /// Parse a type name. Never fails; unknown names become `Named`.
    pub fn parse(raw: &str) -> SemanticType {
        let s = raw.trim();
        if s.is_empty() {
            return SemanticType::Str;
        }

        // `T | None` and `None | T`
        let union: Vec<&str> = split_top_level(s, '|');
        if union.len() > 1 {
            let rest: Vec<&str> = union
                .iter()
                .map(|part| part.trim())
                .filter(|part| *part != "None")
                .collect();
            let inner = if rest.len() == 1 {
                SemanticType::parse(rest[0])
            } else {
                SemanticType::Any
            };
            return if rest.len() < union.len() {
                SemanticType::Optional(Box::new(inner))
            } else {
                inner
            };
        }

        if let Some((head, args)) = split_generic(s) {
            let base = strip_module(head);
            return match base {
                "list" | "List" | "Sequence" | "set" | "Set" | "tuple" | "Tuple" => {
                    let first = split_top_level(args, ',')
                        .first()
                        .map(|a| SemanticType::parse(a))
                        .unwrap_or(SemanticType::Any);
                    SemanticType::List(Box::new(first))
                }
                "dict" | "Dict" | "Mapping" => SemanticType::Dict,
                "Optional" => SemanticType::Optional(Box::new(SemanticType::parse(args))),
                "Literal" => SemanticType::Literal(
                    split_top_level(args, ',')
                        .into_iter()
                        .map(|v| unquote(v.trim()).to_string())
                        .collect(),
                ),
                _ => SemanticType::Named(s.to_string()),
            };
        }

        match strip_module(s) {
            "str" | "string" | "String" => SemanticType::Str,
            "int" | "integer" => SemanticType::Int,
            "float" | "number" => SemanticType::Float,
            "bool" | "boolean" => SemanticType::Bool,
            "list" | "List" => SemanticType::List(Box::new(SemanticType::Any)),
            "dict" | "Dict" => SemanticType::Dict,
            "Image" | "image" => SemanticType::Media(MediaKind::Image),
            "Audio" | "audio" => SemanticType::Media(MediaKind::Audio),
            "Any" | "any" => SemanticType::Any,
            _ => SemanticType::Named(s.to_string()),
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, SemanticType::Optional(_))
    }

    /// The media kind of this type, looking through `Optional`.
    pub fn media_kind(&self) -> Option<MediaKind> {
        match self {
            SemanticType::Media(kind) => Some(*kind),
            SemanticType::Optional(inner) => inner.media_kind(),
            _ => None,
        }
    }

    /// The underlying type with one layer of `Optional` removed.
    pub fn required_form(&self) -> &SemanticType {
        match self {
            SemanticType::Optional(inner) => inner,
            other => other,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::Str => write!(f, "str"),
            SemanticType::Int => write!(f, "int"),
            SemanticType::Float => write!(f, "float"),
            SemanticType::Bool => write!(f, "bool"),
            SemanticType::List(inner) => write!(f, "list[{}]", inner),
            SemanticType::Dict => write!(f, "dict"),
            SemanticType::Literal(values) => {
                let quoted: Vec<String> = values.iter().map(|v| format!("'{}'", v)).collect();
                write!(f, "Literal[{}]", quoted.join(", "))
            }
            SemanticType::Optional(inner) => write!(f, "Optional[{}]", inner),
            SemanticType::Media(kind) => write!(f, "{}", kind.as_str()),
            SemanticType::Any => write!(f, "Any"),
            SemanticType::Named(name) => write!(f, "{}", name),
        }
    }
}

impl Serialize for SemanticType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SemanticType::parse(&raw))
    }
}

/// `list[str]` -> `("list", "str")`
fn split_generic(s: &str) -> Option<(&str, &str)> {
    let open = s.find('[')?;
    if !s.ends_with(']') {
        return None;
    }
    Some((s[..open].trim(), &s[open + 1..s.len() - 1]))
}

/// `dspy.Image` -> `Image`, `typing.List` -> `List`
fn strip_module(s: &str) -> &str {
    s.rsplit('.').next().unwrap_or(s)
}

fn unquote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'\'' || bytes[0] == b'"')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Split on `sep` ignoring separators nested in brackets or quotes.
pub(crate) fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' | '(' | '{' => depth += 1,
                ']' | ')' | '}' => depth -= 1,
                c if c == sep && depth == 0 => {
                    parts.push(&s[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    let tail = &s[start..];
    if !tail.trim().is_empty() || !parts.is_empty() {
        parts.push(tail);
    }
    parts.retain(|p| !p.trim().is_empty());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_names() {
        let cases = vec![
            ("str", SemanticType::Str),
            ("int", SemanticType::Int),
            ("float", SemanticType::Float),
            ("bool", SemanticType::Bool),
            ("dict", SemanticType::Dict),
            ("dict[str, int]", SemanticType::Dict),
            ("list[str]", SemanticType::List(Box::new(SemanticType::Str))),
            ("List[int]", SemanticType::List(Box::new(SemanticType::Int))),
            ("Optional[str]", SemanticType::Optional(Box::new(SemanticType::Str))),
            ("str | None", SemanticType::Optional(Box::new(SemanticType::Str))),
            ("dspy.Image", SemanticType::Media(MediaKind::Image)),
            ("Audio", SemanticType::Media(MediaKind::Audio)),
            ("Any", SemanticType::Any),
            ("ReviewComment", SemanticType::Named("ReviewComment".to_string())),
            (
                "Literal['short', 'medium', 'long']",
                SemanticType::Literal(vec![
                    "short".to_string(),
                    "medium".to_string(),
                    "long".to_string(),
                ]),
            ),
        ];

        for (raw, expected) in cases {
            assert_eq!(SemanticType::parse(raw), expected, "parsing '{}'", raw);
        }
    }

    #[test]
    fn test_display_is_parseable() {
        let types = vec![
            SemanticType::List(Box::new(SemanticType::Str)),
            SemanticType::Optional(Box::new(SemanticType::Media(MediaKind::Image))),
            SemanticType::Literal(vec!["a".to_string(), "b".to_string()]),
        ];
        for ty in types {
            assert_eq!(SemanticType::parse(&ty.to_string()), ty);
        }
    }

    #[test]
    fn test_media_kind_looks_through_optional() {
        let ty = SemanticType::parse("Optional[dspy.Image]");
        assert!(ty.is_optional());
        assert_eq!(ty.media_kind(), Some(MediaKind::Image));
        assert_eq!(SemanticType::Str.media_kind(), None);
    }

    #[test]
    fn test_split_top_level_respects_nesting() {
        let parts = split_top_level("a: dict[str, int], b: Literal['x, y']", ',');
        assert_eq!(parts, vec!["a: dict[str, int]", " b: Literal['x, y']"]);
    }
}
