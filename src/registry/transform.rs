//! Value transforms and error-path remaps as data.
//!
//! Registries stay serializable: instead of embedding closures, a field
//! configuration carries a tagged instruction and this module evaluates it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::path::{FieldPath, PathSegment};

/// A single value transform applied on the way into a request body
/// (`to_request`) or out of a response (`from_response`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// Uppercase a string value.
    ToUpperCase,
    /// Lowercase a string value.
    ToLowerCase,
    /// Trim surrounding whitespace from a string value.
    Trim,
    /// Join an array of strings into one string.
    JoinWith { separator: String },
    /// Split a string into an array of strings.
    SplitOn { separator: String },
    /// Wrap a scalar into a one-element array.
    WrapInArray,
    /// Take the first element of an array.
    FirstElement,
}

impl Transform {
    /// Apply the instruction. Values the instruction does not apply to are
    /// passed through unchanged, so a misconfigured transform degrades to a
    /// no-op rather than corrupting the payload.
    pub fn apply(&self, value: &Value) -> Value {
        match self {
            Transform::ToUpperCase => match value.as_str() {
                Some(s) => Value::String(s.to_uppercase()),
                None => value.clone(),
            },
            Transform::ToLowerCase => match value.as_str() {
                Some(s) => Value::String(s.to_lowercase()),
                None => value.clone(),
            },
            Transform::Trim => match value.as_str() {
                Some(s) => Value::String(s.trim().to_string()),
                None => value.clone(),
            },
            Transform::JoinWith { separator } => match value.as_array() {
                Some(items) => {
                    let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                    Value::String(parts.join(separator))
                }
                None => value.clone(),
            },
            Transform::SplitOn { separator } => match value.as_str() {
                Some(s) => Value::Array(
                    s.split(separator.as_str())
                        .map(|part| Value::String(part.to_string()))
                        .collect(),
                ),
                None => value.clone(),
            },
            Transform::WrapInArray => Value::Array(vec![value.clone()]),
            Transform::FirstElement => match value.as_array() {
                Some(items) => items.first().cloned().unwrap_or(Value::Null),
                None => value.clone(),
            },
        }
    }
}

/// Post-processing of a server-reported error-path suffix.
///
/// Some servers report errors inside array fields without the element index.
/// The remap restores a usable client path by assuming the first element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorPathRemap {
    /// Prepend index 0 to the reported suffix: `idType` → `0.idType`.
    AssumeFirstItem,
}

impl ErrorPathRemap {
    pub fn apply(&self, suffix: &FieldPath) -> FieldPath {
        match self {
            ErrorPathRemap::AssumeFirstItem => {
                if matches!(suffix.segments().first(), Some(PathSegment::Index(_))) {
                    return suffix.clone();
                }
                FieldPath::parse("0").join(suffix)
            }
        }
    }
}
