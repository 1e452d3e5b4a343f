//! Typed payload paths.
//!
//! Paths into request/response payloads are parsed once, when the registry is
//! built, into a list of typed segments. Writers and readers walk the
//! segments directly instead of re-parsing dotted strings on every access.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// One step of a payload path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Named key inside an object container.
    Field(String),
    /// Position inside an array container.
    Index(usize),
}

/// A precompiled location in a nested payload, e.g. `phone.phoneNumber` or
/// `addresses.0.addressLines.0`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parse a dotted path. Purely numeric segments become `Index` segments.
    pub fn parse(path: &str) -> Self {
        let segments = path
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| match s.parse::<usize>() {
                Ok(i) => PathSegment::Index(i),
                Err(_) => PathSegment::Field(s.to_string()),
            })
            .collect();
        Self { segments }
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Extend with a suffix path, returning a new path.
    pub fn join(&self, suffix: &FieldPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(suffix.segments.iter().cloned());
        Self { segments }
    }

    /// Whether `self` is a (dot-boundary) prefix of `other`.
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        other.segments.len() >= self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// The remaining segments of `other` after stripping `self` as a prefix.
    pub fn suffix_of<'a>(&self, other: &'a FieldPath) -> Option<&'a [PathSegment]> {
        if self.is_prefix_of(other) {
            Some(&other.segments[self.segments.len()..])
        } else {
            None
        }
    }

    /// Write `value` at this path inside `target`, creating intermediate
    /// containers on demand: an `Index` segment creates an array, a `Field`
    /// segment creates an object.
    pub fn write(&self, target: &mut Value, value: Value) {
        let mut current = target;
        for (i, segment) in self.segments.iter().enumerate() {
            let last = i + 1 == self.segments.len();
            match segment {
                PathSegment::Field(name) => {
                    if !current.is_object() {
                        *current = Value::Object(Map::new());
                    }
                    let Value::Object(map) = current else {
                        return;
                    };
                    if last {
                        map.insert(name.clone(), value);
                        return;
                    }
                    current = map.entry(name.clone()).or_insert(Value::Null);
                }
                PathSegment::Index(index) => {
                    if !current.is_array() {
                        *current = Value::Array(Vec::new());
                    }
                    let Value::Array(arr) = current else {
                        return;
                    };
                    while arr.len() <= *index {
                        arr.push(Value::Null);
                    }
                    if last {
                        arr[*index] = value;
                        return;
                    }
                    current = &mut arr[*index];
                }
            }
        }
    }

    /// Read the value at this path out of `source`, if present.
    pub fn read<'a>(&self, source: &'a Value) -> Option<&'a Value> {
        let mut current = source;
        for segment in &self.segments {
            current = match segment {
                PathSegment::Field(name) => current.as_object()?.get(name)?,
                PathSegment::Index(index) => current.as_array()?.get(*index)?,
            };
        }
        Some(current)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Field(name) => f.write_str(name)?,
                PathSegment::Index(index) => write!(f, "{index}")?,
            }
        }
        Ok(())
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

// Paths serialize as their dotted form.
impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let path = String::deserialize(deserializer)?;
        Ok(Self::parse(&path))
    }
}
