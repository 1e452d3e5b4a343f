//! Canonical validation schemas as an explicit internal tree.
//!
//! The engine owns its schema representation instead of introspecting a
//! third-party validator's runtime types. A canonical schema is an ordered
//! set of named root fields; each field is a scalar, an array, an object,
//! or a refinement wrapper around one of those.

pub mod derive;
pub mod validate;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use validate::ValidationIssue;

/// Accepted shape of a scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalarType {
    /// Free text with optional length bounds.
    Text {
        min_len: Option<usize>,
        max_len: Option<usize>,
    },
    Boolean,
    Number,
    /// String restricted to a fixed set of values.
    OneOf { allowed: Vec<String> },
}

/// Whole-array invariants that survive derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Refinement {
    /// No two elements may share a value at `field`.
    UniqueBy { field: String },
}

/// One node of a schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaNode {
    Scalar(ScalarType),
    Array {
        element: Box<SchemaNode>,
        min_items: usize,
        max_items: Option<usize>,
        /// Exact item count demanded by the resolved rule, set during
        /// derivation. Canonical schemas leave this unset.
        required_items: Option<usize>,
    },
    Object {
        fields: Vec<ObjectField>,
    },
    /// A node with an attached whole-value invariant.
    Refined {
        inner: Box<SchemaNode>,
        refinement: Refinement,
    },
}

/// Named field inside an object node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectField {
    pub name: String,
    pub node: SchemaNode,
    pub required: bool,
}

impl SchemaNode {
    pub fn text() -> Self {
        SchemaNode::Scalar(ScalarType::Text {
            min_len: None,
            max_len: None,
        })
    }

    pub fn text_bounded(min_len: usize, max_len: usize) -> Self {
        SchemaNode::Scalar(ScalarType::Text {
            min_len: Some(min_len),
            max_len: Some(max_len),
        })
    }

    pub fn boolean() -> Self {
        SchemaNode::Scalar(ScalarType::Boolean)
    }

    pub fn number() -> Self {
        SchemaNode::Scalar(ScalarType::Number)
    }

    pub fn one_of(allowed: &[&str]) -> Self {
        SchemaNode::Scalar(ScalarType::OneOf {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn array_of(element: SchemaNode) -> Self {
        SchemaNode::Array {
            element: Box::new(element),
            min_items: 0,
            max_items: None,
            required_items: None,
        }
    }

    pub fn object(fields: Vec<ObjectField>) -> Self {
        SchemaNode::Object { fields }
    }

    pub fn refined(self, refinement: Refinement) -> Self {
        SchemaNode::Refined {
            inner: Box::new(self),
            refinement,
        }
    }

    /// Peel refinement wrappers, returning the wrappers outermost-first and
    /// the underlying node.
    pub(crate) fn unwrap_refinements(&self) -> (Vec<&Refinement>, &SchemaNode) {
        let mut wrappers = Vec::new();
        let mut node = self;
        while let SchemaNode::Refined { inner, refinement } = node {
            wrappers.push(refinement);
            node = inner;
        }
        (wrappers, node)
    }
}

/// Helper for building object fields; canonical fields start required.
pub fn field(name: &str, node: SchemaNode) -> ObjectField {
    ObjectField {
        name: name.to_string(),
        node,
        required: true,
    }
}

/// A per-step canonical schema: the ordered root fields of one form step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSchema {
    pub fields: Vec<ObjectField>,
}

impl CanonicalSchema {
    pub fn new(fields: Vec<ObjectField>) -> Self {
        Self { fields }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Cross-field invariant supplied by the caller per step, applied after
/// per-field validation.
pub type RefineFn = fn(&Map<String, Value>) -> Vec<ValidationIssue>;

/// A context-specific schema produced by derivation. Hidden fields are
/// absent; optionality reflects the resolved rules, not the canonical
/// defaults.
#[derive(Debug, Clone)]
pub struct DerivedSchema {
    pub fields: Vec<ObjectField>,
    pub refine: Option<RefineFn>,
}

impl DerivedSchema {
    /// Whether the derived schema contains `name` at the root.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ObjectField> {
        self.fields.iter().find(|f| f.name == name)
    }
}
