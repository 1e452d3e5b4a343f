//! Client context — the classification triple that parameterizes field rules.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::flow::ClientRecord;

/// The three optional classification dimensions a rule condition can key on.
///
/// Resolved once per evaluation: live form values win over the persisted
/// client record, per dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    /// Product line, e.g. `"EMBEDDED_PAYMENTS"`.
    pub product: Option<String>,
    /// Country of formation / operating jurisdiction, e.g. `"US"`.
    pub jurisdiction: Option<String>,
    /// Legal entity type, e.g. `"SOLE_PROPRIETORSHIP"`.
    pub entity_type: Option<String>,
}

impl ClientContext {
    pub fn new(
        product: Option<&str>,
        jurisdiction: Option<&str>,
        entity_type: Option<&str>,
    ) -> Self {
        Self {
            product: product.map(String::from),
            jurisdiction: jurisdiction.map(String::from),
            entity_type: entity_type.map(String::from),
        }
    }

    /// Resolve the context from staged form values, falling back to the
    /// persisted client record for dimensions the form has not touched.
    pub fn from_sources(staged: &Map<String, Value>, record: Option<&ClientRecord>) -> Self {
        let staged_dim = |key: &str| {
            staged
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        Self {
            product: staged_dim("product").or_else(|| record.and_then(|r| r.product.clone())),
            jurisdiction: staged_dim("countryOfFormation")
                .or_else(|| record.and_then(|r| r.jurisdiction())),
            entity_type: staged_dim("organizationType")
                .or_else(|| record.and_then(|r| r.entity_type())),
        }
    }

    /// Value of a named dimension, if set and non-empty.
    pub fn dimension(&self, name: ContextDimension) -> Option<&str> {
        let value = match name {
            ContextDimension::Product => self.product.as_deref(),
            ContextDimension::Jurisdiction => self.jurisdiction.as_deref(),
            ContextDimension::EntityType => self.entity_type.as_deref(),
        };
        value.filter(|s| !s.is_empty())
    }
}

/// Names of the context dimensions, used when evaluating conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextDimension {
    Product,
    Jurisdiction,
    EntityType,
}
