//! Field configuration records: rules, conditions, and overrides.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{ClientContext, ContextDimension};

use super::path::FieldPath;
use super::transform::{ErrorPathRemap, Transform};

/// Whether a field is rendered at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Display {
    Visible,
    Hidden,
}

/// How a visible field may be interacted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    Editable,
    Disabled,
    Readonly,
}

/// Effective rule for a scalar field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub display: Display,
    pub interaction: Interaction,
    pub required: bool,
    pub default_value: Option<Value>,
}

impl Default for FieldRule {
    fn default() -> Self {
        Self {
            display: Display::Visible,
            interaction: Interaction::Editable,
            required: false,
            default_value: None,
        }
    }
}

/// Effective rule for an array field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayFieldRule {
    pub display: Display,
    pub interaction: Interaction,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    /// Exact number of items the context demands. Takes precedence over
    /// `min_items` when computing the effective minimum length.
    pub required_items: Option<usize>,
    /// Template object appended when the UI adds a new element.
    pub default_append_value: Option<Value>,
}

impl Default for ArrayFieldRule {
    fn default() -> Self {
        Self {
            display: Display::Visible,
            interaction: Interaction::Editable,
            min_items: None,
            max_items: None,
            required_items: None,
            default_append_value: None,
        }
    }
}

impl ArrayFieldRule {
    /// Effective minimum length: `required_items` beats `min_items`.
    pub fn effective_min(&self) -> usize {
        self.required_items.or(self.min_items).unwrap_or(0)
    }
}

/// The rule a field starts from before conditional overrides apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BaseRule {
    // Scalar first: its mandatory `required` key disambiguates untagged
    // deserialization.
    Scalar(FieldRule),
    Array(ArrayFieldRule),
}

/// Partial rule layered onto the base when its condition matches.
///
/// Merge policy (explicit, most-specific-last): overrides are applied in
/// declaration order and a later matching override wins per key. Keys that
/// do not apply to the field's shape are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleOverride {
    pub display: Option<Display>,
    pub interaction: Option<Interaction>,
    pub required: Option<bool>,
    pub default_value: Option<Value>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub required_items: Option<usize>,
    pub default_append_value: Option<Value>,
}

impl RuleOverride {
    pub fn required(value: bool) -> Self {
        Self {
            required: Some(value),
            ..Default::default()
        }
    }

    pub fn hidden() -> Self {
        Self {
            display: Some(Display::Hidden),
            ..Default::default()
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Shallow-merge the set keys of `self` onto a scalar rule.
    pub fn merge_onto_scalar(&self, rule: &mut FieldRule) {
        if let Some(display) = self.display {
            rule.display = display;
        }
        if let Some(interaction) = self.interaction {
            rule.interaction = interaction;
        }
        if let Some(required) = self.required {
            rule.required = required;
        }
        if let Some(default_value) = &self.default_value {
            rule.default_value = Some(default_value.clone());
        }
    }

    /// Shallow-merge the set keys of `self` onto an array rule.
    pub fn merge_onto_array(&self, rule: &mut ArrayFieldRule) {
        if let Some(display) = self.display {
            rule.display = display;
        }
        if let Some(interaction) = self.interaction {
            rule.interaction = interaction;
        }
        if let Some(min_items) = self.min_items {
            rule.min_items = Some(min_items);
        }
        if let Some(max_items) = self.max_items {
            rule.max_items = Some(max_items);
        }
        if let Some(required_items) = self.required_items {
            rule.required_items = Some(required_items);
        }
        if let Some(default_append_value) = &self.default_append_value {
            rule.default_append_value = Some(default_append_value.clone());
        }
    }
}

/// Context predicate for a conditional rule.
///
/// A dimension left as `None` is a wildcard. A dimension with a set matches
/// only when the context carries a non-empty value that is a member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub products: Option<Vec<String>>,
    pub jurisdictions: Option<Vec<String>>,
    pub entity_types: Option<Vec<String>>,
}

impl Condition {
    pub fn products(values: &[&str]) -> Self {
        Self {
            products: Some(values.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn jurisdictions(values: &[&str]) -> Self {
        Self {
            jurisdictions: Some(values.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn entity_types(values: &[&str]) -> Self {
        Self {
            entity_types: Some(values.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn and_jurisdictions(mut self, values: &[&str]) -> Self {
        self.jurisdictions = Some(values.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn and_entity_types(mut self, values: &[&str]) -> Self {
        self.entity_types = Some(values.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn matches(&self, ctx: &ClientContext) -> bool {
        let dimension_matches = |set: &Option<Vec<String>>, dim: ContextDimension| match set {
            None => true,
            Some(members) => match ctx.dimension(dim) {
                Some(value) => members.iter().any(|m| m == value),
                None => false,
            },
        };

        dimension_matches(&self.products, ContextDimension::Product)
            && dimension_matches(&self.jurisdictions, ContextDimension::Jurisdiction)
            && dimension_matches(&self.entity_types, ContextDimension::EntityType)
    }
}

/// A condition paired with the override it activates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalRule {
    pub condition: Condition,
    pub rule: RuleOverride,
}

/// Declarative description of one logical field: where it lives in the
/// payload and how its effective rule varies by client context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfiguration {
    pub path: FieldPath,
    pub base_rule: BaseRule,
    pub conditional_rules: Vec<ConditionalRule>,
    pub to_request: Option<Transform>,
    pub from_response: Option<Transform>,
    /// Sub-field configurations, present only for array-of-object fields.
    pub sub_fields: Option<HashMap<String, FieldConfiguration>>,
    pub error_path_remap: Option<ErrorPathRemap>,
    /// Present in form state but never written to a request body.
    pub exclude_from_mapping: bool,
}

impl FieldConfiguration {
    /// Scalar field at `path`, visible/editable/not required.
    pub fn scalar(path: &str) -> Self {
        Self {
            path: FieldPath::parse(path),
            base_rule: BaseRule::Scalar(FieldRule::default()),
            conditional_rules: Vec::new(),
            to_request: None,
            from_response: None,
            sub_fields: None,
            error_path_remap: None,
            exclude_from_mapping: false,
        }
    }

    /// Array field at `path`, visible/editable, no bounds.
    pub fn array(path: &str) -> Self {
        Self {
            base_rule: BaseRule::Array(ArrayFieldRule::default()),
            ..Self::scalar(path)
        }
    }

    pub fn required(mut self, value: bool) -> Self {
        if let BaseRule::Scalar(rule) = &mut self.base_rule {
            rule.required = value;
        }
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        if let BaseRule::Scalar(rule) = &mut self.base_rule {
            rule.default_value = Some(value);
        }
        self
    }

    pub fn min_items(mut self, value: usize) -> Self {
        if let BaseRule::Array(rule) = &mut self.base_rule {
            rule.min_items = Some(value);
        }
        self
    }

    pub fn max_items(mut self, value: usize) -> Self {
        if let BaseRule::Array(rule) = &mut self.base_rule {
            rule.max_items = Some(value);
        }
        self
    }

    pub fn default_append_value(mut self, value: Value) -> Self {
        if let BaseRule::Array(rule) = &mut self.base_rule {
            rule.default_append_value = Some(value);
        }
        self
    }

    /// Add a conditional override. Declaration order is merge order.
    pub fn when(mut self, condition: Condition, rule: RuleOverride) -> Self {
        self.conditional_rules.push(ConditionalRule { condition, rule });
        self
    }

    pub fn to_request(mut self, transform: Transform) -> Self {
        self.to_request = Some(transform);
        self
    }

    pub fn from_response(mut self, transform: Transform) -> Self {
        self.from_response = Some(transform);
        self
    }

    pub fn sub_field(mut self, name: &str, config: FieldConfiguration) -> Self {
        self.sub_fields
            .get_or_insert_with(HashMap::new)
            .insert(name.to_string(), config);
        self
    }

    pub fn error_path_remap(mut self, remap: ErrorPathRemap) -> Self {
        self.error_path_remap = Some(remap);
        self
    }

    pub fn exclude_from_mapping(mut self) -> Self {
        self.exclude_from_mapping = true;
        self
    }

    pub fn is_array(&self) -> bool {
        matches!(self.base_rule, BaseRule::Array(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wildcard_condition_matches_empty_context() {
        let condition = Condition::default();
        assert!(condition.matches(&ClientContext::default()));
    }

    #[test]
    fn specified_dimension_requires_membership() {
        let condition = Condition::jurisdictions(&["US"]);
        assert!(condition.matches(&ClientContext::new(None, Some("US"), None)));
        assert!(!condition.matches(&ClientContext::new(None, Some("CA"), None)));
        // Absent context value never matches a specified dimension.
        assert!(!condition.matches(&ClientContext::default()));
    }

    #[test]
    fn all_specified_dimensions_must_match() {
        let condition = Condition::products(&["EMBEDDED_PAYMENTS"]).and_jurisdictions(&["US"]);
        let both = ClientContext::new(Some("EMBEDDED_PAYMENTS"), Some("US"), None);
        let one = ClientContext::new(Some("EMBEDDED_PAYMENTS"), Some("CA"), None);
        assert!(condition.matches(&both));
        assert!(!condition.matches(&one));
    }

    #[test]
    fn override_merge_is_shallow() {
        let mut rule = FieldRule {
            required: true,
            default_value: Some(json!("US")),
            ..Default::default()
        };
        RuleOverride::required(false).merge_onto_scalar(&mut rule);
        assert!(!rule.required);
        // Unset keys are untouched.
        assert_eq!(rule.default_value, Some(json!("US")));
        assert_eq!(rule.display, Display::Visible);
    }

    #[test]
    fn required_items_beats_min_items() {
        let rule = ArrayFieldRule {
            min_items: Some(1),
            required_items: Some(2),
            ..Default::default()
        };
        assert_eq!(rule.effective_min(), 2);
    }
}
