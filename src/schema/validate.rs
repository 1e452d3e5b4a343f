//! Validation of staged form values against a derived schema.
//!
//! Validation collects every violation instead of stopping at the first,
//! and never fails with an error: a value that does not satisfy its rule is
//! data, not a bug. Violations carry structured parameters so the caller's
//! i18n layer can render them; the engine never builds display strings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{DerivedSchema, ObjectField, Refinement, ScalarType, SchemaNode};

/// Why a field failed validation, with interpolation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    Required,
    InvalidType { expected: String },
    TooShort { min_len: usize },
    TooLong { max_len: usize },
    NotOneOf { allowed: Vec<String> },
    MinItems { min: usize },
    MaxItems { max: usize },
    RequiredItems { count: usize },
    DuplicateItems { field: String },
    /// Raised by a caller-supplied cross-field refine function.
    CrossField { rule: String },
}

/// One violation bound to a form field path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub kind: ViolationKind,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

/// Outcome of validating one step's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepValidation {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl DerivedSchema {
    /// Validate `values` against this derived schema.
    pub fn validate(&self, values: &Map<String, Value>) -> StepValidation {
        let mut issues = Vec::new();
        validate_fields(&self.fields, values, "", &mut issues);
        if let Some(refine) = self.refine {
            issues.extend(refine(values));
        }
        StepValidation {
            is_valid: issues.is_empty(),
            issues,
        }
    }
}

fn field_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Absent, null, and empty-string values all count as "not provided".
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn validate_fields(
    fields: &[ObjectField],
    values: &Map<String, Value>,
    prefix: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    for field in fields {
        let path = field_path(prefix, &field.name);
        let value = values.get(&field.name);
        let (wrappers, inner) = field.node.unwrap_refinements();

        match inner {
            SchemaNode::Scalar(scalar) => {
                if is_missing(value) {
                    if field.required {
                        issues.push(ValidationIssue::new(&path, ViolationKind::Required));
                    }
                    continue;
                }
                if let Some(value) = value {
                    validate_scalar(scalar, value, &path, issues);
                }
            }
            SchemaNode::Array {
                element,
                min_items,
                max_items,
                required_items,
            } => {
                let empty = Vec::new();
                let items = match value {
                    None | Some(Value::Null) => &empty,
                    Some(Value::Array(items)) => items,
                    Some(_) => {
                        issues.push(ValidationIssue::new(
                            &path,
                            ViolationKind::InvalidType {
                                expected: "array".into(),
                            },
                        ));
                        continue;
                    }
                };

                if items.len() < *min_items {
                    let kind = match required_items {
                        Some(count) => ViolationKind::RequiredItems { count: *count },
                        None => ViolationKind::MinItems { min: *min_items },
                    };
                    issues.push(ValidationIssue::new(&path, kind));
                }
                if let Some(max) = max_items {
                    if items.len() > *max {
                        issues.push(ValidationIssue::new(
                            &path,
                            ViolationKind::MaxItems { max: *max },
                        ));
                    }
                }

                for refinement in &wrappers {
                    validate_refinement(refinement, items, &path, issues);
                }

                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{path}.{index}");
                    match element.as_ref() {
                        SchemaNode::Object { fields } => match item.as_object() {
                            Some(item_values) => {
                                validate_fields(fields, item_values, &item_path, issues);
                            }
                            None => issues.push(ValidationIssue::new(
                                &item_path,
                                ViolationKind::InvalidType {
                                    expected: "object".into(),
                                },
                            )),
                        },
                        SchemaNode::Scalar(scalar) => {
                            validate_scalar(scalar, item, &item_path, issues);
                        }
                        _ => {}
                    }
                }
            }
            // Root objects do not occur in derived schemas; the deriver
            // rejects them as unsupported shapes.
            SchemaNode::Object { .. } | SchemaNode::Refined { .. } => {}
        }
    }
}

fn validate_scalar(
    scalar: &ScalarType,
    value: &Value,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    match scalar {
        ScalarType::Text { min_len, max_len } => {
            let Some(text) = value.as_str() else {
                issues.push(ValidationIssue::new(
                    path,
                    ViolationKind::InvalidType {
                        expected: "string".into(),
                    },
                ));
                return;
            };
            let length = text.chars().count();
            if let Some(min) = min_len {
                if length < *min {
                    issues.push(ValidationIssue::new(
                        path,
                        ViolationKind::TooShort { min_len: *min },
                    ));
                }
            }
            if let Some(max) = max_len {
                if length > *max {
                    issues.push(ValidationIssue::new(
                        path,
                        ViolationKind::TooLong { max_len: *max },
                    ));
                }
            }
        }
        ScalarType::Boolean => {
            if !value.is_boolean() {
                issues.push(ValidationIssue::new(
                    path,
                    ViolationKind::InvalidType {
                        expected: "boolean".into(),
                    },
                ));
            }
        }
        ScalarType::Number => {
            if !value.is_number() {
                issues.push(ValidationIssue::new(
                    path,
                    ViolationKind::InvalidType {
                        expected: "number".into(),
                    },
                ));
            }
        }
        ScalarType::OneOf { allowed } => {
            let member = value
                .as_str()
                .map(|s| allowed.iter().any(|a| a == s))
                .unwrap_or(false);
            if !member {
                issues.push(ValidationIssue::new(
                    path,
                    ViolationKind::NotOneOf {
                        allowed: allowed.clone(),
                    },
                ));
            }
        }
    }
}

fn validate_refinement(
    refinement: &Refinement,
    items: &[Value],
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    match refinement {
        Refinement::UniqueBy { field } => {
            let mut seen = Vec::new();
            for item in items {
                let Some(key) = item.get(field).filter(|v| !v.is_null()) else {
                    continue;
                };
                if seen.contains(&key) {
                    issues.push(ValidationIssue::new(
                        path,
                        ViolationKind::DuplicateItems {
                            field: field.clone(),
                        },
                    ));
                    return;
                }
                seen.push(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::context::ClientContext;
    use crate::registry::FieldConfigurationRegistry;
    use crate::registry::config::FieldConfiguration;
    use crate::schema::derive::SchemaDeriver;
    use crate::schema::{CanonicalSchema, field};

    fn values(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn derived_for(
        registry: &FieldConfigurationRegistry,
        schema: &CanonicalSchema,
        ctx: &ClientContext,
    ) -> DerivedSchema {
        SchemaDeriver::new(registry).derive(schema, ctx, None).unwrap()
    }

    #[test]
    fn required_scalar_rejects_absent_and_empty() {
        let mut registry = FieldConfigurationRegistry::empty();
        registry.insert("name", FieldConfiguration::scalar("name").required(true));
        let schema = CanonicalSchema::new(vec![field("name", SchemaNode::text())]);
        let derived = derived_for(&registry, &schema, &ClientContext::default());

        let absent = derived.validate(&Map::new());
        assert!(!absent.is_valid);
        assert_eq!(absent.issues[0].kind, ViolationKind::Required);

        let empty = derived.validate(&values(json!({ "name": "" })));
        assert!(!empty.is_valid);

        let present = derived.validate(&values(json!({ "name": "Acme" })));
        assert!(present.is_valid);
    }

    #[test]
    fn optional_scalar_accepts_absent_and_empty() {
        let mut registry = FieldConfigurationRegistry::empty();
        registry.insert("website", FieldConfiguration::scalar("website"));
        let schema = CanonicalSchema::new(vec![field("website", SchemaNode::text_bounded(4, 100))]);
        let derived = derived_for(&registry, &schema, &ClientContext::default());

        assert!(derived.validate(&Map::new()).is_valid);
        assert!(derived.validate(&values(json!({ "website": "" }))).is_valid);
        // A provided value is still type-checked.
        let short = derived.validate(&values(json!({ "website": "x" })));
        assert_eq!(short.issues[0].kind, ViolationKind::TooShort { min_len: 4 });
    }

    #[test]
    fn min_items_rejects_empty_array() {
        let mut registry = FieldConfigurationRegistry::empty();
        registry.insert(
            "beneficialOwners",
            FieldConfiguration::array("beneficialOwners")
                .min_items(1)
                .sub_field("firstName", FieldConfiguration::scalar("firstName").required(true)),
        );
        let schema = CanonicalSchema::new(vec![field(
            "beneficialOwners",
            SchemaNode::array_of(SchemaNode::object(vec![field(
                "firstName",
                SchemaNode::text(),
            )])),
        )]);
        let derived = derived_for(&registry, &schema, &ClientContext::default());

        let empty = derived.validate(&values(json!({ "beneficialOwners": [] })));
        assert_eq!(
            empty.issues[0].kind,
            ViolationKind::MinItems { min: 1 },
            "bare minimum uses the min_items message"
        );

        let one = derived.validate(&values(json!({
            "beneficialOwners": [{ "firstName": "Ada" }]
        })));
        assert!(one.is_valid);
    }

    #[test]
    fn required_items_takes_precedence_and_names_the_count() {
        let mut registry = FieldConfigurationRegistry::empty();
        registry.insert(
            "owners",
            FieldConfiguration::array("owners")
                .min_items(1)
                .when(
                    crate::registry::config::Condition::default(),
                    crate::registry::config::RuleOverride {
                        required_items: Some(2),
                        ..Default::default()
                    },
                )
                .sub_field("name", FieldConfiguration::scalar("name")),
        );
        let schema = CanonicalSchema::new(vec![field(
            "owners",
            SchemaNode::array_of(SchemaNode::object(vec![field("name", SchemaNode::text())])),
        )]);
        let derived = derived_for(&registry, &schema, &ClientContext::default());

        let one = derived.validate(&values(json!({ "owners": [{ "name": "a" }] })));
        assert_eq!(one.issues[0].kind, ViolationKind::RequiredItems { count: 2 });

        let two = derived.validate(&values(json!({
            "owners": [{ "name": "a" }, { "name": "b" }]
        })));
        assert!(two.is_valid);
    }

    #[test]
    fn element_issues_carry_indexed_paths() {
        let registry = FieldConfigurationRegistry::standard();
        let schema = CanonicalSchema::new(vec![field(
            "beneficialOwners",
            SchemaNode::array_of(SchemaNode::object(vec![
                field("firstName", SchemaNode::text()),
                field("lastName", SchemaNode::text()),
                field("role", SchemaNode::text()),
                field("ownershipPercentage", SchemaNode::number()),
            ])),
        )]);
        let ctx = ClientContext::new(
            Some("EMBEDDED_PAYMENTS"),
            Some("US"),
            Some("LIMITED_LIABILITY_COMPANY"),
        );
        let derived = derived_for(&registry, &schema, &ctx);

        let result = derived.validate(&values(json!({
            "beneficialOwners": [
                { "firstName": "Ada", "lastName": "Lovelace", "ownershipPercentage": 60 },
                { "firstName": "Grace", "lastName": "", "ownershipPercentage": 40 }
            ]
        })));
        assert!(!result.is_valid);
        let fields: Vec<&str> = result.issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, ["beneficialOwners.1.lastName"]);
    }

    #[test]
    fn unique_by_refinement_flags_duplicates() {
        let mut registry = FieldConfigurationRegistry::empty();
        registry.insert(
            "owners",
            FieldConfiguration::array("owners")
                .sub_field("email", FieldConfiguration::scalar("email")),
        );
        let schema = CanonicalSchema::new(vec![field(
            "owners",
            SchemaNode::array_of(SchemaNode::object(vec![field("email", SchemaNode::text())]))
                .refined(Refinement::UniqueBy {
                    field: "email".into(),
                }),
        )]);
        let derived = derived_for(&registry, &schema, &ClientContext::default());

        let result = derived.validate(&values(json!({
            "owners": [{ "email": "a@b.co" }, { "email": "a@b.co" }]
        })));
        assert_eq!(
            result.issues[0].kind,
            ViolationKind::DuplicateItems {
                field: "email".into()
            }
        );
    }

    #[test]
    fn refine_runs_after_field_checks() {
        let mut registry = FieldConfigurationRegistry::empty();
        registry.insert("type", FieldConfiguration::scalar("type").required(true));
        registry.insert("firstName", FieldConfiguration::scalar("firstName"));
        let schema = CanonicalSchema::new(vec![
            field("type", SchemaNode::one_of(&["INDIVIDUAL", "ORGANIZATION"])),
            field("firstName", SchemaNode::text()),
        ]);

        fn individual_needs_first_name(values: &Map<String, Value>) -> Vec<ValidationIssue> {
            let is_individual = values.get("type").and_then(Value::as_str) == Some("INDIVIDUAL");
            if is_individual && is_missing(values.get("firstName")) {
                return vec![ValidationIssue::new(
                    "firstName",
                    ViolationKind::CrossField {
                        rule: "individual_requires_first_name".into(),
                    },
                )];
            }
            Vec::new()
        }

        let derived = SchemaDeriver::new(&registry)
            .derive(&schema, &ClientContext::default(), Some(individual_needs_first_name))
            .unwrap();

        let bad = derived.validate(&values(json!({ "type": "INDIVIDUAL" })));
        assert!(bad
            .issues
            .iter()
            .any(|i| matches!(i.kind, ViolationKind::CrossField { .. })));

        let ok = derived.validate(&values(json!({
            "type": "INDIVIDUAL",
            "firstName": "Ada"
        })));
        assert!(ok.is_valid);
    }

    #[test]
    fn one_of_rejects_non_members() {
        let mut registry = FieldConfigurationRegistry::empty();
        registry.insert("status", FieldConfiguration::scalar("status").required(true));
        let schema = CanonicalSchema::new(vec![field("status", SchemaNode::one_of(&["NEW", "APPROVED"]))]);
        let derived = derived_for(&registry, &schema, &ClientContext::default());

        let bad = derived.validate(&values(json!({ "status": "PENDING" })));
        assert!(matches!(bad.issues[0].kind, ViolationKind::NotOneOf { .. }));
    }
}
