//! Bidirectional translation between server payloads and form values.
//!
//! Forward: structured server validation errors → form-bound errors.
//! Reverse: submitted form values → nested request bodies.
//! Response: server party records → flat form values.

pub mod request;
pub mod response;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::registry::FieldConfigurationRegistry;
use crate::registry::config::FieldConfiguration;
use crate::registry::path::{FieldPath, PathSegment};

/// One validation error as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerValidationError {
    /// Server-reported payload path, bracket-index notation allowed.
    pub field: Option<String>,
    pub message: String,
}

/// A server error reconciled with the client field naming scheme.
///
/// `field` is absent when no configuration matched; the caller shows the
/// message generically (form-level banner) instead of dropping it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormError {
    pub field: Option<String>,
    pub message: String,
    /// Normalized server-reported path, kept for diagnostics.
    pub path: Option<String>,
}

/// Shape of the payload the server validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadScope {
    /// Paths are party-relative (`organizationDetails.taxId`).
    SingleParty,
    /// Paths are wrapped in a party collection (`parties[0].…` or
    /// `addParties[0].…`).
    PartyCollection,
}

static BRACKET_INDEX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(\d+)\]").unwrap());

/// Rewrite bracket-index notation to dot notation: `parties[0].a` → `parties.0.a`.
fn normalize_server_path(path: &str) -> String {
    BRACKET_INDEX_RE.replace_all(path, ".$1").into_owned()
}

/// Strip a `parties.<i>.` / `addParties.<i>.` collection prefix, if present.
fn party_relative(segments: &[PathSegment]) -> &[PathSegment] {
    match segments {
        [PathSegment::Field(container), PathSegment::Index(_), rest @ ..]
            if container == "parties" || container == "addParties" =>
        {
            rest
        }
        _ => segments,
    }
}

/// Map server validation errors onto client form fields.
///
/// Each reported path is matched against every configured field's payload
/// path (longest match wins). Servers are observed to omit array indices
/// inconsistently, so when the matched suffix starts at a field instead of
/// an index a second defensive error is emitted assuming index 0. Paths that
/// match nothing are surfaced unbound rather than dropped.
pub fn map_server_errors_to_form_errors(
    errors: &[ServerValidationError],
    registry: &FieldConfigurationRegistry,
    scope: PayloadScope,
) -> Vec<FormError> {
    let mut form_errors = Vec::new();

    for error in errors {
        let Some(raw_path) = error.field.as_deref() else {
            form_errors.push(FormError {
                field: None,
                message: error.message.clone(),
                path: None,
            });
            continue;
        };

        let normalized = normalize_server_path(raw_path);
        let server_path = FieldPath::parse(&normalized);
        let relative = match scope {
            PayloadScope::SingleParty => server_path.segments(),
            PayloadScope::PartyCollection => party_relative(server_path.segments()),
        };
        let relative = FieldPath::from_segments(relative.to_vec());

        match best_match(registry, &relative) {
            Some((field_id, config)) => {
                let suffix = config
                    .path
                    .suffix_of(&relative)
                    .map(|s| FieldPath::from_segments(s.to_vec()))
                    .unwrap_or_default();
                let suffix = match &config.error_path_remap {
                    Some(remap) if !suffix.is_empty() => remap.apply(&suffix),
                    _ => suffix,
                };

                form_errors.push(FormError {
                    field: Some(bind(field_id, &suffix)),
                    message: error.message.clone(),
                    path: Some(normalized.clone()),
                });

                // Suffix enters a sub-array without an index: also bind the
                // first element, since servers omit indices inconsistently.
                if matches!(suffix.segments().first(), Some(PathSegment::Field(_))) {
                    let indexed = FieldPath::parse("0").join(&suffix);
                    form_errors.push(FormError {
                        field: Some(bind(field_id, &indexed)),
                        message: error.message.clone(),
                        path: Some(normalized.clone()),
                    });
                }
            }
            None => {
                warn!(
                    path = %normalized,
                    message = %error.message,
                    "Server error path matches no field configuration"
                );
                form_errors.push(FormError {
                    field: None,
                    message: error.message.clone(),
                    path: Some(normalized),
                });
            }
        }
    }

    form_errors
}

/// The configured field whose payload path is the longest prefix of
/// `relative`, if any.
fn best_match<'a>(
    registry: &'a FieldConfigurationRegistry,
    relative: &FieldPath,
) -> Option<(&'a String, &'a FieldConfiguration)> {
    registry
        .iter()
        .filter(|(_, config)| config.path.is_prefix_of(relative))
        .max_by_key(|(_, config)| config.path.segments().len())
}

fn bind(field_id: &str, suffix: &FieldPath) -> String {
    if suffix.is_empty() {
        field_id.to_string()
    } else {
        format!("{field_id}.{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::registry::config::FieldConfiguration;
    use crate::registry::transform::ErrorPathRemap;

    fn server_error(field: &str, message: &str) -> ServerValidationError {
        ServerValidationError {
            field: Some(field.to_string()),
            message: message.to_string(),
        }
    }

    #[test]
    fn binds_party_collection_path_to_configured_field() {
        // Scenario: path "address.line1" configured inside a parties collection.
        let mut registry = FieldConfigurationRegistry::empty();
        registry.insert("address.line1", FieldConfiguration::scalar("address.line1"));

        let errors = map_server_errors_to_form_errors(
            &[server_error("parties[0].address.line1", "required")],
            &registry,
            PayloadScope::PartyCollection,
        );

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field.as_deref(), Some("address.line1"));
        assert_eq!(errors[0].message, "required");
        assert_eq!(errors[0].path.as_deref(), Some("parties.0.address.line1"));
    }

    #[test]
    fn add_parties_prefix_is_also_recognized() {
        let registry = FieldConfigurationRegistry::standard();
        let errors = map_server_errors_to_form_errors(
            &[server_error(
                "addParties[0].organizationDetails.taxId",
                "invalid tax id",
            )],
            &registry,
            PayloadScope::PartyCollection,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field.as_deref(), Some("taxId"));
    }

    #[test]
    fn single_party_scope_matches_bare_paths() {
        let registry = FieldConfigurationRegistry::standard();
        let errors = map_server_errors_to_form_errors(
            &[server_error("organizationDetails.organizationName", "too long")],
            &registry,
            PayloadScope::SingleParty,
        );
        assert_eq!(errors[0].field.as_deref(), Some("organizationName"));
    }

    #[test]
    fn unindexed_sub_array_suffix_gets_a_defensive_duplicate() {
        let registry = FieldConfigurationRegistry::standard();
        let errors = map_server_errors_to_form_errors(
            &[server_error(
                "parties[0].organizationDetails.addresses.line1",
                "required",
            )],
            &registry,
            PayloadScope::PartyCollection,
        );

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field.as_deref(), Some("addresses.line1"));
        assert_eq!(errors[1].field.as_deref(), Some("addresses.0.line1"));
    }

    #[test]
    fn indexed_suffix_is_bound_once() {
        let registry = FieldConfigurationRegistry::standard();
        let errors = map_server_errors_to_form_errors(
            &[server_error(
                "parties[0].organizationDetails.addresses[1].city",
                "required",
            )],
            &registry,
            PayloadScope::PartyCollection,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field.as_deref(), Some("addresses.1.city"));
    }

    #[test]
    fn error_path_remap_restores_the_missing_index() {
        let registry = FieldConfigurationRegistry::standard();
        // organizationIds carries AssumeFirstItem.
        assert_eq!(
            registry.get("organizationIds").unwrap().error_path_remap,
            Some(ErrorPathRemap::AssumeFirstItem)
        );

        let errors = map_server_errors_to_form_errors(
            &[server_error(
                "parties[0].organizationDetails.organizationIds.value",
                "invalid EIN",
            )],
            &registry,
            PayloadScope::PartyCollection,
        );

        // Remap already indexed the suffix, so no defensive duplicate.
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field.as_deref(), Some("organizationIds.0.value"));
    }

    #[test]
    fn unmatched_path_surfaces_unbound() {
        let registry = FieldConfigurationRegistry::standard();
        let errors = map_server_errors_to_form_errors(
            &[server_error("parties[0].somethingUnknown", "mystery")],
            &registry,
            PayloadScope::PartyCollection,
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].field.is_none());
        assert_eq!(errors[0].message, "mystery");
        assert_eq!(errors[0].path.as_deref(), Some("parties.0.somethingUnknown"));
    }

    #[test]
    fn error_without_a_path_is_passed_through() {
        let registry = FieldConfigurationRegistry::standard();
        let errors = map_server_errors_to_form_errors(
            &[ServerValidationError {
                field: None,
                message: "client not onboardable".into(),
            }],
            &registry,
            PayloadScope::PartyCollection,
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].field.is_none());
        assert!(errors[0].path.is_none());
    }

    #[test]
    fn longest_configured_path_wins() {
        let mut registry = FieldConfigurationRegistry::empty();
        registry.insert("details", FieldConfiguration::scalar("organizationDetails"));
        registry.insert(
            "organizationName",
            FieldConfiguration::scalar("organizationDetails.organizationName"),
        );

        let errors = map_server_errors_to_form_errors(
            &[server_error("organizationDetails.organizationName", "bad")],
            &registry,
            PayloadScope::SingleParty,
        );
        assert_eq!(errors[0].field.as_deref(), Some("organizationName"));
    }
}
