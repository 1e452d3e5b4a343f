//! Request body generation from submitted form values.

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::registry::FieldConfigurationRegistry;
use crate::registry::path::{FieldPath, PathSegment};

/// Values the writer skips: the server treats them as "not provided".
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Build a single party object from submitted form values.
///
/// Every non-empty leaf is located through its field configuration, run
/// through its `to_request` transform, and written at its configured payload
/// path, creating intermediate containers on demand. Fields marked
/// `exclude_from_mapping` and keys with no configuration are skipped.
pub fn generate_party_request_body(
    values: &Map<String, Value>,
    registry: &FieldConfigurationRegistry,
) -> Value {
    let mut body = Value::Object(Map::new());

    for (key, value) in values {
        if is_empty_value(value) {
            continue;
        }
        let Some(config) = registry.get(key) else {
            debug!(field = key, "Submitted value has no field configuration, skipped");
            continue;
        };
        if config.exclude_from_mapping {
            continue;
        }

        match (&config.sub_fields, value) {
            (Some(sub_fields), Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    let Some(item_values) = item.as_object() else {
                        continue;
                    };
                    for (sub_key, sub_value) in item_values {
                        if is_empty_value(sub_value) {
                            continue;
                        }
                        let Some(sub_config) = sub_fields.get(sub_key) else {
                            debug!(
                                field = key,
                                sub_field = sub_key,
                                "Sub-field has no configuration, skipped"
                            );
                            continue;
                        };
                        if sub_config.exclude_from_mapping {
                            continue;
                        }
                        let written = match &sub_config.to_request {
                            Some(transform) => transform.apply(sub_value),
                            None => sub_value.clone(),
                        };
                        let element_path = config
                            .path
                            .join(&FieldPath::from_segments(vec![PathSegment::Index(index)]))
                            .join(&sub_config.path);
                        element_path.write(&mut body, written);
                    }
                }
            }
            _ => {
                let written = match &config.to_request {
                    Some(transform) => transform.apply(value),
                    None => value.clone(),
                };
                config.path.write(&mut body, written);
            }
        }
    }

    body
}

/// Build the full onboarding request body: the party wrapped in the
/// `addParties` collection.
pub fn generate_request_body(
    values: &Map<String, Value>,
    registry: &FieldConfigurationRegistry,
) -> Value {
    json!({ "addParties": [generate_party_request_body(values, registry)] })
}
