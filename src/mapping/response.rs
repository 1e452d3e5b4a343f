//! Response-to-form-values conversion.

use serde_json::{Map, Value};

use crate::registry::FieldConfigurationRegistry;

/// Read every configured field out of a server response object, producing
/// the flat form-value map the form layer binds to.
///
/// With a `party_id`, the walk starts at the matching element of the
/// response's `parties` array; otherwise the response itself is treated as
/// the party. `from_response` transforms are applied; absent values and
/// empty arrays are skipped.
pub fn convert_response_to_form_values(
    response: &Value,
    registry: &FieldConfigurationRegistry,
    party_id: Option<&str>,
) -> Map<String, Value> {
    let source = match party_id {
        Some(id) => {
            let party = response
                .get("parties")
                .and_then(Value::as_array)
                .and_then(|parties| {
                    parties
                        .iter()
                        .find(|p| p.get("id").and_then(Value::as_str) == Some(id))
                });
            match party {
                Some(party) => party,
                None => return Map::new(),
            }
        }
        None => response,
    };

    let mut form_values = Map::new();

    for (field_id, config) in registry.iter() {
        match &config.sub_fields {
            Some(sub_fields) => {
                let Some(items) = config.path.read(source).and_then(Value::as_array) else {
                    continue;
                };
                let mut converted_items = Vec::new();
                for item in items {
                    let mut converted = Map::new();
                    for (sub_name, sub_config) in sub_fields {
                        let Some(sub_value) = sub_config.path.read(item) else {
                            continue;
                        };
                        if sub_value.is_null() {
                            continue;
                        }
                        let value = match &sub_config.from_response {
                            Some(transform) => transform.apply(sub_value),
                            None => sub_value.clone(),
                        };
                        converted.insert(sub_name.clone(), value);
                    }
                    converted_items.push(Value::Object(converted));
                }
                if converted_items.is_empty() {
                    continue;
                }
                form_values.insert(field_id.clone(), Value::Array(converted_items));
            }
            None => {
                let Some(value) = config.path.read(source) else {
                    continue;
                };
                if value.is_null() {
                    continue;
                }
                if value.as_array().is_some_and(|a| a.is_empty()) {
                    continue;
                }
                let value = match &config.from_response {
                    Some(transform) => transform.apply(value),
                    None => value.clone(),
                };
                form_values.insert(field_id.clone(), value);
            }
        }
    }

    form_values
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::mapping::request::generate_party_request_body;

    #[test]
    fn reads_configured_paths_out_of_a_party() {
        let registry = FieldConfigurationRegistry::standard();
        let party = json!({
            "organizationDetails": {
                "organizationName": "Acme Holdings",
                "countryOfFormation": "US",
                "phone": { "phoneNumber": "+1 2015551234" }
            },
            "email": "ops@acme.com"
        });

        let form_values = convert_response_to_form_values(&party, &registry, None);
        assert_eq!(form_values["organizationName"], json!("Acme Holdings"));
        assert_eq!(form_values["organizationEmail"], json!("ops@acme.com"));
        // from_response transform splits the wire string back into parts.
        assert_eq!(form_values["organizationPhone"], json!(["+1", "2015551234"]));
        assert!(!form_values.contains_key("taxId"));
    }

    #[test]
    fn selects_a_party_by_id_from_the_collection() {
        let registry = FieldConfigurationRegistry::standard();
        let response = json!({
            "parties": [
                { "id": "p-1", "organizationDetails": { "organizationName": "First" } },
                { "id": "p-2", "organizationDetails": { "organizationName": "Second" } }
            ]
        });

        let form_values = convert_response_to_form_values(&response, &registry, Some("p-2"));
        assert_eq!(form_values["organizationName"], json!("Second"));

        let missing = convert_response_to_form_values(&response, &registry, Some("p-9"));
        assert!(missing.is_empty());
    }

    #[test]
    fn array_of_object_fields_are_rebuilt_from_sub_paths() {
        let registry = FieldConfigurationRegistry::standard();
        let party = json!({
            "beneficialOwners": [
                { "firstName": "Ada", "lastName": "Lovelace", "role": "BENEFICIAL_OWNER" }
            ]
        });

        let form_values = convert_response_to_form_values(&party, &registry, None);
        assert_eq!(
            form_values["beneficialOwners"],
            json!([{ "firstName": "Ada", "lastName": "Lovelace", "role": "BENEFICIAL_OWNER" }])
        );
    }

    #[test]
    fn empty_arrays_are_skipped() {
        let registry = FieldConfigurationRegistry::standard();
        let party = json!({ "organizationDetails": { "addresses": [] } });
        let form_values = convert_response_to_form_values(&party, &registry, None);
        assert!(!form_values.contains_key("addresses"));
    }

    #[test]
    fn request_then_response_round_trips_untransformed_fields() {
        let registry = FieldConfigurationRegistry::standard();
        let submitted = json!({
            "organizationName": "Acme Holdings",
            "taxId": "12-3456789",
            "yearOfFormation": "2019",
            "beneficialOwners": [
                { "firstName": "Ada", "lastName": "Lovelace", "role": "BENEFICIAL_OWNER" }
            ]
        });
        let submitted = submitted.as_object().unwrap().clone();

        let body = generate_party_request_body(&submitted, &registry);
        let recovered = convert_response_to_form_values(&body, &registry, None);

        for key in ["organizationName", "taxId", "yearOfFormation", "beneficialOwners"] {
            assert_eq!(recovered[key], submitted[key], "round trip for {key}");
        }
    }

    #[test]
    fn transformed_fields_round_trip_through_inverse_transforms() {
        let registry = FieldConfigurationRegistry::standard();
        let submitted = json!({ "organizationPhone": ["+1", "2015551234"] });
        let submitted = submitted.as_object().unwrap().clone();

        let body = generate_party_request_body(&submitted, &registry);
        let recovered = convert_response_to_form_values(&body, &registry, None);
        assert_eq!(recovered["organizationPhone"], submitted["organizationPhone"]);
    }
}
