//! Field configuration registry.
//!
//! The registry is the single source of truth for how logical form fields map
//! onto the party payload and how their rules vary by client context. It is
//! built once at startup and read-only thereafter.

pub mod config;
pub mod path;
pub mod transform;

use std::collections::HashMap;
use std::sync::LazyLock;

use serde_json::json;

use config::{Condition, FieldConfiguration, RuleOverride};
use transform::{ErrorPathRemap, Transform};

/// Immutable map from logical field identifier to its configuration.
#[derive(Debug, Clone, Default)]
pub struct FieldConfigurationRegistry {
    fields: HashMap<String, FieldConfiguration>,
}

impl FieldConfigurationRegistry {
    /// Empty registry, for tests that assemble their own entries.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field_id: &str, config: FieldConfiguration) {
        self.fields.insert(field_id.to_string(), config);
    }

    pub fn get(&self, field_id: &str) -> Option<&FieldConfiguration> {
        self.fields.get(field_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldConfiguration)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The built-in embedded-finance onboarding field map.
    ///
    /// Paths are party-relative: request generation wraps them into the
    /// party collection, response conversion reads them back out of a party.
    pub fn standard() -> Self {
        let mut registry = Self::empty();

        registry.insert(
            "organizationName",
            FieldConfiguration::scalar("organizationDetails.organizationName").required(true),
        );

        registry.insert(
            "organizationType",
            FieldConfiguration::scalar("organizationDetails.organizationType").required(true),
        );

        registry.insert(
            "countryOfFormation",
            FieldConfiguration::scalar("organizationDetails.countryOfFormation")
                .required(true)
                .to_request(Transform::ToUpperCase),
        );

        registry.insert(
            "yearOfFormation",
            FieldConfiguration::scalar("organizationDetails.yearOfFormation").required(true),
        );

        registry.insert(
            "organizationEmail",
            FieldConfiguration::scalar("email")
                .required(true)
                .to_request(Transform::ToLowerCase),
        );

        // Stored in the form as [countryCode, number], sent as one string.
        registry.insert(
            "organizationPhone",
            FieldConfiguration::scalar("organizationDetails.phone.phoneNumber")
                .required(true)
                .to_request(Transform::JoinWith {
                    separator: " ".into(),
                })
                .from_response(Transform::SplitOn {
                    separator: " ".into(),
                }),
        );

        // Tax id is mandatory for US organizations only.
        registry.insert(
            "taxId",
            FieldConfiguration::scalar("organizationDetails.taxId")
                .when(Condition::jurisdictions(&["US"]), RuleOverride::required(true)),
        );

        registry.insert(
            "website",
            FieldConfiguration::scalar("organizationDetails.website"),
        );

        // Form-only toggle; never written to a request body.
        registry.insert(
            "websiteAvailable",
            FieldConfiguration::scalar("websiteAvailable")
                .default_value(json!(false))
                .exclude_from_mapping(),
        );

        registry.insert(
            "industryCategory",
            FieldConfiguration::scalar("organizationDetails.industryCategory").required(true),
        );

        registry.insert(
            "industryType",
            FieldConfiguration::scalar("organizationDetails.industryType"),
        );

        // Servers report organizationIds errors without the element index.
        registry.insert(
            "organizationIds",
            FieldConfiguration::array("organizationDetails.organizationIds")
                .max_items(1)
                .default_append_value(json!({ "idType": "", "value": "" }))
                .when(
                    Condition::jurisdictions(&["US"]),
                    RuleOverride {
                        required_items: Some(1),
                        ..Default::default()
                    },
                )
                .error_path_remap(ErrorPathRemap::AssumeFirstItem)
                .sub_field("value", FieldConfiguration::scalar("value").required(true))
                .sub_field(
                    "idType",
                    FieldConfiguration::scalar("idType")
                        .required(true)
                        .when(
                            Condition::jurisdictions(&["US"]),
                            RuleOverride::default().with_default(json!("EIN")),
                        )
                        .when(
                            Condition::jurisdictions(&["CA"]),
                            RuleOverride::default().with_default(json!("BN")),
                        ),
                ),
        );

        registry.insert(
            "addresses",
            FieldConfiguration::array("organizationDetails.addresses")
                .min_items(1)
                .max_items(3)
                .default_append_value(json!({
                    "addressType": "BUSINESS_ADDRESS",
                    "line1": "",
                    "city": "",
                    "state": "",
                    "postalCode": "",
                    "countryCode": ""
                }))
                .sub_field("addressType", FieldConfiguration::scalar("addressType"))
                .sub_field("line1", FieldConfiguration::scalar("line1").required(true))
                .sub_field("city", FieldConfiguration::scalar("city").required(true))
                .sub_field(
                    "state",
                    FieldConfiguration::scalar("state").when(
                        Condition::jurisdictions(&["US"]),
                        RuleOverride::required(true),
                    ),
                )
                .sub_field(
                    "postalCode",
                    FieldConfiguration::scalar("postalCode").required(true),
                )
                .sub_field(
                    "countryCode",
                    FieldConfiguration::scalar("countryCode")
                        .when(
                            Condition::jurisdictions(&["US"]),
                            RuleOverride::default().with_default(json!("US")),
                        )
                        .when(
                            Condition::jurisdictions(&["CA"]),
                            RuleOverride::default().with_default(json!("CA")),
                        ),
                ),
        );

        // Sole proprietors have no separate beneficial owners.
        registry.insert(
            "beneficialOwners",
            FieldConfiguration::array("beneficialOwners")
                .min_items(1)
                .max_items(4)
                .default_append_value(json!({
                    "firstName": "",
                    "lastName": "",
                    "role": "",
                    "ownershipPercentage": null
                }))
                .when(
                    Condition::entity_types(&["SOLE_PROPRIETORSHIP"]),
                    RuleOverride::hidden(),
                )
                .sub_field(
                    "firstName",
                    FieldConfiguration::scalar("firstName").required(true),
                )
                .sub_field(
                    "lastName",
                    FieldConfiguration::scalar("lastName").required(true),
                )
                .sub_field(
                    "role",
                    FieldConfiguration::scalar("role")
                        .default_value(json!("BENEFICIAL_OWNER")),
                )
                .sub_field(
                    "ownershipPercentage",
                    FieldConfiguration::scalar("ownershipPercentage").when(
                        Condition::products(&["EMBEDDED_PAYMENTS"]),
                        RuleOverride::required(true),
                    ),
                ),
        );

        registry
    }
}

/// Shared process-wide registry instance.
pub fn standard_registry() -> &'static FieldConfigurationRegistry {
    static REGISTRY: LazyLock<FieldConfigurationRegistry> =
        LazyLock::new(FieldConfigurationRegistry::standard);
    &REGISTRY
}
