//! Flow progress: per-step validation aggregated into section statuses.
//!
//! Sections group the onboarding wizard's steps. Each step is validated
//! against its context-derived schema; a section's status summarizes its
//! steps and can be overridden by a custom status function for
//! cross-section dependencies.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::context::ClientContext;
use crate::error::Result;
use crate::mapping::response::convert_response_to_form_values;
use crate::registry::FieldConfigurationRegistry;
use crate::schema::derive::SchemaDeriver;
use crate::schema::validate::StepValidation;
use crate::schema::{CanonicalSchema, RefineFn};

/// Completion state of one section, rendered as a badge by the overview UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    NotStarted,
    MissingDetails,
    Completed,
    CompletedDisabled,
    OnHold,
    Hidden,
}

impl std::fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::MissingDetails => "missing_details",
            Self::Completed => "completed",
            Self::CompletedDisabled => "completed_disabled",
            Self::OnHold => "on_hold",
            Self::Hidden => "hidden",
        };
        write!(f, "{s}")
    }
}

/// Review state of the onboarding client record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientStatus {
    New,
    ReviewInProgress,
    InformationRequested,
    Approved,
    Declined,
}

/// Kind of party a step binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyType {
    Organization,
    Individual,
}

/// A business or individual record held by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub id: String,
    pub party_type: PartyType,
    pub roles: Vec<String>,
    pub active: bool,
    /// Raw party payload as returned by the server.
    pub profile: Value,
}

/// Server-fetched client record: the parties and review state the flow
/// calculator reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: String,
    pub status: ClientStatus,
    pub product: Option<String>,
    pub parties: Vec<Party>,
    pub outstanding_attestations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ClientRecord {
    pub fn organization_party(&self) -> Option<&Party> {
        self.parties
            .iter()
            .find(|p| p.active && p.party_type == PartyType::Organization)
    }

    /// Country of formation from the organization party, if known.
    pub fn jurisdiction(&self) -> Option<String> {
        self.organization_party()?
            .profile
            .pointer("/organizationDetails/countryOfFormation")?
            .as_str()
            .map(String::from)
    }

    /// Legal entity type from the organization party, if known.
    pub fn entity_type(&self) -> Option<String> {
        self.organization_party()?
            .profile
            .pointer("/organizationDetails/organizationType")?
            .as_str()
            .map(String::from)
    }

    /// First active party matching the filter's type and carrying all of its
    /// required roles.
    pub fn find_party(&self, filter: &PartyFilter) -> Option<&Party> {
        self.parties.iter().find(|p| {
            p.active
                && p.party_type == filter.party_type
                && filter
                    .required_roles
                    .iter()
                    .all(|role| p.roles.iter().any(|r| r == role))
        })
    }
}

#[cfg(test)]
impl ClientRecord {
    pub(crate) fn fixture_us_llc() -> Self {
        Self {
            id: "client-1".into(),
            status: ClientStatus::New,
            product: Some("EMBEDDED_PAYMENTS".into()),
            parties: vec![Party {
                id: "party-org".into(),
                party_type: PartyType::Organization,
                roles: vec!["CLIENT".into()],
                active: true,
                profile: serde_json::json!({
                    "organizationDetails": {
                        "countryOfFormation": "US",
                        "organizationType": "LIMITED_LIABILITY_COMPANY"
                    }
                }),
            }],
            outstanding_attestations: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Transient client-side UI state, read-only input to status functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub session_id: Uuid,
    pub current_screen_id: Option<String>,
    pub dismissed_notices: Vec<String>,
    pub completed_sections: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for SessionData {
    fn default() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            current_screen_id: None,
            dismissed_notices: Vec::new(),
            completed_sections: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

/// One form step: a canonical schema plus an optional cross-field refine.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub id: String,
    pub schema: CanonicalSchema,
    pub refine: Option<RefineFn>,
}

impl StepDefinition {
    pub fn new(id: &str, schema: CanonicalSchema) -> Self {
        Self {
            id: id.to_string(),
            schema,
            refine: None,
        }
    }

    pub fn with_refine(mut self, refine: RefineFn) -> Self {
        self.refine = Some(refine);
        self
    }
}

/// Selects the party a stepper section is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyFilter {
    pub party_type: PartyType,
    pub required_roles: Vec<String>,
}

/// A section is a single form step or a party-bound stepper of steps.
#[derive(Debug, Clone)]
pub enum SectionKind {
    Form(StepDefinition),
    Stepper {
        party_filter: PartyFilter,
        steps: Vec<StepDefinition>,
    },
}

impl SectionKind {
    fn steps(&self) -> &[StepDefinition] {
        match self {
            SectionKind::Form(step) => std::slice::from_ref(step),
            SectionKind::Stepper { steps, .. } => steps,
        }
    }
}

/// Inputs a custom section status function may consult.
pub struct StatusContext<'a> {
    pub session: &'a SessionData,
    pub client: Option<&'a ClientRecord>,
    pub all_steps_valid: bool,
    pub step_validations: &'a HashMap<String, StepValidation>,
    pub staged_values: &'a StagedValues,
    pub current_screen_id: Option<&'a str>,
}

/// Custom status resolver, the hook for cross-section dependencies.
pub type StatusFn = fn(&StatusContext<'_>) -> SectionStatus;

/// One section of the onboarding flow.
#[derive(Debug, Clone)]
pub struct SectionDefinition {
    pub id: String,
    pub kind: SectionKind,
    pub status_fn: Option<StatusFn>,
}

impl SectionDefinition {
    pub fn form(id: &str, step: StepDefinition) -> Self {
        Self {
            id: id.to_string(),
            kind: SectionKind::Form(step),
            status_fn: None,
        }
    }

    pub fn stepper(id: &str, party_filter: PartyFilter, steps: Vec<StepDefinition>) -> Self {
        Self {
            id: id.to_string(),
            kind: SectionKind::Stepper {
                party_filter,
                steps,
            },
            status_fn: None,
        }
    }

    pub fn with_status_fn(mut self, status_fn: StatusFn) -> Self {
        self.status_fn = Some(status_fn);
        self
    }
}

/// Form values staged during the session, keyed by step id.
pub type StagedValues = HashMap<String, Map<String, Value>>;

/// Aggregated progress over all sections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowProgress {
    pub section_statuses: HashMap<String, SectionStatus>,
    pub step_validations: HashMap<String, HashMap<String, StepValidation>>,
    /// Per section, the first step that failed validation — used to
    /// deep-link back into the offending step.
    pub first_invalid_step: HashMap<String, String>,
}

/// Runs derivation + validation per step and aggregates section statuses.
pub struct FlowProgressCalculator<'a> {
    registry: &'a FieldConfigurationRegistry,
}

impl<'a> FlowProgressCalculator<'a> {
    pub fn new(registry: &'a FieldConfigurationRegistry) -> Self {
        Self { registry }
    }

    /// Compute progress for every section.
    ///
    /// A `ConfigurationError` during schema derivation propagates and aborts
    /// the whole calculation. A step merely failing validation is recorded
    /// as `is_valid: false` and never aborts anything.
    pub fn get_flow_progress(
        &self,
        sections: &[SectionDefinition],
        session: &SessionData,
        client: Option<&ClientRecord>,
        staged: &StagedValues,
        current_screen_id: Option<&str>,
    ) -> Result<FlowProgress> {
        let deriver = SchemaDeriver::new(self.registry);
        let mut section_statuses = HashMap::new();
        let mut all_step_validations = HashMap::new();
        let mut first_invalid_step = HashMap::new();

        for section in sections {
            let party = match &section.kind {
                SectionKind::Stepper { party_filter, .. } => {
                    client.and_then(|c| c.find_party(party_filter))
                }
                SectionKind::Form(_) => None,
            };
            let initial_values = party
                .map(|p| convert_response_to_form_values(&p.profile, self.registry, None))
                .unwrap_or_default();

            let mut step_validations = HashMap::new();
            for step in section.kind.steps() {
                let mut merged = initial_values.clone();
                if let Some(staged_step) = staged.get(&step.id) {
                    for (key, value) in staged_step {
                        merged.insert(key.clone(), value.clone());
                    }
                }

                let ctx = ClientContext::from_sources(&merged, client);
                let derived = deriver.derive(&step.schema, &ctx, step.refine)?;
                let validation = derived.validate(&merged);

                if !validation.is_valid {
                    first_invalid_step
                        .entry(section.id.clone())
                        .or_insert_with(|| step.id.clone());
                }
                step_validations.insert(step.id.clone(), validation);
            }

            let all_steps_valid = step_validations.values().all(|v| v.is_valid);
            let status = match section.status_fn {
                Some(status_fn) => status_fn(&StatusContext {
                    session,
                    client,
                    all_steps_valid,
                    step_validations: &step_validations,
                    staged_values: staged,
                    current_screen_id,
                }),
                None if all_steps_valid => SectionStatus::Completed,
                None => SectionStatus::NotStarted,
            };

            section_statuses.insert(section.id.clone(), status);
            all_step_validations.insert(section.id.clone(), step_validations);
        }

        Ok(FlowProgress {
            section_statuses,
            step_validations: all_step_validations,
            first_invalid_step,
        })
    }
}
