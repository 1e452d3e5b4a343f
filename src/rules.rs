//! Rule resolution: from field configuration + client context to the
//! effective rule for one field.

use serde_json::{Map, Value};
use tracing::debug;

use crate::context::ClientContext;
use crate::error::{ConfigurationError, Result};
use crate::registry::FieldConfigurationRegistry;
use crate::registry::config::{
    ArrayFieldRule, BaseRule, Display, FieldConfiguration, FieldRule, Interaction,
};
use crate::registry::path::{FieldPath, PathSegment};

/// The final rule for a field after base + matching conditional overrides.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectiveRule {
    Scalar(FieldRule),
    Array(ArrayFieldRule),
}

impl EffectiveRule {
    pub fn display(&self) -> Display {
        match self {
            EffectiveRule::Scalar(r) => r.display,
            EffectiveRule::Array(r) => r.display,
        }
    }

    pub fn interaction(&self) -> Interaction {
        match self {
            EffectiveRule::Scalar(r) => r.interaction,
            EffectiveRule::Array(r) => r.interaction,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.display() == Display::Hidden
    }

    pub fn as_scalar(&self) -> Option<&FieldRule> {
        match self {
            EffectiveRule::Scalar(r) => Some(r),
            EffectiveRule::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayFieldRule> {
        match self {
            EffectiveRule::Array(r) => Some(r),
            EffectiveRule::Scalar(_) => None,
        }
    }
}

/// Resolves effective rules against a read-only registry.
pub struct RuleResolver<'a> {
    registry: &'a FieldConfigurationRegistry,
}

impl<'a> RuleResolver<'a> {
    pub fn new(registry: &'a FieldConfigurationRegistry) -> Self {
        Self { registry }
    }

    /// Resolve the effective rule for `field_path` under `ctx`.
    ///
    /// Nested paths into array-of-object fields (`beneficialOwners.0.firstName`)
    /// drill into the array's sub-field configurations, skipping numeric
    /// index segments. The sub-field inherits `display`/`interaction` from
    /// the enclosing array's resolved rule and computes its own
    /// `required`/`default_value`.
    pub fn resolve(&self, field_path: &str, ctx: &ClientContext) -> Result<EffectiveRule> {
        let path = FieldPath::parse(field_path);
        let mut segments = path.segments().iter();

        let base_id = match segments.next() {
            Some(PathSegment::Field(name)) => name,
            _ => return Err(ConfigurationError::UnknownField(field_path.to_string())),
        };
        let mut config = self
            .registry
            .get(base_id)
            .ok_or_else(|| ConfigurationError::UnknownField(field_path.to_string()))?;
        let mut rule = self.resolve_config(config, ctx);
        let mut parent_id = base_id.clone();

        for segment in segments {
            let name = match segment {
                PathSegment::Index(_) => continue,
                PathSegment::Field(name) => name,
            };
            let sub_fields =
                config
                    .sub_fields
                    .as_ref()
                    .ok_or_else(|| ConfigurationError::NotAnArrayField {
                        parent: parent_id.clone(),
                        path: field_path.to_string(),
                    })?;
            let sub_config =
                sub_fields
                    .get(name)
                    .ok_or_else(|| ConfigurationError::UnknownSubField {
                        parent: parent_id.clone(),
                        sub_field: name.clone(),
                    })?;

            let sub_rule = self.resolve_config(sub_config, ctx);
            rule = inherit_chrome(&rule, sub_rule);
            config = sub_config;
            parent_id = name.clone();
        }

        Ok(rule)
    }

    /// Base rule + matching conditional overrides, in declaration order,
    /// last match winning per key.
    fn resolve_config(&self, config: &FieldConfiguration, ctx: &ClientContext) -> EffectiveRule {
        let mut rule = match &config.base_rule {
            BaseRule::Scalar(base) => EffectiveRule::Scalar(base.clone()),
            BaseRule::Array(base) => EffectiveRule::Array(base.clone()),
        };

        for (position, conditional) in config.conditional_rules.iter().enumerate() {
            if !conditional.condition.matches(ctx) {
                continue;
            }
            debug!(
                path = %config.path,
                position,
                "Conditional rule matched context"
            );
            match &mut rule {
                EffectiveRule::Scalar(r) => conditional.rule.merge_onto_scalar(r),
                EffectiveRule::Array(r) => conditional.rule.merge_onto_array(r),
            }
        }

        // An array's append template picks up per-sub-field defaults.
        if let EffectiveRule::Array(array_rule) = &mut rule {
            if let Some(sub_fields) = &config.sub_fields {
                let mut defaults: Vec<(&String, Value)> = Vec::new();
                for (name, sub_config) in sub_fields {
                    if let EffectiveRule::Scalar(sub_rule) = self.resolve_config(sub_config, ctx) {
                        if let Some(default) = sub_rule.default_value {
                            defaults.push((name, default));
                        }
                    }
                }
                if !defaults.is_empty() {
                    match array_rule.default_append_value.take() {
                        Some(Value::Object(mut template)) => {
                            for (name, default) in defaults {
                                template.insert(name.clone(), default);
                            }
                            array_rule.default_append_value = Some(Value::Object(template));
                        }
                        // Non-object templates cannot take keyed defaults.
                        Some(other) => array_rule.default_append_value = Some(other),
                        None => {
                            let mut template = Map::new();
                            for (name, default) in defaults {
                                template.insert(name.clone(), default);
                            }
                            array_rule.default_append_value = Some(Value::Object(template));
                        }
                    }
                }
            }
        }

        rule
    }
}

/// Sub-field rules inherit `display`/`interaction` from the enclosing array
/// rule; everything else comes from the sub-field's own resolution.
fn inherit_chrome(parent: &EffectiveRule, sub: EffectiveRule) -> EffectiveRule {
    let display = parent.display();
    let interaction = parent.interaction();
    match sub {
        EffectiveRule::Scalar(mut r) => {
            r.display = display;
            r.interaction = interaction;
            EffectiveRule::Scalar(r)
        }
        EffectiveRule::Array(mut r) => {
            r.display = display;
            r.interaction = interaction;
            EffectiveRule::Array(r)
        }
    }
}
