//! Context-specific schema derivation.

use serde_json::{Map, Value};
use tracing::debug;

use crate::context::ClientContext;
use crate::error::{ConfigurationError, Result};
use crate::registry::FieldConfigurationRegistry;
use crate::rules::{EffectiveRule, RuleResolver};

use super::{CanonicalSchema, DerivedSchema, ObjectField, RefineFn, SchemaNode};

/// Derives a per-context schema from a canonical one.
///
/// Stateless: the same `(schema, context)` pair always yields a derived
/// schema with the same field set and optionality.
pub struct SchemaDeriver<'a> {
    registry: &'a FieldConfigurationRegistry,
}

impl<'a> SchemaDeriver<'a> {
    pub fn new(registry: &'a FieldConfigurationRegistry) -> Self {
        Self { registry }
    }

    /// Derive the context schema for one step.
    ///
    /// Hidden fields are omitted entirely. Scalars keep their canonical type
    /// and take requiredness from the resolved rule. Array-of-object fields
    /// are rebuilt with rule-derived bounds and a recursively derived element
    /// schema; refinement wrappers around the array survive unchanged.
    pub fn derive(
        &self,
        schema: &CanonicalSchema,
        ctx: &ClientContext,
        refine: Option<RefineFn>,
    ) -> Result<DerivedSchema> {
        let mut fields = Vec::new();
        for root in &schema.fields {
            if let Some(derived) = self.derive_field(&root.name, &root.name, &root.node, ctx)? {
                fields.push(derived);
            }
        }
        Ok(DerivedSchema { fields, refine })
    }

    fn derive_field(
        &self,
        name: &str,
        resolve_path: &str,
        node: &SchemaNode,
        ctx: &ClientContext,
    ) -> Result<Option<ObjectField>> {
        let resolver = RuleResolver::new(self.registry);
        let rule = resolver.resolve(resolve_path, ctx)?;
        if rule.is_hidden() {
            debug!(field = resolve_path, "Field hidden for context, omitted from schema");
            return Ok(None);
        }

        let (wrappers, inner) = node.unwrap_refinements();

        match (&rule, inner) {
            (EffectiveRule::Scalar(scalar_rule), SchemaNode::Scalar(_)) => Ok(Some(ObjectField {
                name: name.to_string(),
                node: node.clone(),
                required: scalar_rule.required,
            })),

            (EffectiveRule::Array(array_rule), SchemaNode::Array { element, .. }) => {
                let derived_element = match element.as_ref() {
                    SchemaNode::Object { fields } => {
                        let mut sub_fields = Vec::new();
                        for sub in fields {
                            let sub_path = format!("{resolve_path}.0.{}", sub.name);
                            if let Some(derived) =
                                self.derive_field(&sub.name, &sub_path, &sub.node, ctx)?
                            {
                                sub_fields.push(derived);
                            }
                        }
                        SchemaNode::Object { fields: sub_fields }
                    }
                    scalar @ SchemaNode::Scalar(_) => scalar.clone(),
                    _ => {
                        return Err(ConfigurationError::UnsupportedShape {
                            field: resolve_path.to_string(),
                        });
                    }
                };

                let min_items = array_rule.effective_min();
                let mut rebuilt = SchemaNode::Array {
                    element: Box::new(derived_element),
                    min_items,
                    max_items: array_rule.max_items,
                    required_items: array_rule.required_items,
                };
                for wrapper in wrappers.iter().rev() {
                    rebuilt = rebuilt.refined((*wrapper).clone());
                }

                Ok(Some(ObjectField {
                    name: name.to_string(),
                    node: rebuilt,
                    required: min_items > 0,
                }))
            }

            (EffectiveRule::Scalar(_), SchemaNode::Array { .. })
            | (EffectiveRule::Array(_), SchemaNode::Scalar(_)) => {
                Err(ConfigurationError::RuleShapeMismatch {
                    field: resolve_path.to_string(),
                })
            }

            (_, SchemaNode::Object { .. }) | (_, SchemaNode::Refined { .. }) => {
                Err(ConfigurationError::UnsupportedShape {
                    field: resolve_path.to_string(),
                })
            }
        }
    }

    /// Configured default values for every visible field of a step,
    /// used to pre-populate an empty form.
    ///
    /// Scalars contribute their `default_value`. Arrays contribute their
    /// append template replicated to the effective minimum length.
    pub fn seed_default_values(
        &self,
        schema: &CanonicalSchema,
        ctx: &ClientContext,
    ) -> Result<Map<String, Value>> {
        let resolver = RuleResolver::new(self.registry);
        let mut seeded = Map::new();

        for root in &schema.fields {
            let rule = resolver.resolve(&root.name, ctx)?;
            if rule.is_hidden() {
                continue;
            }
            match rule {
                EffectiveRule::Scalar(scalar_rule) => {
                    if let Some(default) = scalar_rule.default_value {
                        seeded.insert(root.name.clone(), default);
                    }
                }
                EffectiveRule::Array(array_rule) => {
                    let min = array_rule.effective_min();
                    if min == 0 {
                        continue;
                    }
                    if let Some(template) = array_rule.default_append_value {
                        let items = vec![template; min];
                        seeded.insert(root.name.clone(), Value::Array(items));
                    }
                }
            }
        }

        Ok(seeded)
    }
}
