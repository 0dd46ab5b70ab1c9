//! Mapping declaration and resolution against a target descriptor.

use super::rule::FieldRule;
use crate::catalog::EntityDef;
use crate::error::ConfigError;
use crate::value::ValueBag;

/// A declared mapping: target field name to field rule, in insertion
/// order.
///
/// Duplicate target fields are representable here and rejected when the
/// mapping is resolved, so a conflicting declaration fails construction
/// rather than silently taking the last write.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    rules: Vec<(String, FieldRule)>,
}

impl Mapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a target field to a rule.
    pub fn field(mut self, target: impl Into<String>, rule: FieldRule) -> Self {
        self.rules.push((target.into(), rule));
        self
    }

    /// Shorthand: copy a source field into a target field.
    pub fn copy(self, target: impl Into<String>, source: impl Into<String>) -> Self {
        self.field(target, FieldRule::source(source))
    }

    /// Number of declared rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the mapping declares no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate the declared rules in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(String, FieldRule)> {
        self.rules.iter()
    }
}

/// One resolved rule: a validated target field and its rule.
#[derive(Debug, Clone)]
pub struct ResolvedRule {
    /// Target field name, known to exist on the target entity.
    pub field: String,
    /// The rule producing the field's value.
    pub rule: FieldRule,
}

/// A mapping validated against a target entity descriptor, plus the
/// validated defaults.
///
/// Rules keep the mapping's insertion order; each field write is
/// independent, but deterministic iteration keeps reports reproducible.
#[derive(Debug, Clone)]
pub struct ResolvedMapping {
    entity: String,
    rules: Vec<ResolvedRule>,
    defaults: ValueBag,
}

impl ResolvedMapping {
    /// Validate a mapping and defaults against a target descriptor.
    ///
    /// Every mapping key and default key must name a declared target
    /// field, and no target field may be bound twice.
    pub fn resolve(
        target: &EntityDef,
        mapping: &Mapping,
        defaults: &ValueBag,
    ) -> Result<Self, ConfigError> {
        let mut unknown: Vec<String> = Vec::new();
        let mut rules: Vec<ResolvedRule> = Vec::with_capacity(mapping.len());

        for (field, rule) in mapping.iter() {
            if !target.has_field(field) {
                if !unknown.contains(field) {
                    unknown.push(field.clone());
                }
                continue;
            }
            if rules.iter().any(|r| &r.field == field) {
                return Err(ConfigError::DuplicateField {
                    entity: target.name.clone(),
                    field: field.clone(),
                });
            }
            rules.push(ResolvedRule {
                field: field.clone(),
                rule: rule.clone(),
            });
        }

        for field in defaults.keys() {
            if !target.has_field(field) && !unknown.contains(field) {
                unknown.push(field.clone());
            }
        }

        if !unknown.is_empty() {
            return Err(ConfigError::UnknownFields {
                entity: target.name.clone(),
                fields: unknown,
            });
        }

        Ok(Self {
            entity: target.name.clone(),
            rules,
            defaults: defaults.clone(),
        })
    }

    /// Name of the target entity this mapping was resolved against.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// The resolved rules, in declaration order.
    pub fn rules(&self) -> &[ResolvedRule] {
        &self.rules
    }

    /// The validated default literals.
    pub fn defaults(&self) -> &ValueBag {
        &self.defaults
    }

    /// Whether the mapping binds the given target field.
    pub fn binds(&self, field: &str) -> bool {
        self.rules.iter().any(|r| r.field == field)
    }

    /// Names referenced by source-field rules.
    pub fn source_field_refs(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().filter_map(|r| match &r.rule {
            FieldRule::Source(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Extend the mapping with verbatim-copy rules for every source field
    /// that also exists on the target and is not already bound.
    ///
    /// Implements the implicit shared-field copy: an explicit rule always
    /// wins over the implicit one. Sorted by field name so the extension
    /// is deterministic regardless of source enumeration order.
    pub fn with_shared_fields(&self, source_fields: &[String], target: &EntityDef) -> Self {
        let mut extended = self.clone();
        let mut shared: Vec<&String> = source_fields
            .iter()
            .filter(|name| target.has_field(name) && !self.binds(name))
            .collect();
        shared.sort();
        shared.dedup();
        for name in shared {
            extended.rules.push(ResolvedRule {
                field: name.clone(),
                rule: FieldRule::source(name.clone()),
            });
        }
        extended
    }
}
