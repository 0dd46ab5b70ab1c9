//! Applies a resolved mapping and defaults to one source record.

use super::resolver::ResolvedMapping;
use super::rule::FieldRule;
use crate::record::SourceRecord;
use crate::value::ValueBag;
use thiserror::Error;

/// Per-record transformation failure. Recoverable: it is recorded in the
/// run report and, depending on the unit's error policy, the run either
/// halts or moves on to the next record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// A source-field rule referenced a field the record does not have.
    #[error("source field '{field}' missing")]
    MissingSourceField {
        /// The missing source field.
        field: String,
    },

    /// A computed rule returned an error.
    #[error("rule for field '{field}' failed: {reason}")]
    RuleFailed {
        /// The target field whose rule failed.
        field: String,
        /// The underlying cause, as reported by the rule.
        reason: String,
    },
}

/// Transform one source record into a target-entity-shaped value bag.
///
/// Each field's evaluation is independent: source-field rules read the
/// record, computed rules see only the record (never the partially-built
/// bag), static values are cloned as captured. Defaults fill every key
/// the mapping did not populate; they never override mapping output.
pub fn transform(
    record: &dyn SourceRecord,
    mapping: &ResolvedMapping,
) -> Result<ValueBag, TransformError> {
    let mut bag = ValueBag::new();

    for resolved in mapping.rules() {
        let value = match &resolved.rule {
            FieldRule::Source(name) => {
                record
                    .field(name)
                    .ok_or_else(|| TransformError::MissingSourceField {
                        field: name.clone(),
                    })?
            }
            FieldRule::Computed(f) => f(record).map_err(|reason| TransformError::RuleFailed {
                field: resolved.field.clone(),
                reason,
            })?,
            FieldRule::Static(value) => value.clone(),
        };
        bag.insert(resolved.field.clone(), value);
    }

    for (field, value) in mapping.defaults() {
        bag.entry(field.clone()).or_insert_with(|| value.clone());
    }

    Ok(bag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityDef, FieldDef, FieldType, ScalarType};
    use crate::mapping::Mapping;
    use crate::record::Row;
    use crate::value::Value;

    fn user_entity() -> EntityDef {
        EntityDef::new("User", "id")
            .with_field(FieldDef::new("id", FieldType::scalar(ScalarType::Int64)))
            .with_field(FieldDef::new("username", FieldType::scalar(ScalarType::String)))
            .with_field(FieldDef::new("age", FieldType::scalar(ScalarType::Int64)))
            .with_field(FieldDef::new("is_admin", FieldType::scalar(ScalarType::Bool)))
    }

    fn resolved(mapping: Mapping, defaults: ValueBag) -> ResolvedMapping {
        ResolvedMapping::resolve(&user_entity(), &mapping, &defaults).unwrap()
    }

    #[test]
    fn test_transform_all_rule_kinds() {
        let mapping = Mapping::new()
            .copy("username", "email")
            .field(
                "age",
                FieldRule::computed(|r| {
                    r.field("age")
                        .and_then(|v| v.as_i64())
                        .map(|age| Value::Int64(age + 1))
                        .ok_or_else(|| "age unreadable".to_string())
                }),
            )
            .field("is_admin", FieldRule::value(true));

        let row = Row::new("u-1").with("email", "a@x.com").with("age", 30i64);
        let bag = transform(&row, &resolved(mapping, ValueBag::new())).unwrap();

        assert_eq!(bag["username"], Value::String("a@x.com".into()));
        assert_eq!(bag["age"], Value::Int64(31));
        assert_eq!(bag["is_admin"], Value::Bool(true));
    }

    #[test]
    fn test_missing_source_field() {
        let mapping = Mapping::new().copy("username", "email");
        let row = Row::new("u-1").with("age", 30i64);

        let err = transform(&row, &resolved(mapping, ValueBag::new())).unwrap_err();
        assert_eq!(
            err,
            TransformError::MissingSourceField {
                field: "email".into()
            }
        );
    }

    #[test]
    fn test_rule_failure_carries_field_and_cause() {
        let mapping = Mapping::new().field(
            "age",
            FieldRule::computed(|_| Err("arithmetic overflow".to_string())),
        );
        let row = Row::new("u-1");

        let err = transform(&row, &resolved(mapping, ValueBag::new())).unwrap_err();
        match err {
            TransformError::RuleFailed { field, reason } => {
                assert_eq!(field, "age");
                assert_eq!(reason, "arithmetic overflow");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_defaults_fill_unmapped_fields_only() {
        let mapping = Mapping::new().field("is_admin", FieldRule::value(true));
        let mut defaults = ValueBag::new();
        defaults.insert("is_admin".into(), Value::Bool(false));
        defaults.insert("age".into(), Value::Int64(0));

        let bag = transform(&Row::new("u-1"), &resolved(mapping, defaults)).unwrap();

        // The mapping's value wins even though a default exists.
        assert_eq!(bag["is_admin"], Value::Bool(true));
        assert_eq!(bag["age"], Value::Int64(0));
    }

    #[test]
    fn test_default_does_not_override_mapped_null() {
        let mapping = Mapping::new().field("age", FieldRule::value(Value::Null));
        let mut defaults = ValueBag::new();
        defaults.insert("age".into(), Value::Int64(18));

        let bag = transform(&Row::new("u-1"), &resolved(mapping, defaults)).unwrap();
        assert_eq!(bag["age"], Value::Null);
    }
}
