//! Per-field transformation rules.

use crate::record::SourceRecord;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Signature of a computed rule: one source record in, one value out.
///
/// Failures are reported as strings; the engine wraps them with the
/// target field name when it records the outcome.
pub type ComputedFn = Arc<dyn Fn(&dyn SourceRecord) -> Result<Value, String> + Send + Sync>;

/// The rule producing the value of one target field.
///
/// A tagged variant replaces shape-sniffing of the mapping's values: the
/// resolver inspects the tag, never the payload.
#[derive(Clone)]
pub enum FieldRule {
    /// Copy a named field verbatim from the source record.
    Source(String),
    /// Invoke a function with the source record, once per record.
    Computed(ComputedFn),
    /// Use a literal captured when the mapping was constructed.
    ///
    /// The literal is frozen at construction time and shared by every
    /// record of the run. A per-record timestamp needs a `Computed` rule,
    /// not a `Static` one.
    Static(Value),
}

impl FieldRule {
    /// Rule copying a source field of the given name.
    pub fn source(name: impl Into<String>) -> Self {
        FieldRule::Source(name.into())
    }

    /// Rule computing the value from the source record.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&dyn SourceRecord) -> Result<Value, String> + Send + Sync + 'static,
    {
        FieldRule::Computed(Arc::new(f))
    }

    /// Rule producing a fixed literal.
    pub fn value(v: impl Into<Value>) -> Self {
        FieldRule::Static(v.into())
    }

    /// Short tag name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldRule::Source(_) => "source",
            FieldRule::Computed(_) => "computed",
            FieldRule::Static(_) => "static",
        }
    }
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRule::Source(name) => f.debug_tuple("Source").field(name).finish(),
            FieldRule::Computed(_) => f.write_str("Computed(<fn>)"),
            FieldRule::Static(value) => f.debug_tuple("Static").field(value).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Row;

    #[test]
    fn test_rule_kinds() {
        assert_eq!(FieldRule::source("email").kind(), "source");
        assert_eq!(FieldRule::value(false).kind(), "static");
        assert_eq!(
            FieldRule::computed(|_| Ok(Value::Null)).kind(),
            "computed"
        );
    }

    #[test]
    fn test_computed_rule_invocation() {
        let rule = FieldRule::computed(|record| {
            record
                .field("age")
                .and_then(|v| v.as_i64())
                .map(|age| Value::Int64(age + 1))
                .ok_or_else(|| "age missing or not an integer".to_string())
        });

        let row = Row::new("u-1").with("age", 30i64);
        if let FieldRule::Computed(f) = &rule {
            assert_eq!(f(&row), Ok(Value::Int64(31)));
        } else {
            panic!("expected computed rule");
        }
    }

    #[test]
    fn test_debug_hides_closure() {
        let rule = FieldRule::computed(|_| Ok(Value::Null));
        assert_eq!(format!("{rule:?}"), "Computed(<fn>)");
    }
}
