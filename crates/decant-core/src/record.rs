//! Named-field read access to source records.

use crate::value::{Value, ValueBag};

/// Read-only, named-field view of one row from the source data model.
///
/// Concrete source types implement this trait once, statically; the
/// engine never inspects source rows through reflection or downcasting.
/// Foreign keys are exposed as their id value under the `<name>_id`
/// convention of the source schema.
pub trait SourceRecord {
    /// Stable identifier of this record in the source store, used to key
    /// per-record outcomes in run reports.
    fn record_id(&self) -> String;

    /// Read a field by name. Returns `None` when the record has no field
    /// with that name.
    fn field(&self, name: &str) -> Option<Value>;

    /// Names of the fields this record exposes.
    ///
    /// Sources that cannot enumerate their schema may return an empty
    /// vec; source-field validation then degrades to per-record checks.
    fn field_names(&self) -> Vec<String>;
}

/// A plain in-memory record: an id plus a bag of named values.
///
/// The record type used by the in-memory source and by tests; embedders
/// with richer source types implement [`SourceRecord`] directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: String,
    fields: ValueBag,
}

impl Row {
    /// Create an empty row with the given source identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: ValueBag::new(),
        }
    }

    /// Add a field value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set a field value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }
}

impl SourceRecord for Row {
    fn record_id(&self) -> String {
        self.id.clone()
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_field_access() {
        let row = Row::new("u-1")
            .with("email", "a@x.com")
            .with("age", 30i64);

        assert_eq!(row.record_id(), "u-1");
        assert_eq!(row.field("email"), Some(Value::String("a@x.com".into())));
        assert_eq!(row.field("age"), Some(Value::Int64(30)));
        assert_eq!(row.field("missing"), None);
    }

    #[test]
    fn test_row_field_names() {
        let row = Row::new("u-1").with("b", 1i64).with("a", 2i64);
        let names = row.field_names();
        assert!(names.contains(&"a".to_string()));
        assert!(names.contains(&"b".to_string()));
        assert_eq!(names.len(), 2);
    }
}
