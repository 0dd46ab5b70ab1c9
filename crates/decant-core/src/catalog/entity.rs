//! Target entity definitions.

use super::field::FieldDef;
use serde::{Deserialize, Serialize};

/// A target entity definition (table schema).
///
/// Mapping and default keys are validated against this descriptor when a
/// migration unit is built; the engine never writes a field the target
/// does not declare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity name (unique within the catalog).
    pub name: String,
    /// Name of the primary identity field.
    pub identity_field: String,
    /// Field definitions.
    pub fields: Vec<FieldDef>,
}

impl EntityDef {
    /// Create a new entity definition.
    pub fn new(name: impl Into<String>, identity_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity_field: identity_field.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check whether the entity declares a field with this name.
    pub fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    /// Get the identity field definition.
    pub fn get_identity_field(&self) -> Option<&FieldDef> {
        self.get_field(&self.identity_field)
    }

    /// Iterate the declared field names.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldType, ScalarType};

    #[test]
    fn test_entity_builder() {
        let entity = EntityDef::new("User", "id")
            .with_field(FieldDef::new("id", FieldType::scalar(ScalarType::Int64)))
            .with_field(FieldDef::new("username", FieldType::scalar(ScalarType::String)))
            .with_field(FieldDef::optional(
                "bio",
                FieldType::optional_scalar(ScalarType::String),
            ));

        assert_eq!(entity.name, "User");
        assert_eq!(entity.identity_field, "id");
        assert_eq!(entity.fields.len(), 3);
    }

    #[test]
    fn test_get_field() {
        let entity = EntityDef::new("User", "id")
            .with_field(FieldDef::new("id", FieldType::scalar(ScalarType::Int64)))
            .with_field(FieldDef::new("username", FieldType::scalar(ScalarType::String)));

        assert!(entity.has_field("id"));
        assert!(entity.has_field("username"));
        assert!(!entity.has_field("nonexistent"));
        assert!(entity.get_identity_field().is_some());
    }
}
