//! Construction-time configuration errors.

use thiserror::Error;

/// Errors raised while building a migration unit, before any record is
/// processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The target entity is not registered in the catalog.
    #[error("unknown target entity '{name}'")]
    UnknownEntity {
        /// Name of the missing entity.
        name: String,
    },

    /// A mapping or default key names a field the target entity does not
    /// declare.
    #[error("unknown field(s) on target entity '{entity}': {fields:?}")]
    UnknownFields {
        /// The target entity.
        entity: String,
        /// Every offending field name.
        fields: Vec<String>,
    },

    /// The same target field is bound by more than one mapping rule.
    #[error("field '{field}' mapped more than once for target entity '{entity}'")]
    DuplicateField {
        /// The target entity.
        entity: String,
        /// The duplicated field name.
        field: String,
    },

    /// The identity-policy key field does not exist on the target entity.
    #[error("identity key '{field}' does not exist on target entity '{entity}'")]
    UnknownIdentityField {
        /// The target entity.
        entity: String,
        /// The missing key field.
        field: String,
    },

    /// A source-field rule names a field the source schema does not
    /// expose. Raised only when the source schema is introspectable;
    /// otherwise the check surfaces per record at transform time.
    #[error("unknown field(s) on source '{source_entity}': {fields:?}")]
    UnknownSourceFields {
        /// The source entity.
        source_entity: String,
        /// Every offending field name.
        fields: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::UnknownFields {
            entity: "User".to_string(),
            fields: vec!["nickname".to_string(), "rank".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("User"));
        assert!(msg.contains("nickname"));
        assert!(msg.contains("rank"));
    }
}
