//! High-level migration assembly.
//!
//! Wires a catalog, a target store, and a list of declarative unit specs
//! into a ready-to-run migration sequence.

use decant_core::error::ConfigError;
use decant_core::mapping::Mapping;
use decant_core::migration::{
    MigrationSequence, MigrationUnit, SequenceOptions, SequenceReport, UnitOptions,
};
use decant_core::store::{SourceQueryable, TargetStore};
use decant_core::value::{Value, ValueBag};
use decant_core::Catalog;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info_span;

/// Declarative description of one migration unit: which target entity to
/// fill, from which rules, with which options.
#[derive(Debug, Clone)]
pub struct UnitSpec {
    name: String,
    target: String,
    mapping: Mapping,
    defaults: ValueBag,
    options: UnitOptions,
}

impl UnitSpec {
    /// Start a spec migrating into the named target entity.
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            mapping: Mapping::new(),
            defaults: ValueBag::new(),
            options: UnitOptions::default(),
        }
    }

    /// Set the field mapping.
    pub fn mapping(mut self, mapping: Mapping) -> Self {
        self.mapping = mapping;
        self
    }

    /// Set all defaults at once.
    pub fn defaults(mut self, defaults: ValueBag) -> Self {
        self.defaults = defaults;
        self
    }

    /// Add one default literal.
    pub fn default_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }

    /// Set the unit's run options.
    pub fn options(mut self, options: UnitOptions) -> Self {
        self.options = options;
        self
    }
}

/// Builder assembling a [`Migrator`].
///
/// Each unit is validated against the catalog as it is added, so a
/// misconfigured mapping fails here - before anything runs.
pub struct MigratorBuilder {
    catalog: Arc<Catalog>,
    store: Box<dyn TargetStore>,
    options: SequenceOptions,
    units: Vec<(MigrationUnit, Box<dyn SourceQueryable>)>,
}

impl MigratorBuilder {
    /// Start a builder over a catalog and a target store.
    pub fn new(catalog: Arc<Catalog>, store: Box<dyn TargetStore>) -> Self {
        Self {
            catalog,
            store,
            options: SequenceOptions::default(),
            units: Vec::new(),
        }
    }

    /// Halt the whole sequence at the first unit reporting any failure.
    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.options.stop_on_error = stop;
        self
    }

    /// Register a unit and the source it reads from.
    ///
    /// Fails synchronously when the target entity is not in the catalog
    /// or the spec's mapping, defaults, or identity key reference fields
    /// the target does not declare.
    pub fn unit(
        mut self,
        spec: UnitSpec,
        source: Box<dyn SourceQueryable>,
    ) -> Result<Self, ConfigError> {
        let target = self
            .catalog
            .get(&spec.target)
            .ok_or_else(|| ConfigError::UnknownEntity {
                name: spec.target.clone(),
            })?;
        let unit = MigrationUnit::new(spec.name, target, spec.mapping, spec.defaults, spec.options)?;
        self.units.push((unit, source));
        Ok(self)
    }

    /// Finish the builder.
    pub fn build(self) -> Migrator {
        let mut sequence = MigrationSequence::new(self.options);
        for (unit, source) in self.units {
            sequence.push(unit, source);
        }
        Migrator {
            sequence,
            store: Mutex::new(self.store),
        }
    }
}

/// A fully-wired migration: an ordered sequence of units sharing one
/// target store.
pub struct Migrator {
    sequence: MigrationSequence,
    store: Mutex<Box<dyn TargetStore>>,
}

impl Migrator {
    /// Start building a migrator.
    pub fn builder(catalog: Arc<Catalog>, store: Box<dyn TargetStore>) -> MigratorBuilder {
        MigratorBuilder::new(catalog, store)
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Whether no units are registered.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Run every unit in order and return the aggregated report.
    ///
    /// The store is acquired per unit run and released between units, so
    /// an embedder can observe progress from another thread if its store
    /// supports that.
    pub fn run(&mut self) -> SequenceReport {
        let span = info_span!("migration", units = self.sequence.len());
        let _enter = span.enter();
        self.sequence.run_all(&self.store)
    }

    /// Tear down the migrator and hand back the target store.
    pub fn into_store(self) -> Box<dyn TargetStore> {
        self.store.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decant_core::catalog::{EntityDef, FieldDef, FieldType, ScalarType};
    use decant_core::record::Row;
    use decant_core::store::{MemorySource, MemoryStore};

    fn catalog() -> Arc<Catalog> {
        let user = EntityDef::new("User", "id")
            .with_field(FieldDef::new("id", FieldType::scalar(ScalarType::Int64)))
            .with_field(FieldDef::new("username", FieldType::scalar(ScalarType::String)))
            .with_field(FieldDef::new("is_admin", FieldType::scalar(ScalarType::Bool)));
        Arc::new(Catalog::with_entities([user]))
    }

    fn source() -> Box<dyn SourceQueryable> {
        Box::new(MemorySource::new(
            "LegacyUser",
            vec![Row::new("l-1").with("email", "a@x.com")],
        ))
    }

    #[test]
    fn test_builder_rejects_unknown_entity() {
        let builder = Migrator::builder(catalog(), Box::new(MemoryStore::new()));
        let err = builder
            .unit(UnitSpec::new("users", "Ghost"), source())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::UnknownEntity { name } if name == "Ghost"));
    }

    #[test]
    fn test_builder_rejects_bad_mapping() {
        let spec = UnitSpec::new("users", "User")
            .mapping(Mapping::new().copy("nickname", "email"));
        let err = Migrator::builder(catalog(), Box::new(MemoryStore::new()))
            .unit(spec, source())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::UnknownFields { .. }));
    }

    #[test]
    fn test_run_single_unit() {
        let spec = UnitSpec::new("users", "User")
            .mapping(Mapping::new().copy("username", "email"))
            .default_value("is_admin", false);
        let mut migrator = Migrator::builder(catalog(), Box::new(MemoryStore::new()))
            .unit(spec, source())
            .unwrap()
            .build();

        assert_eq!(migrator.len(), 1);
        let report = migrator.run();
        assert!(report.is_clean());
        assert_eq!(report.succeeded(), 1);
    }
}
