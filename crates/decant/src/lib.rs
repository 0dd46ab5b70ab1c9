//! Decant - declarative, rule-based record migration between data models.
//!
//! Declare a per-field mapping from a source entity to a target entity,
//! run it over every source record, and get a structured per-record
//! report back.
//!
//! # Example
//!
//! ```ignore
//! use decant::{
//!     Catalog, EntityDef, FieldDef, FieldRule, FieldType, Mapping, MemorySource, MemoryStore,
//!     Migrator, Row, ScalarType, UnitSpec, Value,
//! };
//! use std::sync::Arc;
//!
//! // The target schema the migration writes into.
//! let user = EntityDef::new("User", "id")
//!     .with_field(FieldDef::new("id", FieldType::scalar(ScalarType::Int64)))
//!     .with_field(FieldDef::new("username", FieldType::scalar(ScalarType::String)))
//!     .with_field(FieldDef::new("age", FieldType::scalar(ScalarType::Int64)))
//!     .with_field(FieldDef::new("is_admin", FieldType::scalar(ScalarType::Bool)));
//! let catalog = Arc::new(Catalog::with_entities([user]));
//!
//! // Legacy rows to migrate.
//! let source = MemorySource::new("LegacyUser", vec![
//!     Row::new("l-1").with("email", "a@x.com").with("age", 30i64),
//!     Row::new("l-2").with("email", "b@x.com").with("age", 41i64),
//! ]);
//!
//! let spec = UnitSpec::new("users", "User")
//!     .mapping(
//!         Mapping::new()
//!             .copy("username", "email")
//!             .field("age", FieldRule::computed(|r| {
//!                 r.field("age")
//!                     .and_then(|v| v.as_i64())
//!                     .map(|age| Value::Int64(age + 1))
//!                     .ok_or_else(|| "age unreadable".to_string())
//!             })),
//!     )
//!     .default_value("is_admin", false);
//!
//! let mut migrator = Migrator::builder(catalog, Box::new(MemoryStore::new()))
//!     .unit(spec, Box::new(source))?
//!     .build();
//!
//! let report = migrator.run();
//! assert_eq!(report.succeeded(), 2);
//! ```

pub mod migrator;

pub use migrator::{Migrator, MigratorBuilder, UnitSpec};

// Re-export the core engine API.
pub use decant_core::{
    transform, AbortedRun, Catalog, ComputedFn, ConfigError, EntityDef, FieldDef, FieldRule,
    FieldType, IdentityPolicy, Mapping, MemorySource, MemoryStore, MigrationSequence,
    MigrationUnit, Persisted, RecordOutcome, RecordStatus, ResolvedMapping, Row, RunReport,
    ScalarType, SequenceOptions, SequenceReport, SourceFault, SourceQueryable, SourceRecord,
    StoreFault, TargetStore, TransformError, UnitFault, UnitOptions, Value, ValueBag,
};

/// Re-export the core crate.
pub use decant_core as core;
