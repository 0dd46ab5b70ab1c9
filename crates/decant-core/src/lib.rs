//! Decant Core - rule-based record migration between data models.
//!
//! Streams rows out of a source data model, transforms them field by
//! field through a validated mapping, persists them into a target data
//! model, and reports every record's outcome.

pub mod catalog;
pub mod error;
pub mod mapping;
pub mod migration;
pub mod record;
pub mod store;
pub mod value;

pub use catalog::{Catalog, EntityDef, FieldDef, FieldType, ScalarType};
pub use error::ConfigError;
pub use mapping::{transform, ComputedFn, FieldRule, Mapping, ResolvedMapping, TransformError};
pub use migration::{
    AbortedRun, IdentityPolicy, MigrationSequence, MigrationUnit, RecordOutcome, RecordStatus,
    RunReport, SequenceOptions, SequenceReport, UnitFault, UnitOptions,
};
pub use record::{Row, SourceRecord};
pub use store::{
    MemorySource, MemoryStore, Persisted, SourceFault, SourceQueryable, StoreFault, TargetStore,
};
pub use value::{Value, ValueBag};
