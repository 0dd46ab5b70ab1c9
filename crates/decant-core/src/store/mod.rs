//! Store collaborators: paged source reads and target persistence.

pub mod memory;

pub use memory::{MemorySource, MemoryStore};

use crate::catalog::EntityDef;
use crate::record::SourceRecord;
use crate::value::ValueBag;
use thiserror::Error;

/// Fault reading from the source store. Always fatal to the unit run:
/// the engine does not retry page fetches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceFault {
    /// Connection to the source store was lost.
    #[error("source connection lost: {detail}")]
    Connection {
        /// Underlying detail.
        detail: String,
    },

    /// A page read failed.
    #[error("source read failed: {detail}")]
    Read {
        /// Underlying detail.
        detail: String,
    },
}

/// Fault persisting to the target store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreFault {
    /// A constraint was violated for one record. Recoverable: recorded as
    /// that record's failure.
    #[error("constraint violation on '{entity}': {detail}")]
    Constraint {
        /// Target entity.
        entity: String,
        /// Which constraint, and how.
        detail: String,
    },

    /// Connection to the target store was lost. Fatal to the unit run.
    #[error("target store connection lost: {detail}")]
    Connection {
        /// Underlying detail.
        detail: String,
    },
}

impl StoreFault {
    /// Whether this fault aborts the whole unit run rather than failing
    /// one record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreFault::Connection { .. })
    }
}

/// How a value bag landed in the target store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    /// A new target entity was inserted.
    Created,
    /// An existing target entity was updated in place.
    Updated,
}

/// Paged, stable-order read access to one source entity's records.
///
/// Implementations define the iteration order (e.g. primary-key
/// ascending); it must be stable across pages of one run.
pub trait SourceQueryable {
    /// Identifier of the source entity this queryable reads.
    fn entity(&self) -> &str;

    /// Total number of records this queryable will yield.
    fn count(&mut self) -> Result<u64, SourceFault>;

    /// Names of the fields the source schema exposes, when statically
    /// introspectable. An empty vec defers source-field validation to
    /// per-record evaluation.
    fn field_names(&mut self) -> Vec<String>;

    /// Fetch up to `limit` records starting at `offset`.
    ///
    /// A page shorter than `limit` marks the end of the stream.
    fn fetch_page(
        &mut self,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<Box<dyn SourceRecord>>, SourceFault>;
}

/// Write access to the target data model.
pub trait TargetStore {
    /// Insert a new target entity from a value bag.
    fn insert(&mut self, entity: &EntityDef, bag: &ValueBag) -> Result<(), StoreFault>;

    /// Update the entity whose `key_field` matches the bag's value for
    /// that field, or insert when no match exists.
    fn upsert(
        &mut self,
        entity: &EntityDef,
        key_field: &str,
        bag: &ValueBag,
    ) -> Result<Persisted, StoreFault>;

    /// Realign identity generators (e.g. primary-key sequences) of the
    /// given entities after a run that inserted explicit identities.
    /// Stores without such generators keep the default no-op.
    fn realign_sequences(&mut self, _entities: &[String]) -> Result<(), StoreFault> {
        Ok(())
    }
}
