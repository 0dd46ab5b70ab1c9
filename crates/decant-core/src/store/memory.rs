//! In-memory store implementations.
//!
//! Back tests and embedders that run migrations without a real database.
//! The target store type-checks value bags against the descriptor, so
//! constraint-violation paths are exercisable without external storage.

use super::{Persisted, SourceFault, SourceQueryable, StoreFault, TargetStore};
use crate::catalog::{EntityDef, ScalarType};
use crate::record::{Row, SourceRecord};
use crate::value::{Value, ValueBag};
use std::collections::HashMap;
use std::sync::Arc;

/// Predicate deciding which source rows a [`MemorySource`] yields.
pub type RowFilter = Arc<dyn Fn(&Row) -> bool + Send + Sync>;

/// A paged source over an in-memory vec of rows, yielded in insertion
/// order.
#[derive(Clone)]
pub struct MemorySource {
    entity: String,
    rows: Vec<Row>,
    filter: Option<RowFilter>,
}

impl MemorySource {
    /// Create a source over the given rows.
    pub fn new(entity: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            entity: entity.into(),
            rows,
            filter: None,
        }
    }

    /// Restrict the source to rows matching the predicate, applied before
    /// pagination so offsets stay stable.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    fn visible(&self) -> Vec<&Row> {
        match &self.filter {
            Some(filter) => self.rows.iter().filter(|r| filter(r)).collect(),
            None => self.rows.iter().collect(),
        }
    }
}

impl SourceQueryable for MemorySource {
    fn entity(&self) -> &str {
        &self.entity
    }

    fn count(&mut self) -> Result<u64, SourceFault> {
        Ok(self.visible().len() as u64)
    }

    fn field_names(&mut self) -> Vec<String> {
        let mut names: Vec<String> = self
            .rows
            .iter()
            .flat_map(|r| r.field_names())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn fetch_page(
        &mut self,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<Box<dyn SourceRecord>>, SourceFault> {
        let visible = self.visible();
        let page = visible
            .into_iter()
            .skip(offset as usize)
            .take(limit)
            .map(|r| Box::new(r.clone()) as Box<dyn SourceRecord>)
            .collect();
        Ok(page)
    }
}

/// An in-memory target store keyed by entity name.
///
/// Enforces the descriptor on every write: undeclared fields, type
/// mismatches, missing required fields, and duplicate identities all
/// surface as recoverable constraint faults. Integer identities are
/// assigned from a per-entity sequence when the bag does not carry one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: HashMap<String, Vec<ValueBag>>,
    next_ids: HashMap<String, i64>,
    identity_fields: HashMap<String, String>,
    connected: bool,
}

impl MemoryStore {
    /// Create an empty, connected store.
    pub fn new() -> Self {
        Self {
            rows: HashMap::new(),
            next_ids: HashMap::new(),
            identity_fields: HashMap::new(),
            connected: true,
        }
    }

    /// Simulate connectivity loss: every subsequent write fails with a
    /// fatal fault until [`MemoryStore::reconnect`] is called.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Restore connectivity after [`MemoryStore::disconnect`].
    pub fn reconnect(&mut self) {
        self.connected = true;
    }

    /// Rows persisted for an entity, in insertion order.
    pub fn rows(&self, entity: &str) -> &[ValueBag] {
        self.rows.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of rows persisted for an entity.
    pub fn len(&self, entity: &str) -> usize {
        self.rows(entity).len()
    }

    /// Whether no rows are persisted for an entity.
    pub fn is_empty(&self, entity: &str) -> bool {
        self.len(entity) == 0
    }

    /// The next identity value the store would assign for an entity.
    pub fn next_identity(&self, entity: &str) -> i64 {
        self.next_ids.get(entity).copied().unwrap_or(1)
    }

    fn check_connected(&self) -> Result<(), StoreFault> {
        if self.connected {
            Ok(())
        } else {
            Err(StoreFault::Connection {
                detail: "memory store disconnected".to_string(),
            })
        }
    }

    fn remember_identity(&mut self, entity: &EntityDef) {
        self.identity_fields
            .insert(entity.name.clone(), entity.identity_field.clone());
    }

    fn validate(&self, entity: &EntityDef, bag: &ValueBag) -> Result<(), StoreFault> {
        for (field, value) in bag {
            let def = entity.get_field(field).ok_or_else(|| StoreFault::Constraint {
                entity: entity.name.clone(),
                detail: format!("undeclared field '{field}'"),
            })?;
            if !def.field_type.admits(value) {
                return Err(StoreFault::Constraint {
                    entity: entity.name.clone(),
                    detail: format!("value for field '{field}' does not match its declared type"),
                });
            }
        }

        for def in &entity.fields {
            if def.required && def.name != entity.identity_field && !bag.contains_key(&def.name) {
                return Err(StoreFault::Constraint {
                    entity: entity.name.clone(),
                    detail: format!("required field '{}' not populated", def.name),
                });
            }
        }

        Ok(())
    }

    fn assign_identity(&mut self, entity: &EntityDef, bag: &mut ValueBag) -> Result<(), StoreFault> {
        if bag.contains_key(&entity.identity_field) {
            let id = &bag[&entity.identity_field];
            let duplicate = self
                .rows(&entity.name)
                .iter()
                .any(|row| row.get(&entity.identity_field) == Some(id));
            if duplicate {
                return Err(StoreFault::Constraint {
                    entity: entity.name.clone(),
                    detail: format!("duplicate identity '{:?}'", id),
                });
            }
            return Ok(());
        }

        let assignable = entity
            .get_identity_field()
            .map(|def| *def.field_type.scalar_type() == ScalarType::Int64)
            .unwrap_or(false);
        if !assignable {
            return Err(StoreFault::Constraint {
                entity: entity.name.clone(),
                detail: format!(
                    "identity field '{}' not populated and not assignable",
                    entity.identity_field
                ),
            });
        }

        let next = self.next_ids.entry(entity.name.clone()).or_insert(1);
        bag.insert(entity.identity_field.clone(), Value::Int64(*next));
        *next += 1;
        Ok(())
    }
}

impl TargetStore for MemoryStore {
    fn insert(&mut self, entity: &EntityDef, bag: &ValueBag) -> Result<(), StoreFault> {
        self.check_connected()?;
        self.validate(entity, bag)?;
        self.remember_identity(entity);

        let mut row = bag.clone();
        self.assign_identity(entity, &mut row)?;
        self.rows.entry(entity.name.clone()).or_default().push(row);
        Ok(())
    }

    fn upsert(
        &mut self,
        entity: &EntityDef,
        key_field: &str,
        bag: &ValueBag,
    ) -> Result<Persisted, StoreFault> {
        self.check_connected()?;
        self.validate(entity, bag)?;
        self.remember_identity(entity);

        let key = bag.get(key_field).ok_or_else(|| StoreFault::Constraint {
            entity: entity.name.clone(),
            detail: format!("identity key '{key_field}' missing from record"),
        })?;

        if let Some(rows) = self.rows.get_mut(&entity.name) {
            if let Some(row) = rows.iter_mut().find(|row| row.get(key_field) == Some(key)) {
                row.extend(bag.clone());
                return Ok(Persisted::Updated);
            }
        }

        let mut row = bag.clone();
        self.assign_identity(entity, &mut row)?;
        self.rows.entry(entity.name.clone()).or_default().push(row);
        Ok(Persisted::Created)
    }

    fn realign_sequences(&mut self, entities: &[String]) -> Result<(), StoreFault> {
        self.check_connected()?;

        for entity in entities {
            let Some(identity_field) = self.identity_fields.get(entity).cloned() else {
                continue;
            };
            let max_id = self
                .rows(entity)
                .iter()
                .filter_map(|row| row.get(&identity_field))
                .filter_map(Value::as_i64)
                .max();
            if let Some(max_id) = max_id {
                self.next_ids.insert(entity.clone(), max_id + 1);
            }
        }
        Ok(())
    }
}
