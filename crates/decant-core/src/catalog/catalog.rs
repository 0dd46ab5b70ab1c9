//! Catalog of target entity descriptors.

use super::EntityDef;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Registry of target entity descriptors.
///
/// The descriptor provider consulted when migration units are built.
/// Read-mostly: registration happens during setup, lookups happen on
/// every unit construction.
#[derive(Debug, Default)]
pub struct Catalog {
    entities: RwLock<HashMap<String, EntityDef>>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog pre-populated with the given entities.
    pub fn with_entities(entities: impl IntoIterator<Item = EntityDef>) -> Self {
        let catalog = Self::new();
        for entity in entities {
            catalog.register(entity);
        }
        catalog
    }

    /// Register an entity descriptor, replacing any previous descriptor
    /// with the same name.
    pub fn register(&self, entity: EntityDef) {
        self.entities.write().insert(entity.name.clone(), entity);
    }

    /// Get an entity descriptor by name.
    pub fn get(&self, name: &str) -> Option<EntityDef> {
        self.entities.read().get(name).cloned()
    }

    /// Check whether an entity is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entities.read().contains_key(name)
    }

    /// List all registered entity names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entities.read().keys().cloned().collect();
        names.sort();
        names
    }
}
