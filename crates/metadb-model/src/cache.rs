//! Staging cache for schemas awaiting import.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::ModelError;
use crate::key::SchemaKey;
use crate::schema::SchemaDef;

/// A collection of schemas staged for import.
///
/// Adding a schema also stages its transitive references, so the cache
/// always holds a closed set. The cache records which store it was
/// imported into; a cache may only ever be imported into one store.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: RwLock<BTreeMap<SchemaKey, Arc<SchemaDef>>>,
    imported_into: Mutex<Option<[u8; 16]>>,
}

impl SchemaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a schema and, recursively, any referenced schemas not
    /// already present.
    ///
    /// Fails if a schema with the same key is already staged. References
    /// that are already present are left untouched.
    pub fn add_schema(&self, schema: Arc<SchemaDef>) -> Result<(), ModelError> {
        let mut schemas = self.schemas.write();
        if schemas.contains_key(&schema.key) {
            return Err(ModelError::DuplicateSchema(schema.key.clone()));
        }
        Self::stage(&mut schemas, schema);
        Ok(())
    }

    fn stage(schemas: &mut BTreeMap<SchemaKey, Arc<SchemaDef>>, schema: Arc<SchemaDef>) {
        if schemas.contains_key(&schema.key) {
            return;
        }
        for reference in &schema.references {
            Self::stage(schemas, Arc::clone(reference));
        }
        schemas.insert(schema.key.clone(), schema);
    }

    /// Remove a staged schema by key. Returns whether it was present.
    pub fn drop_schema(&self, key: &SchemaKey) -> bool {
        self.schemas.write().remove(key).is_some()
    }

    /// Get a staged schema by exact key.
    pub fn get(&self, key: &SchemaKey) -> Option<Arc<SchemaDef>> {
        self.schemas.read().get(key).cloned()
    }

    /// Get the latest staged version of a schema by name.
    pub fn get_latest(&self, name: &str) -> Option<Arc<SchemaDef>> {
        self.schemas
            .read()
            .iter()
            .filter(|(key, _)| key.name == name)
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, schema)| Arc::clone(schema))
    }

    /// Snapshot of all staged schemas, ordered by key.
    pub fn schemas(&self) -> Vec<Arc<SchemaDef>> {
        self.schemas.read().values().cloned().collect()
    }

    /// Number of staged schemas.
    pub fn len(&self) -> usize {
        self.schemas.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.schemas.read().is_empty()
    }

    /// Remove all staged schemas and forget the import marker.
    pub fn clear(&self) {
        self.schemas.write().clear();
        *self.imported_into.lock() = None;
    }

    /// Record the store this cache was imported into.
    pub fn mark_imported(&self, store_id: [u8; 16]) {
        *self.imported_into.lock() = Some(store_id);
    }

    /// The store this cache was imported into, if any.
    pub fn imported_into(&self) -> Option<[u8; 16]> {
        *self.imported_into.lock()
    }
}
