//! Embedded schema metadata store.
//!
//! Callers build [`SchemaDef`] object models, stage them in a
//! [`SchemaCache`], and import them into a [`MetaDb`]. Imported schemas
//! are queried back through the incremental [`SchemaManager`], which
//! materializes classes from storage on demand.
//!
//! ```no_run
//! use metadb::{ClassDef, ImportOptions, MetaDb, ResolveSchema, SchemaCache, SchemaDef};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), metadb::Error> {
//! let db = MetaDb::temporary()?;
//!
//! let mut schema = SchemaDef::new("Plant", "pl", 1, 0);
//! schema.add_class(ClassDef::entity("Pump"))?;
//!
//! let cache = SchemaCache::new();
//! cache.add_schema(Arc::new(schema))?;
//! db.import_schemas(&cache, ImportOptions::default())?;
//!
//! let pump = db.schemas().get_class("Plant", "Pump", ResolveSchema::ByName)?;
//! assert_eq!(pump.name(), "Pump");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

pub use metadb_core::{
    Error, ImportOptions, ImportSummary, ResolveSchema, SchemaImporter, SchemaManager, SchemaStore,
    StoreConfig, ValidationIssue,
};
pub use metadb_core::{ClassHandle, SchemaHandle};
pub use metadb_model::{
    AttributeInstance, CardinalityRange, ClassDef, ClassKey, ClassKind, ClassRef, ModelError,
    PrimitiveType, PropertyDef, PropertyType, RelationshipConstraint, RelationshipDef, SchemaCache,
    SchemaDef, SchemaKey, SupplementalInfo,
};

/// An open schema metadata database.
pub struct MetaDb {
    store: Arc<SchemaStore>,
    manager: SchemaManager,
}

impl MetaDb {
    /// Open or create a database with the given configuration.
    pub fn open(config: StoreConfig) -> Result<Self, Error> {
        let store = Arc::new(SchemaStore::open(config)?);
        let manager = SchemaManager::new(Arc::clone(&store));
        Ok(Self { store, manager })
    }

    /// Open a throwaway database for testing.
    pub fn temporary() -> Result<Self, Error> {
        Self::open(StoreConfig::temporary())
    }

    /// The incremental schema manager for this handle.
    pub fn schemas(&self) -> &SchemaManager {
        &self.manager
    }

    /// Import every schema staged in the cache, atomically.
    pub fn import_schemas(
        &self,
        cache: &SchemaCache,
        options: ImportOptions,
    ) -> Result<ImportSummary, Error> {
        SchemaImporter::new(&self.store).import(cache, options)
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.store.flush()
    }
}
