//! The sled-backed schema store.

use metadb_model::ClassKey;
use sled::transaction::ConflictableTransactionError;
use sled::{Db, Transactional, Tree};

use super::rows::{ClassRow, SchemaRow};
use super::StoreConfig;
use crate::error::Error;

/// Tree name for schema rows (key = schema name).
const SCHEMAS_TREE: &str = "meta:schemas";

/// Tree name for class rows (key = schema name, NUL, class name).
const CLASSES_TREE: &str = "meta:classes";

/// Tree name for store identity.
const STORE_TREE: &str = "meta:store";

/// Key of the store identity record.
const STORE_ID_KEY: &[u8] = b"store_id";

/// All durable writes of one import, applied atomically.
#[derive(Debug, Default)]
pub struct ImportBatch {
    /// Schema rows to insert or replace.
    pub schemas: Vec<SchemaRow>,
    /// Class rows to insert or replace.
    pub classes: Vec<ClassRow>,
}

impl ImportBatch {
    /// Whether the batch contains no writes.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.classes.is_empty()
    }
}

/// Durable storage for schema metadata.
///
/// One row per schema name in the schemas tree; one row per class in
/// the classes tree, keyed so that a schema's classes form a contiguous
/// prefix range in declaration order of the key bytes.
pub struct SchemaStore {
    db: Db,
    schemas_tree: Tree,
    classes_tree: Tree,
    store_id: [u8; 16],
}

impl SchemaStore {
    /// Open or create a schema store with the given configuration.
    pub fn open(config: StoreConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        let schemas_tree = db.open_tree(SCHEMAS_TREE)?;
        let classes_tree = db.open_tree(CLASSES_TREE)?;
        let store_tree = db.open_tree(STORE_TREE)?;

        let store_id = match store_tree.get(STORE_ID_KEY)? {
            Some(bytes) if bytes.len() == 16 => {
                let mut id = [0u8; 16];
                id.copy_from_slice(&bytes);
                id
            }
            _ => {
                let id = Self::generate_id();
                store_tree.insert(STORE_ID_KEY, &id)?;
                id
            }
        };

        Ok(Self {
            db,
            schemas_tree,
            classes_tree,
            store_id,
        })
    }

    /// The identity of this store, generated on first open.
    pub fn store_id(&self) -> [u8; 16] {
        self.store_id
    }

    /// Get the durable schema row by name.
    pub fn schema_row(&self, name: &str) -> Result<Option<SchemaRow>, Error> {
        match self.schemas_tree.get(name.as_bytes())? {
            Some(bytes) => Ok(Some(SchemaRow::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Find the durable schema row whose alias matches.
    pub fn schema_row_by_alias(&self, alias: &str) -> Result<Option<SchemaRow>, Error> {
        for entry in self.schemas_tree.iter() {
            let (_, bytes) = entry?;
            let row = SchemaRow::from_bytes(&bytes)?;
            if row.alias == alias {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    /// Get one durable class row.
    pub fn class_row(&self, schema: &str, class: &str) -> Result<Option<ClassRow>, Error> {
        match self.classes_tree.get(Self::class_key(schema, class))? {
            Some(bytes) => Ok(Some(ClassRow::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get every class row of one schema.
    pub fn class_rows_for_schema(&self, schema: &str) -> Result<Vec<ClassRow>, Error> {
        let mut rows = Vec::new();
        for entry in self.classes_tree.scan_prefix(Self::class_prefix(schema)) {
            let (_, bytes) = entry?;
            rows.push(ClassRow::from_bytes(&bytes)?);
        }
        Ok(rows)
    }

    /// Find every class row whose base-class set names the given class.
    ///
    /// Scans the whole classes tree; derived-class queries are explicit
    /// and rare, so no reverse index is maintained.
    pub fn derived_class_rows(&self, base: &ClassKey) -> Result<Vec<ClassRow>, Error> {
        let mut rows = Vec::new();
        for entry in self.classes_tree.iter() {
            let (_, bytes) = entry?;
            let row = ClassRow::from_bytes(&bytes)?;
            if row
                .base_classes
                .iter()
                .any(|b| b.schema == base.schema && b.name == base.name)
            {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Apply an import batch inside one multi-tree transaction.
    ///
    /// All rows land or none do.
    pub fn apply_import(&self, batch: &ImportBatch) -> Result<(), Error> {
        if batch.is_empty() {
            return Ok(());
        }

        let result: Result<(), sled::transaction::TransactionError<Error>> =
            (&self.schemas_tree, &self.classes_tree).transaction(|(schemas_tx, classes_tx)| {
                for row in &batch.schemas {
                    let bytes = row
                        .to_bytes()
                        .map_err(ConflictableTransactionError::Abort)?;
                    schemas_tx.insert(row.name.as_bytes(), bytes)?;
                }
                for row in &batch.classes {
                    let bytes = row
                        .to_bytes()
                        .map_err(ConflictableTransactionError::Abort)?;
                    classes_tx.insert(Self::class_key(&row.schema, &row.name), bytes)?;
                }
                Ok(())
            });

        match result {
            Ok(()) => Ok(()),
            Err(sled::transaction::TransactionError::Abort(e)) => Err(e),
            Err(sled::transaction::TransactionError::Storage(e)) => Err(Error::Storage(e)),
        }
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    /// Generate a store identity (UUID v4 bytes).
    fn generate_id() -> [u8; 16] {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::time::{SystemTime, UNIX_EPOCH};

        // Counter to ensure uniqueness even with same timestamp
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        let counter = COUNTER.fetch_add(1, Ordering::SeqCst);

        let mut id = [0u8; 16];
        id[..8].copy_from_slice(&now.to_le_bytes());
        id[8..16].copy_from_slice(&counter.to_le_bytes());

        // Set UUID version 4 bits
        id[6] = (id[6] & 0x0f) | 0x40;
        id[8] = (id[8] & 0x3f) | 0x80;

        id
    }

    /// Key of a class row: schema name, NUL separator, class name.
    fn class_key(schema: &str, class: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(schema.len() + 1 + class.len());
        key.extend_from_slice(schema.as_bytes());
        key.push(0);
        key.extend_from_slice(class.as_bytes());
        key
    }

    /// Prefix for scanning all class rows of a schema.
    fn class_prefix(schema: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(schema.len() + 1);
        prefix.extend_from_slice(schema.as_bytes());
        prefix.push(0);
        prefix
    }
}
