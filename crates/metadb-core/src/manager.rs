//! Incremental schema and class loading.
//!
//! The manager fronts the durable store with an arena of materialized
//! classes keyed by schema-qualified name. Classes load individually on
//! demand, base classes load with them, and derived classes only load
//! when explicitly asked for. Load state is private to one manager; two
//! managers over the same store load independently.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use metadb_model::{
    AttributeInstance, ClassDef, ClassKey, ClassKind, PropertyDef, RelationshipDef, SchemaKey,
};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::Error;
use crate::store::{ClassRow, SchemaRow, SchemaStore};

/// How the schema part of a class lookup is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveSchema {
    /// Treat the argument as the full schema name.
    ByName,
    /// Treat the argument as the schema's namespace prefix.
    ByAlias,
    /// Try the full name first, then the namespace prefix.
    AutoDetect,
}

/// Per-schema load bookkeeping.
#[derive(Debug)]
struct SchemaState {
    key: SchemaKey,
    alias: String,
    fully_loaded: bool,
    loaded: BTreeSet<String>,
}

impl SchemaState {
    fn from_row(row: &SchemaRow) -> Self {
        Self {
            key: row.key(),
            alias: row.alias.clone(),
            fully_loaded: false,
            loaded: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    schemas: BTreeMap<String, SchemaState>,
    classes: BTreeMap<ClassKey, Arc<ClassDef>>,
    /// Explicitly populated derived-class index.
    derived: BTreeMap<ClassKey, Vec<ClassKey>>,
}

/// Loads schemas and classes from a store, incrementally.
pub struct SchemaManager {
    store: Arc<SchemaStore>,
    registry: RwLock<Registry>,
}

impl SchemaManager {
    /// Create a manager over a store.
    pub fn new(store: Arc<SchemaStore>) -> Self {
        Self {
            store,
            registry: RwLock::new(Registry::default()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<SchemaStore> {
        &self.store
    }

    /// Get a schema handle by name.
    ///
    /// With `ensure_all_classes_loaded` every class row of the schema
    /// is materialized in one pass; the call is idempotent and never
    /// touches storage again once the schema is fully loaded. Without
    /// it, the handle reflects whatever subset loaded so far.
    pub fn get_schema(
        &self,
        name: &str,
        ensure_all_classes_loaded: bool,
    ) -> Result<SchemaHandle<'_>, Error> {
        self.ensure_schema_state(name)?;

        if ensure_all_classes_loaded {
            let fully_loaded = self
                .registry
                .read()
                .schemas
                .get(name)
                .map(|s| s.fully_loaded)
                .unwrap_or(false);
            if !fully_loaded {
                let rows = self.store.class_rows_for_schema(name)?;
                debug!(schema = name, classes = rows.len(), "loading full schema");
                let mut loaded = Vec::with_capacity(rows.len());
                for row in &rows {
                    loaded.push((ClassKey::new(&row.schema, &row.name), Arc::new(row.to_def()?)));
                }
                let mut reg = self.registry.write();
                for (key, def) in loaded {
                    if let Some(state) = reg.schemas.get_mut(name) {
                        state.loaded.insert(key.name.clone());
                    }
                    reg.classes.entry(key).or_insert(def);
                }
                if let Some(state) = reg.schemas.get_mut(name) {
                    state.fully_loaded = true;
                }
            }
        }

        Ok(SchemaHandle {
            manager: self,
            name: name.to_string(),
        })
    }

    /// Get a single class, loading it and its transitive base classes
    /// only. Siblings, derived classes, and the derived index stay
    /// untouched.
    pub fn get_class(
        &self,
        schema: &str,
        class: &str,
        resolve: ResolveSchema,
    ) -> Result<ClassHandle<'_>, Error> {
        let schema_name = self.resolve_schema_name(schema, resolve)?;
        let def = self.load_class(&schema_name, class)?;
        Ok(ClassHandle {
            manager: self,
            key: ClassKey::new(schema_name, class),
            def,
        })
    }

    /// Query storage for every class deriving from the given class and
    /// populate the derived index for it. Subsequent calls, and the
    /// handle's cheap accessor, serve from the index.
    pub fn derived_classes<'a>(
        &'a self,
        base: &ClassHandle<'a>,
    ) -> Result<Vec<ClassHandle<'a>>, Error> {
        let cached = self.registry.read().derived.get(&base.key).cloned();
        let keys = match cached {
            Some(keys) => keys,
            None => {
                let rows = self.store.derived_class_rows(&base.key)?;
                debug!(base = %base.key, derived = rows.len(), "populating derived index");
                let mut keys = Vec::with_capacity(rows.len());
                for row in &rows {
                    keys.push(ClassKey::new(&row.schema, &row.name));
                    self.load_class(&row.schema, &row.name)?;
                }
                self.registry
                    .write()
                    .derived
                    .insert(base.key.clone(), keys.clone());
                keys
            }
        };
        self.handles_for(keys)
    }

    /// The derived index entry for a class, without touching storage.
    /// Empty until [`SchemaManager::derived_classes`] populated it.
    pub(crate) fn derived_index(&self, key: &ClassKey) -> Vec<ClassKey> {
        self.registry
            .read()
            .derived
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    fn handles_for(&self, keys: Vec<ClassKey>) -> Result<Vec<ClassHandle<'_>>, Error> {
        keys.into_iter()
            .map(|key| {
                let def = self.class_def(&key)?;
                Ok(ClassHandle {
                    manager: self,
                    key,
                    def,
                })
            })
            .collect()
    }

    /// Arena lookup with lazy fallback to storage.
    pub(crate) fn class_def(&self, key: &ClassKey) -> Result<Arc<ClassDef>, Error> {
        self.load_class(&key.schema, &key.name)
    }

    fn resolve_schema_name(&self, arg: &str, resolve: ResolveSchema) -> Result<String, Error> {
        match resolve {
            ResolveSchema::ByName => Ok(arg.to_string()),
            ResolveSchema::ByAlias => self
                .schema_name_by_alias(arg)?
                .ok_or_else(|| Error::NotFound(format!("schema with alias '{arg}'"))),
            ResolveSchema::AutoDetect => {
                let known = self.registry.read().schemas.contains_key(arg)
                    || self.store.schema_row(arg)?.is_some();
                if known {
                    return Ok(arg.to_string());
                }
                self.schema_name_by_alias(arg)?
                    .ok_or_else(|| Error::NotFound(format!("schema '{arg}'")))
            }
        }
    }

    fn schema_name_by_alias(&self, alias: &str) -> Result<Option<String>, Error> {
        let cached = self
            .registry
            .read()
            .schemas
            .values()
            .find(|s| s.alias == alias)
            .map(|s| s.key.name.clone());
        if cached.is_some() {
            return Ok(cached);
        }
        Ok(self.store.schema_row_by_alias(alias)?.map(|r| r.name))
    }

    /// Make sure the registry knows the schema; its classes stay
    /// unloaded.
    fn ensure_schema_state(&self, name: &str) -> Result<(), Error> {
        if self.registry.read().schemas.contains_key(name) {
            return Ok(());
        }
        let Some(row) = self.store.schema_row(name)? else {
            return Err(Error::NotFound(format!("schema '{name}'")));
        };
        self.registry
            .write()
            .schemas
            .entry(name.to_string())
            .or_insert_with(|| SchemaState::from_row(&row));
        Ok(())
    }

    /// Materialize one class plus its transitive base classes.
    ///
    /// Nothing in the registry changes when the class does not exist.
    fn load_class(&self, schema: &str, class: &str) -> Result<Arc<ClassDef>, Error> {
        let key = ClassKey::new(schema, class);
        if let Some(def) = self.registry.read().classes.get(&key) {
            return Ok(Arc::clone(def));
        }

        let Some(row) = self.store.class_row(schema, class)? else {
            return Err(Error::NotFound(format!("class '{key}'")));
        };

        // Fetch the whole base closure before touching the registry.
        let mut rows: Vec<ClassRow> = vec![row];
        let mut fetched: HashSet<ClassKey> = HashSet::from([key.clone()]);
        let mut i = 0;
        while i < rows.len() {
            let bases: Vec<ClassKey> = rows[i]
                .base_classes
                .iter()
                .map(|b| ClassKey::new(&b.schema, &b.name))
                .collect();
            i += 1;
            for base_key in bases {
                if !fetched.insert(base_key.clone()) {
                    continue;
                }
                if self.registry.read().classes.contains_key(&base_key) {
                    continue;
                }
                let Some(base_row) = self.store.class_row(&base_key.schema, &base_key.name)?
                else {
                    return Err(Error::NotFound(format!("base class '{base_key}'")));
                };
                rows.push(base_row);
            }
        }

        let mut loaded = Vec::with_capacity(rows.len());
        let mut schema_rows: Vec<SchemaRow> = Vec::new();
        for row in &rows {
            if !self.registry.read().schemas.contains_key(&row.schema)
                && !schema_rows.iter().any(|s| s.name == row.schema)
            {
                let Some(schema_row) = self.store.schema_row(&row.schema)? else {
                    return Err(Error::NotFound(format!("schema '{}'", row.schema)));
                };
                schema_rows.push(schema_row);
            }
            loaded.push((ClassKey::new(&row.schema, &row.name), Arc::new(row.to_def()?)));
        }
        debug!(class = %key, loaded = loaded.len(), "loading class closure");

        let mut reg = self.registry.write();
        for schema_row in &schema_rows {
            reg.schemas
                .entry(schema_row.name.clone())
                .or_insert_with(|| SchemaState::from_row(schema_row));
        }
        for (class_key, def) in loaded {
            if let Some(state) = reg.schemas.get_mut(&class_key.schema) {
                state.loaded.insert(class_key.name.clone());
            }
            reg.classes.entry(class_key).or_insert(def);
        }
        reg.classes
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("class '{key}'")))
    }
}

/// A schema as currently materialized by one manager.
pub struct SchemaHandle<'a> {
    manager: &'a SchemaManager,
    name: String,
}

impl fmt::Debug for SchemaHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaHandle")
            .field("name", &self.name)
            .finish()
    }
}

impl<'a> SchemaHandle<'a> {
    /// Schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema key.
    pub fn key(&self) -> SchemaKey {
        let reg = self.manager.registry.read();
        reg.schemas
            .get(&self.name)
            .map(|s| s.key.clone())
            .unwrap_or_else(|| SchemaKey::new(self.name.clone(), 0, 0))
    }

    /// The schema's namespace prefix.
    pub fn alias(&self) -> String {
        let reg = self.manager.registry.read();
        reg.schemas
            .get(&self.name)
            .map(|s| s.alias.clone())
            .unwrap_or_default()
    }

    /// Number of classes materialized so far. Equals the authored
    /// class count once the schema is fully loaded.
    pub fn class_count(&self) -> usize {
        let reg = self.manager.registry.read();
        reg.schemas
            .get(&self.name)
            .map(|s| s.loaded.len())
            .unwrap_or(0)
    }

    /// Whether every class of the schema has been materialized.
    pub fn is_fully_loaded(&self) -> bool {
        let reg = self.manager.registry.read();
        reg.schemas
            .get(&self.name)
            .map(|s| s.fully_loaded)
            .unwrap_or(false)
    }

    /// Get a class of this schema, loading it if needed.
    pub fn get_class(&self, class: &str) -> Result<ClassHandle<'a>, Error> {
        self.manager
            .get_class(&self.name, class, ResolveSchema::ByName)
    }
}

/// A materialized class.
pub struct ClassHandle<'a> {
    manager: &'a SchemaManager,
    key: ClassKey,
    def: Arc<ClassDef>,
}

impl fmt::Debug for ClassHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassHandle").field("key", &self.key).finish()
    }
}

impl<'a> ClassHandle<'a> {
    /// Class name.
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Schema-qualified identity.
    pub fn key(&self) -> &ClassKey {
        &self.key
    }

    /// Class kind.
    pub fn kind(&self) -> ClassKind {
        self.def.kind
    }

    /// The underlying definition.
    pub fn def(&self) -> &Arc<ClassDef> {
        &self.def
    }

    /// Relationship payload, if this is a relationship class.
    pub fn relationship(&self) -> Option<&RelationshipDef> {
        self.def.relationship.as_ref()
    }

    /// Derived classes as recorded in the index. Empty until
    /// [`SchemaManager::derived_classes`] populated it; never queries
    /// storage.
    pub fn derived_classes(&self) -> Vec<ClassHandle<'a>> {
        let keys = self.manager.derived_index(&self.key);
        keys.into_iter()
            .filter_map(|key| {
                let def = self.manager.class_def(&key).ok()?;
                Some(ClassHandle {
                    manager: self.manager,
                    key,
                    def,
                })
            })
            .collect()
    }

    /// Properties of this class, optionally with inherited ones. A
    /// derived property shadows a base property of the same name.
    pub fn properties(&self, include_base: bool) -> Result<Vec<PropertyDef>, Error> {
        let mut out: Vec<PropertyDef> = self.def.properties.clone();
        if include_base {
            let mut seen: HashSet<String> =
                out.iter().map(|p| p.name.to_lowercase()).collect();
            let mut visited: HashSet<ClassKey> = HashSet::from([self.key.clone()]);
            let mut stack: Vec<ClassKey> = self.base_keys();
            while let Some(base_key) = stack.pop() {
                if !visited.insert(base_key.clone()) {
                    continue;
                }
                let base = self.manager.class_def(&base_key)?;
                for prop in &base.properties {
                    if seen.insert(prop.name.to_lowercase()) {
                        out.push(prop.clone());
                    }
                }
                for next in &base.base_classes {
                    stack.push(next.to_key(&base_key.schema));
                }
            }
        }
        Ok(out)
    }

    /// Number of properties, direct or including inherited.
    pub fn property_count(&self, include_base: bool) -> Result<usize, Error> {
        Ok(self.properties(include_base)?.len())
    }

    /// Look up a property by exact name, searching base classes after
    /// the class itself.
    pub fn get_property(&self, name: &str) -> Result<Option<PropertyDef>, Error> {
        Ok(self
            .properties(true)?
            .into_iter()
            .find(|p| p.name == name))
    }

    /// Custom attributes, optionally including inherited ones. A
    /// directly attached instance shadows an inherited instance of the
    /// same attribute class.
    pub fn attributes(&self, include_base: bool) -> Result<Vec<AttributeInstance>, Error> {
        let mut out = self.def.attributes.clone();
        if include_base {
            let mut visited: HashSet<ClassKey> = HashSet::from([self.key.clone()]);
            let mut stack: Vec<ClassKey> = self.base_keys();
            while let Some(base_key) = stack.pop() {
                if !visited.insert(base_key.clone()) {
                    continue;
                }
                let base = self.manager.class_def(&base_key)?;
                for attr in &base.attributes {
                    if !out.iter().any(|a| a.attr_class == attr.attr_class) {
                        out.push(attr.clone());
                    }
                }
                for next in &base.base_classes {
                    stack.push(next.to_key(&base_key.schema));
                }
            }
        }
        Ok(out)
    }

    fn base_keys(&self) -> Vec<ClassKey> {
        self.def
            .base_classes
            .iter()
            .map(|b| b.to_key(&self.key.schema))
            .collect()
    }
}
