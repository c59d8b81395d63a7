//! Transactional schema import.

use std::collections::HashMap;
use std::sync::Arc;

use metadb_model::{SchemaCache, SchemaDef, SchemaKey};
use tracing::{info, warn};

use crate::error::Error;
use crate::store::{ClassRow, ImportBatch, SchemaRow, SchemaStore};
use crate::supplement::supplement_schema;
use crate::validate::validate_schemas;

/// Options controlling one import call.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Whether supplemental overlays are resolved and merged.
    pub supplement: bool,
    /// Whether updating an already-durable schema is permitted.
    pub allow_update: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            supplement: true,
            allow_update: false,
        }
    }
}

impl ImportOptions {
    /// Set whether supplemental overlays are applied.
    pub fn supplement(mut self, supplement: bool) -> Self {
        self.supplement = supplement;
        self
    }

    /// Set whether schema updates are permitted.
    pub fn allow_update(mut self, allow_update: bool) -> Self {
        self.allow_update = allow_update;
        self
    }
}

/// What one import call wrote.
#[derive(Debug, Default)]
pub struct ImportSummary {
    /// Schemas written as new or updated rows.
    pub imported: Vec<SchemaKey>,
    /// Schemas already durable at an identical key, left untouched.
    pub unchanged: Vec<SchemaKey>,
}

/// Persists staged schemas into a store, atomically.
pub struct SchemaImporter<'a> {
    store: &'a SchemaStore,
}

impl<'a> SchemaImporter<'a> {
    /// Create an importer over a store.
    pub fn new(store: &'a SchemaStore) -> Self {
        Self { store }
    }

    /// Import every schema staged in the cache.
    ///
    /// Validation and resolution run before any durable write; the
    /// writes themselves land in one transaction. On success the cache
    /// is bound to this store and may not be imported elsewhere.
    pub fn import(
        &self,
        cache: &SchemaCache,
        options: ImportOptions,
    ) -> Result<ImportSummary, Error> {
        if let Some(bound) = cache.imported_into() {
            if bound != self.store.store_id() {
                return Err(Error::StoreMismatch);
            }
        }

        let staged = cache.schemas();
        let (supplementals, primaries): (Vec<_>, Vec<_>) =
            staged.iter().cloned().partition(|s| s.is_supplemental());

        // Orphaned supplementals are dropped, never an import failure.
        let mut reachable = Vec::with_capacity(supplementals.len());
        for s in supplementals {
            let Some(info) = &s.supplemental else {
                continue;
            };
            if primaries.iter().any(|p| p.name() == info.primary_name)
                || self.store.schema_row(&info.primary_name)?.is_some()
            {
                reachable.push(s);
            } else {
                warn!(
                    supplemental = %s.key,
                    primary = %info.primary_name,
                    "primary schema not found, skipping supplemental"
                );
            }
        }
        let supplementals = reachable;

        let effective: Vec<Arc<SchemaDef>> = primaries
            .iter()
            .map(|p| {
                if options.supplement {
                    Arc::new(supplement_schema(p, &supplementals))
                } else {
                    Arc::clone(p)
                }
            })
            .collect();

        self.check_references(&primaries, &staged)?;

        let issues = validate_schemas(&effective);
        if !issues.is_empty() {
            return Err(Error::SchemaValidationFailed { issues });
        }

        let mut batch = ImportBatch::default();
        let mut summary = ImportSummary::default();
        for schema in effective.iter().chain(supplementals.iter()) {
            if self.plan_schema(schema, options, &mut batch)? {
                summary.imported.push(schema.key.clone());
            } else {
                summary.unchanged.push(schema.key.clone());
            }
        }

        self.store.apply_import(&batch)?;
        cache.mark_imported(self.store.store_id());

        info!(
            imported = summary.imported.len(),
            unchanged = summary.unchanged.len(),
            "schema import committed"
        );
        Ok(summary)
    }

    /// Every referenced schema must be staged or already durable.
    fn check_references(
        &self,
        primaries: &[Arc<SchemaDef>],
        staged: &[Arc<SchemaDef>],
    ) -> Result<(), Error> {
        for schema in primaries {
            for reference in &schema.references {
                let in_cache = staged.iter().any(|s| s.key == reference.key);
                let in_store = self.store.schema_row(reference.name())?.is_some();
                if !in_cache && !in_store {
                    return Err(Error::ReferenceUnresolved {
                        schema: schema.name().to_string(),
                        referenced: reference.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Decide what to write for one schema. Returns whether rows were
    /// queued (false means the schema was already durable unchanged).
    fn plan_schema(
        &self,
        schema: &SchemaDef,
        options: ImportOptions,
        batch: &mut ImportBatch,
    ) -> Result<bool, Error> {
        let new_rows: Vec<ClassRow> = schema
            .classes
            .iter()
            .map(|c| ClassRow::from_def(schema.name(), c))
            .collect();

        match self.store.schema_row(schema.name())? {
            None => {}
            Some(existing) => {
                if existing.key() == schema.key {
                    // Duplicate import of the identical version is a
                    // no-op; with updates enabled an additive change at
                    // the same version still lands.
                    if !options.allow_update
                        || self.durable_rows_match(&existing, schema, &new_rows)?
                    {
                        return Ok(false);
                    }
                    self.check_update_compat(schema, &new_rows)?;
                    batch.schemas.push(SchemaRow::from_def(schema));
                    batch.classes.extend(new_rows);
                    return Ok(true);
                }
                if !options.allow_update {
                    return Err(Error::UpdateConflict(format!(
                        "schema '{}' is already stored as {} and updates are not enabled",
                        schema.name(),
                        existing.key()
                    )));
                }
                if schema.key.version_major != existing.version_major
                    || schema.key.version_minor < existing.version_minor
                {
                    return Err(Error::UpdateConflict(format!(
                        "schema '{}' cannot move from {} to {}",
                        schema.name(),
                        existing.key(),
                        schema.key
                    )));
                }
                self.check_update_compat(schema, &new_rows)?;
            }
        }

        batch.schemas.push(SchemaRow::from_def(schema));
        batch.classes.extend(new_rows);
        Ok(true)
    }

    /// Whether the durable rows already equal what this import would
    /// write for the schema.
    fn durable_rows_match(
        &self,
        existing: &SchemaRow,
        schema: &SchemaDef,
        new_rows: &[ClassRow],
    ) -> Result<bool, Error> {
        if *existing != SchemaRow::from_def(schema) {
            return Ok(false);
        }
        let durable = self.store.class_rows_for_schema(schema.name())?;
        let mut incoming = new_rows.to_vec();
        incoming.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(durable == incoming)
    }

    /// An update may only add classes and properties; anything durable
    /// must survive with its type intact.
    fn check_update_compat(&self, schema: &SchemaDef, new_rows: &[ClassRow]) -> Result<(), Error> {
        let by_name: HashMap<&str, &ClassRow> =
            new_rows.iter().map(|r| (r.name.as_str(), r)).collect();

        for durable in self.store.class_rows_for_schema(schema.name())? {
            let Some(incoming) = by_name.get(durable.name.as_str()) else {
                return Err(Error::UpdateConflict(format!(
                    "update of schema '{}' removes class '{}'",
                    schema.name(),
                    durable.name
                )));
            };
            for prop in &durable.properties {
                match incoming.properties.iter().find(|p| p.name == prop.name) {
                    None => {
                        return Err(Error::UpdateConflict(format!(
                            "update of schema '{}' removes property '{}.{}'",
                            schema.name(),
                            durable.name,
                            prop.name
                        )))
                    }
                    Some(new_prop) if new_prop.property_type != prop.property_type => {
                        return Err(Error::UpdateConflict(format!(
                            "update of schema '{}' retypes property '{}.{}'",
                            schema.name(),
                            durable.name,
                            prop.name
                        )))
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}
