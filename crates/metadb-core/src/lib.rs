//! Durable schema metadata engine.
//!
//! Persists schema object models into sled-backed row trees, validates
//! them before import, resolves supplemental attribute overlays, and
//! loads classes back incrementally on demand.

pub mod error;
pub mod import;
pub mod manager;
pub mod store;
pub mod supplement;
pub mod validate;

pub use error::Error;
pub use import::{ImportOptions, ImportSummary, SchemaImporter};
pub use manager::{ClassHandle, ResolveSchema, SchemaHandle, SchemaManager};
pub use store::{SchemaStore, StoreConfig};
pub use validate::{validate_schemas, ValidationIssue};
