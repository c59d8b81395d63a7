//! Schema object model for metadb.
//!
//! In-memory representation of versioned object schemas: classes,
//! properties, relationships, and custom-attribute instances, plus the
//! staging cache used to collect schemas before import. This crate does
//! no storage I/O.

mod attribute;
mod cache;
mod class;
mod error;
mod key;
mod property;
mod relationship;
mod schema;

pub use attribute::AttributeInstance;
pub use cache::SchemaCache;
pub use class::{ClassDef, ClassKind};
pub use error::ModelError;
pub use key::{ClassKey, ClassRef, SchemaKey};
pub use property::{PrimitiveType, PropertyDef, PropertyType};
pub use relationship::{CardinalityRange, RelationshipConstraint, RelationshipDef};
pub use schema::{SchemaDef, SupplementalInfo};
