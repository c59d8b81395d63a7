//! Durable schema storage on sled.

mod config;
mod rows;
mod schema_store;

pub use config::StoreConfig;
pub use rows::{
    AttrRow, ClassKindRow, ClassRefRow, ClassRow, PrimitiveTypeRow, PropertyRow, PropertyTypeRow,
    RelationshipConstraintRow, RelationshipRow, SchemaRefRow, SchemaRow, SupplementalRow,
};
pub use schema_store::{ImportBatch, SchemaStore};
