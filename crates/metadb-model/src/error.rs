//! Object-model error types.

use crate::key::SchemaKey;
use thiserror::Error;

/// Errors raised while building or staging schema object models.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Case-insensitive class or property name collision.
    #[error("duplicate name '{name}' in {scope} (names may not differ only by case)")]
    DuplicateName {
        /// The schema or class the collision occurred in.
        scope: String,
        /// The colliding name as given by the caller.
        name: String,
    },

    /// A schema with the same key is already staged in the cache.
    #[error("schema {0} is already in the cache")]
    DuplicateSchema(SchemaKey),
}
