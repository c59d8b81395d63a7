//! Engine error types.

use metadb_model::ModelError;
use thiserror::Error;

use crate::validate::ValidationIssue;

/// Schema engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Object-model error.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// One or more schemas failed structural validation.
    #[error("schema validation failed with {} issue(s)", issues.len())]
    SchemaValidationFailed {
        /// Every violation found; validation never stops at the first.
        issues: Vec<ValidationIssue>,
    },

    /// A referenced schema is neither staged nor durable.
    #[error("schema '{schema}' references '{referenced}', which is neither staged nor stored")]
    ReferenceUnresolved {
        /// The schema holding the reference.
        schema: String,
        /// The missing referenced schema.
        referenced: String,
    },

    /// An import would change durable schemas in a disallowed way.
    #[error("update conflict: {0}")]
    UpdateConflict(String),

    /// The cache was already imported into a different store.
    #[error("schema cache is bound to a different store")]
    StoreMismatch,

    /// A schema or class lookup missed.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transaction error.
    #[error("transaction error: {0}")]
    Transaction(String),
}
