//! Error types for Plextree core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Plextree core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A key collided with an existing element in a unique index.
    #[error("duplicate key in unique index '{index}'")]
    DuplicateKey {
        /// Name of the unique index that rejected the key.
        index: String,
    },

    /// An index with the same name was already declared on the builder.
    #[error("index '{name}' is already defined")]
    DuplicateIndex {
        /// Name of the conflicting index.
        name: String,
    },

    /// A set was built with no orderings declared.
    #[error("a multi-index set requires at least one index")]
    NoIndexes,

    /// A tree-shape invariant does not hold.
    ///
    /// Only produced by the invariant checker; unreachable through the
    /// public mutation contract.
    #[error("invariant violation in index '{index}': {message}")]
    InvariantViolation {
        /// Name of the index whose tree is malformed.
        index: String,
        /// Description of the violated invariant.
        message: String,
    },
}

impl CoreError {
    /// Creates a duplicate key error.
    pub fn duplicate_key(index: impl Into<String>) -> Self {
        Self::DuplicateKey {
            index: index.into(),
        }
    }

    /// Creates a duplicate index error.
    pub fn duplicate_index(name: impl Into<String>) -> Self {
        Self::DuplicateIndex { name: name.into() }
    }

    /// Creates an invariant violation error.
    pub fn invariant_violation(index: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            index: index.into(),
            message: message.into(),
        }
    }
}
