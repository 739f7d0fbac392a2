//! Error types for the schema store
//!
//! Covers:
//! - Source that could not be parsed at all
//! - Lookups of entities or documents that do not exist
//! - Name collisions on import and rename
//! - Writes that kept losing to concurrent writers

use blueprint_extract::ExtractError;
use blueprint_model::ProductId;

/// Main store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Source too short or without a recognizable declaration
    #[error("input too sparse: {0}")]
    InputTooSparse(String),

    /// Dialect without an extraction path
    #[error("unsupported dialect: '{0}'")]
    UnsupportedDialect(String),

    /// Entity not present in the product's schema
    #[error("entity '{entity}' not found in product {product}")]
    NotFound {
        /// Product searched
        product: ProductId,
        /// Entity name requested
        entity: String,
    },

    /// Product has no schema document
    #[error("no schema document for product {0}")]
    SchemaNotFound(ProductId),

    /// Entity name already taken
    #[error("entity '{entity}' already exists")]
    AlreadyExists {
        /// Conflicting name
        entity: String,
    },

    /// Entity has no retained source to re-sync from
    #[error("entity '{entity}' has no original source")]
    NoSource {
        /// Entity name
        entity: String,
    },

    /// Document changed underneath every write attempt
    #[error("revision conflict on product {product} after {attempts} attempt(s)")]
    RevisionConflict {
        /// Product written
        product: ProductId,
        /// Attempts made
        attempts: u32,
    },

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Document store failure
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Check if a requested record is absent
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::SchemaNotFound(_))
    }

    /// Check if a write lost a race
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::RevisionConflict { .. })
    }

    /// Check if the caller's input was rejected
    #[inline]
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InputTooSparse(_) | Self::UnsupportedDialect(_) | Self::AlreadyExists { .. }
        )
    }
}

impl From<ExtractError> for StoreError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedDialect(dialect) => Self::UnsupportedDialect(dialect),
            ExtractError::Config(detail) => Self::Config(detail),
            other => Self::InputTooSparse(other.to_string()),
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
