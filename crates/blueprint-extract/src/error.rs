//! Error types for extraction
//!
//! Only conditions that stop a parse before it starts are errors. Malformed
//! fragments inside a recognised declaration never raise; they are reported
//! as [`Degradation`](crate::Degradation) records next to the result.

use blueprint_model::Dialect;

/// Errors raised by the extraction engine
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Source text too short to hold a declaration
    #[error("input too sparse: {length} characters, need at least {minimum}")]
    InputTooSparse {
        /// Trimmed input length
        length: usize,
        /// Configured minimum
        minimum: usize,
    },

    /// No declaration block the dialect recognises
    #[error("no recognizable {dialect} declaration found")]
    NoDeclaration {
        /// Dialect that was tried
        dialect: Dialect,
    },

    /// Hint names a dialect without an extraction path
    #[error("unsupported dialect: '{0}'")]
    UnsupportedDialect(String),

    /// Configuration could not be loaded
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ExtractError {
    /// Whether the input was too short or unrecognisable
    #[inline]
    #[must_use]
    pub fn is_input_too_sparse(&self) -> bool {
        matches!(self, Self::InputTooSparse { .. } | Self::NoDeclaration { .. })
    }
}

/// Result type alias for extraction
pub type ExtractResult<T> = Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ExtractError::UnsupportedDialect("sql".to_string());
        assert_eq!(err.to_string(), "unsupported dialect: 'sql'");

        let err = ExtractError::InputTooSparse {
            length: 3,
            minimum: 20,
        };
        assert!(err.to_string().contains("need at least 20"));
    }

    #[test]
    fn sparse_classification() {
        assert!(ExtractError::NoDeclaration {
            dialect: Dialect::Mongoose
        }
        .is_input_too_sparse());
        assert!(!ExtractError::Config("x".to_string()).is_input_too_sparse());
    }
}
