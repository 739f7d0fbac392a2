//! Extraction configuration
//!
//! Constructed explicitly and passed to the engine and normalizer; there is
//! no process-wide configuration.

use crate::error::ExtractError;
use blueprint_model::Dialect;
use serde::{Deserialize, Serialize};

/// Extraction and normalization settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Trimmed source shorter than this is rejected as too sparse
    pub min_source_len: usize,
    /// Dialect used when detection finds no markers
    pub default_dialect: Dialect,
    /// Deepest nested structure expanded into sub-fields
    pub max_nesting_depth: usize,
    /// Name given to entities whose name cannot be found
    pub placeholder_entity_name: String,
    /// Field names that mark soft deletion
    pub soft_delete_markers: Vec<String>,
    /// Substrings of field names that mark sensitive data
    pub sensitive_markers: Vec<String>,
}

impl ExtractionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from TOML; absent keys keep their defaults
    ///
    /// # Errors
    /// Returns [`ExtractError::Config`] when the TOML is invalid
    pub fn from_toml_str(text: &str) -> Result<Self, ExtractError> {
        toml::from_str(text).map_err(|e| ExtractError::Config(e.to_string()))
    }

    /// With minimum source length
    #[inline]
    #[must_use]
    pub fn with_min_source_len(mut self, len: usize) -> Self {
        self.min_source_len = len;
        self
    }

    /// With default dialect
    #[inline]
    #[must_use]
    pub fn with_default_dialect(mut self, dialect: Dialect) -> Self {
        self.default_dialect = dialect;
        self
    }

    /// With maximum nesting depth
    #[inline]
    #[must_use]
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Whether `name` marks soft deletion
    #[must_use]
    pub fn is_soft_delete_marker(&self, name: &str) -> bool {
        self.soft_delete_markers
            .iter()
            .any(|m| m.eq_ignore_ascii_case(name))
    }

    /// Whether `name` looks like it holds sensitive data
    #[must_use]
    pub fn is_sensitive_name(&self, name: &str) -> bool {
        let lowered = name.to_ascii_lowercase();
        self.sensitive_markers
            .iter()
            .any(|m| lowered.contains(&m.to_ascii_lowercase()))
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_source_len: 20,
            default_dialect: Dialect::Mongoose,
            max_nesting_depth: 8,
            placeholder_entity_name: "UnnamedEntity".to_string(),
            soft_delete_markers: ["deletedAt", "deleted_at", "isDeleted", "is_deleted", "deleted"]
                .into_iter()
                .map(String::from)
                .collect(),
            sensitive_markers: ["password", "secret", "token", "apikey", "api_key"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}
