//! Store configuration

use crate::error::StoreError;
use blueprint_extract::ExtractionConfig;
use serde::{Deserialize, Serialize};

/// Schema store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Read-modify-write attempts before a revision conflict is surfaced
    pub max_write_attempts: u32,
    /// Settings for source extraction and JSON normalization
    pub extraction: ExtractionConfig,
}

impl StoreConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from TOML; absent keys keep their defaults
    ///
    /// ```rust
    /// use blueprint_store::StoreConfig;
    ///
    /// let config = StoreConfig::from_toml_str(
    ///     "max_write_attempts = 5\n[extraction]\nmax_nesting_depth = 4\n",
    /// ).unwrap();
    /// assert_eq!(config.max_write_attempts, 5);
    /// assert_eq!(config.extraction.max_nesting_depth, 4);
    /// assert_eq!(config.extraction.min_source_len, 20);
    /// ```
    ///
    /// # Errors
    /// Returns [`StoreError::Config`] when the TOML is invalid
    pub fn from_toml_str(text: &str) -> Result<Self, StoreError> {
        toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// With write attempts (at least one)
    #[inline]
    #[must_use]
    pub fn with_max_write_attempts(mut self, attempts: u32) -> Self {
        self.max_write_attempts = attempts.max(1);
        self
    }

    /// With extraction settings
    #[inline]
    #[must_use]
    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_write_attempts: 3,
            extraction: ExtractionConfig::default(),
        }
    }
}
