//! Schema extraction engine
//!
//! Entry point for declaration source: validates the input, resolves the
//! dialect (from a hint or by detection) and hands off to the registered
//! [`DialectParser`](crate::dialect::DialectParser).

use crate::config::ExtractionConfig;
use crate::degradation::Extraction;
use crate::dialect::{default_dialects, DialectParser, DialectRegistry};
use crate::error::{ExtractError, ExtractResult};
use blueprint_model::Dialect;
use tracing::{debug, info, warn};

/// Extraction engine over a dialect registry
#[derive(Debug)]
pub struct SchemaExtractionEngine {
    config: ExtractionConfig,
    registry: DialectRegistry,
}

impl Default for SchemaExtractionEngine {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl SchemaExtractionEngine {
    /// Engine with the built-in dialects
    #[must_use]
    pub fn new(config: ExtractionConfig) -> Self {
        Self::with_registry(config, default_dialects())
    }

    /// Engine with a custom registry
    #[must_use]
    pub fn with_registry(config: ExtractionConfig, registry: DialectRegistry) -> Self {
        Self { config, registry }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Dialect the source would be parsed as without a hint
    #[must_use]
    pub fn detect_dialect(&self, source: &str) -> Dialect {
        self.registry
            .detect(source)
            .map_or(self.config.default_dialect, |p| p.dialect())
    }

    /// Parse declaration source into a canonical entity
    ///
    /// # Errors
    /// - [`ExtractError::InputTooSparse`] when the trimmed source is shorter
    ///   than the configured minimum
    /// - [`ExtractError::NoDeclaration`] when no declaration block is found
    /// - [`ExtractError::UnsupportedDialect`] when the hint names an unknown
    ///   dialect or one without a registered parser
    pub fn parse(&self, source: &str, dialect_hint: Option<&str>) -> ExtractResult<Extraction> {
        let length = source.trim().chars().count();
        if length < self.config.min_source_len {
            return Err(ExtractError::InputTooSparse {
                length,
                minimum: self.config.min_source_len,
            });
        }

        let parser = self.resolve(source, dialect_hint)?;
        debug!(dialect = %parser.dialect(), "parsing declaration source");

        let mut extraction = parser.parse(source, &self.config)?;
        extraction.entity.enforce_invariants();

        if extraction.is_degraded() {
            warn!(
                entity = %extraction.entity.name,
                degradations = extraction.degradations.len(),
                "extraction degraded"
            );
        }
        info!(
            entity = %extraction.entity.name,
            dialect = %extraction.dialect,
            fields = extraction.entity.fields.len(),
            indexes = extraction.entity.indexes.len(),
            relationships = extraction.entity.relationships.len(),
            "extracted entity"
        );
        Ok(extraction)
    }

    fn resolve(&self, source: &str, dialect_hint: Option<&str>) -> ExtractResult<&dyn DialectParser> {
        let dialect = match dialect_hint.map(str::trim).filter(|h| !h.is_empty()) {
            Some(hint) => {
                Dialect::from_hint(hint).ok_or_else(|| ExtractError::UnsupportedDialect(hint.to_string()))?
            }
            None => self.detect_dialect(source),
        };
        self.registry
            .find(dialect)
            .ok_or_else(|| ExtractError::UnsupportedDialect(dialect.name().to_string()))
    }
}
