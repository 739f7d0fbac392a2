//! Dialect parsers
//!
//! Each declaration syntax family is read by one [`DialectParser`]. Parsers
//! live in a [`DialectRegistry`] ordered by priority, which the engine uses
//! both to resolve hints and to detect the dialect of unlabelled source.

use crate::config::ExtractionConfig;
use crate::degradation::Extraction;
use crate::error::ExtractResult;
use blueprint_model::{Cardinality, Dialect, Field, Relationship};

mod mongoose;
mod prisma;

pub use mongoose::MongooseParser;
pub use prisma::PrismaParser;

/// Parser for one declaration dialect
///
/// Implement this trait to add an extraction path for a new dialect.
pub trait DialectParser: Send + Sync + 'static {
    /// Dialect this parser reads
    fn dialect(&self) -> Dialect;

    /// Whether the source carries this dialect's markers
    fn detect(&self, source: &str) -> bool;

    /// Parse source into a canonical entity
    ///
    /// # Errors
    /// Returns [`ExtractError::NoDeclaration`](crate::ExtractError::NoDeclaration)
    /// when no declaration block is found
    fn parse(&self, source: &str, config: &ExtractionConfig) -> ExtractResult<Extraction>;

    /// Detection priority (higher = tried first)
    fn priority(&self) -> i32 {
        0
    }
}

/// Registered dialect parsers
pub struct DialectRegistry {
    parsers: Vec<Box<dyn DialectParser>>,
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialectRegistry")
            .field("dialects", &self.dialects())
            .finish()
    }
}

impl DialectRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Register a parser, replacing any parser for the same dialect
    pub fn register<P: DialectParser>(&mut self, parser: P) {
        self.parsers.retain(|p| p.dialect() != parser.dialect());
        self.parsers.push(Box::new(parser));
        self.parsers
            .sort_by_key(|p| std::cmp::Reverse(p.priority()));
    }

    /// Parser for a dialect
    #[must_use]
    pub fn find(&self, dialect: Dialect) -> Option<&dyn DialectParser> {
        self.parsers
            .iter()
            .find(|p| p.dialect() == dialect)
            .map(|p| &**p)
    }

    /// Highest-priority parser whose markers appear in the source
    #[must_use]
    pub fn detect(&self, source: &str) -> Option<&dyn DialectParser> {
        self.parsers.iter().find(|p| p.detect(source)).map(|p| &**p)
    }

    /// Registered dialects in priority order
    #[must_use]
    pub fn dialects(&self) -> Vec<Dialect> {
        self.parsers.iter().map(|p| p.dialect()).collect()
    }
}

/// Registry with the built-in parsers
#[inline]
#[must_use]
pub fn default_dialects() -> DialectRegistry {
    let mut registry = DialectRegistry::new();
    registry.register(MongooseParser);
    registry.register(PrismaParser);
    registry
}

/// One inferred relationship per reference path in `fields`
pub(crate) fn infer_relationships(fields: &[Field]) -> Vec<Relationship> {
    fields
        .iter()
        .flat_map(Field::reference_paths)
        .filter_map(|(path, field)| {
            let target = field.reference_target()?;
            let kind = if field.is_list() {
                Cardinality::OneToMany
            } else {
                Cardinality::OneToOne
            };
            Some(Relationship::inferred(target, kind, path))
        })
        .collect()
}

/// Capitalize the first character
pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    chars
        .next()
        .map(|c| c.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}
