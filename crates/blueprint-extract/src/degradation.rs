//! Degraded-extraction reporting
//!
//! A degradation is a normal outcome: one field or section was reduced to a
//! minimal valid record. Degradations travel next to the successful result.

use blueprint_model::{Dialect, Entity};
use serde::{Deserialize, Serialize};

/// What kind of reduction happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationKind {
    /// Field value unreadable; reduced to a text field
    MalformedField,
    /// Fragment without an `identifier:` key was skipped
    SkippedFragment,
    /// Nested structure deeper than the configured limit
    DepthExceeded,
    /// Block or literal not terminated
    Unterminated,
    /// Entity name not found; placeholder used
    MissingName,
    /// JSON value had an unexpected shape
    ShapeMismatch,
    /// Number outside the representable range; default used
    OutOfRange,
}

/// One reduced field or section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    /// Dotted location (field path or JSON section)
    pub location: String,
    /// Kind of reduction
    pub kind: DegradationKind,
    /// Human-readable detail
    pub detail: String,
}

impl Degradation {
    /// Create a degradation record
    #[must_use]
    pub fn new(location: impl Into<String>, kind: DegradationKind, detail: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            kind,
            detail: detail.into(),
        }
    }
}

/// Result of parsing declaration source
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Canonical entity
    pub entity: Entity,
    /// Dialect the source was read as
    pub dialect: Dialect,
    /// Reductions applied along the way
    pub degradations: Vec<Degradation>,
}

impl Extraction {
    /// Whether anything was reduced
    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Normalizer output with its degradations
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    /// Normalized record
    pub value: T,
    /// Reductions applied along the way
    pub degradations: Vec<Degradation>,
}

impl<T> Normalized<T> {
    /// Whether anything was reduced
    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// Drop the report
    #[inline]
    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }
}
