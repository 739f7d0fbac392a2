//! Relationships between entities

use crate::entity::names_match;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cardinality of a relationship, seen from the owning entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// Owner holds at most one target
    #[default]
    #[serde(rename = "one-to-one")]
    OneToOne,
    /// Owner holds many targets
    #[serde(rename = "one-to-many")]
    OneToMany,
    /// Both sides hold many
    #[serde(rename = "many-to-many")]
    ManyToMany,
}

impl Cardinality {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToMany => "many-to-many",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship owned by an entity (the source is implicit)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Target entity name
    pub target: String,

    /// Cardinality
    #[serde(rename = "type")]
    pub kind: Cardinality,

    /// Owning field on the source entity
    pub field: String,

    /// Field on the target pointing back, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_field: Option<String>,

    /// Deleting the owner deletes the targets
    #[serde(default)]
    pub cascade_delete: bool,

    /// Derived from a reference field at extraction time
    #[serde(default)]
    pub inferred: bool,
}

impl Relationship {
    /// Declared relationship
    #[must_use]
    pub fn new(target: impl Into<String>, kind: Cardinality, field: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind,
            field: field.into(),
            inverse_field: None,
            cascade_delete: false,
            inferred: false,
        }
    }

    /// Relationship inferred from a reference field
    #[must_use]
    pub fn inferred(target: impl Into<String>, kind: Cardinality, field: impl Into<String>) -> Self {
        Self {
            inferred: true,
            ..Self::new(target, kind, field)
        }
    }

    /// Whether this relationship covers `field` pointing at `target`
    #[must_use]
    pub fn covers(&self, field: &str, target: &str) -> bool {
        self.field == field && names_match(&self.target, target)
    }
}
