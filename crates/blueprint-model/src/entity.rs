//! Canonical entity
//!
//! The one normalized record-type representation, independent of the dialect
//! or payload it was produced from.

use crate::field::Field;
use crate::ids::EntityId;
use crate::index::Index;
use crate::relationship::Relationship;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default name of the creation timestamp field
pub const DEFAULT_CREATED_AT: &str = "createdAt";

/// Default name of the update timestamp field
pub const DEFAULT_UPDATED_AT: &str = "updatedAt";

/// Compare two names under Unicode lowercase folding
#[must_use]
pub fn names_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Family of declaration syntax
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Document-model schema declarations (primary dialect)
    #[default]
    Mongoose,
    /// Relational model blocks, reduced-fidelity path
    Prisma,
    /// SQL DDL
    Sql,
    /// Decorator-based entity classes
    TypeOrm,
    /// `sequelize.define` models
    Sequelize,
}

impl Dialect {
    /// Look up a dialect by hint string, case-insensitively
    #[must_use]
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_ascii_lowercase().as_str() {
            "mongoose" | "mongodb" | "mongo" => Some(Self::Mongoose),
            "prisma" => Some(Self::Prisma),
            "sql" | "ddl" => Some(Self::Sql),
            "typeorm" => Some(Self::TypeOrm),
            "sequelize" => Some(Self::Sequelize),
            _ => None,
        }
    }

    /// Lower-case name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mongoose => "mongoose",
            Self::Prisma => "prisma",
            Self::Sql => "sql",
            Self::TypeOrm => "typeorm",
            Self::Sequelize => "sequelize",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an entity entered the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Extracted from declaration source
    Source,
    /// Normalized from completion-service JSON
    Generated,
    /// Created or edited directly
    #[default]
    Manual,
}

/// Where an entity came from and when it was touched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Producing path
    pub origin: Origin,
    /// Dialect of the original source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,
    /// Original source text, retained for re-sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_source: Option<String>,
    /// First import
    pub imported_at: DateTime<Utc>,
    /// Last content change
    pub updated_at: DateTime<Utc>,
    /// Last re-import or re-sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Provenance {
    /// Fresh provenance stamped now
    #[must_use]
    pub fn new(origin: Origin) -> Self {
        let now = Utc::now();
        Self {
            origin,
            dialect: None,
            original_source: None,
            imported_at: now,
            updated_at: now,
            last_synced_at: None,
        }
    }
}

impl Default for Provenance {
    fn default() -> Self {
        Self::new(Origin::Manual)
    }
}

/// Automatic creation/update timestamp fields
///
/// `None` on a side means that side is not maintained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampPolicy {
    /// Creation timestamp field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Update timestamp field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl TimestampPolicy {
    /// Both sides with the default names
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            created_at: Some(DEFAULT_CREATED_AT.to_string()),
            updated_at: Some(DEFAULT_UPDATED_AT.to_string()),
        }
    }

    /// Explicit field names
    #[must_use]
    pub fn with_names(created_at: Option<String>, updated_at: Option<String>) -> Self {
        Self {
            created_at,
            updated_at,
        }
    }

    /// Whether any timestamp is maintained
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.created_at.is_some() || self.updated_at.is_some()
    }

    /// Both sides enabled under their default names
    #[must_use]
    pub fn uses_default_names(&self) -> bool {
        self.created_at.as_deref() == Some(DEFAULT_CREATED_AT)
            && self.updated_at.as_deref() == Some(DEFAULT_UPDATED_AT)
    }
}

/// Soft-delete marker policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDeletePolicy {
    /// Records are flagged rather than removed
    pub enabled: bool,
    /// Marker field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl SoftDeletePolicy {
    /// Soft delete through `field`
    #[must_use]
    pub fn on(field: impl Into<String>) -> Self {
        Self {
            enabled: true,
            field: Some(field.into()),
        }
    }
}

/// Canonical record-type description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier
    pub id: EntityId,

    /// Name, case-insensitively unique per product
    pub name: String,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Explicit collection/table name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// Ordered fields
    #[serde(default)]
    pub fields: Vec<Field>,

    /// Secondary indexes
    #[serde(default)]
    pub indexes: Vec<Index>,

    /// Stored relationships
    #[serde(default)]
    pub relationships: Vec<Relationship>,

    /// Timestamp policy
    #[serde(default)]
    pub timestamps: TimestampPolicy,

    /// Soft-delete policy
    #[serde(default)]
    pub soft_delete: SoftDeletePolicy,

    /// Module tag grouping related entities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Origin and timestamps
    #[serde(default)]
    pub provenance: Provenance,
}

impl Entity {
    /// Empty entity with fresh id and provenance
    #[must_use]
    pub fn new(name: impl Into<String>, origin: Origin) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            description: None,
            collection: None,
            fields: Vec::new(),
            indexes: Vec::new(),
            relationships: Vec::new(),
            timestamps: TimestampPolicy::default(),
            soft_delete: SoftDeletePolicy::default(),
            module: None,
            provenance: Provenance::new(origin),
        }
    }

    /// Case-insensitive name comparison, folding non-ASCII letters too
    #[inline]
    #[must_use]
    pub fn name_matches(&self, name: &str) -> bool {
        names_match(&self.name, name.trim())
    }

    /// Top-level field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Apply the reference-implies-type invariant to every field
    pub fn enforce_invariants(&mut self) {
        for field in &mut self.fields {
            field.enforce_reference_type();
        }
    }

    /// Compare everything except identity and provenance timestamps
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.collection == other.collection
            && self.fields == other.fields
            && self.indexes == other.indexes
            && self.relationships == other.relationships
            && self.timestamps == other.timestamps
            && self.soft_delete == other.soft_delete
            && self.module == other.module
            && self.provenance.origin == other.provenance.origin
            && self.provenance.dialect == other.provenance.dialect
            && self.provenance.original_source == other.provenance.original_source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CanonicalType;
    use pretty_assertions::assert_eq;

    #[test]
    fn dialect_hints() {
        assert_eq!(Dialect::from_hint("Mongoose"), Some(Dialect::Mongoose));
        assert_eq!(Dialect::from_hint(" prisma "), Some(Dialect::Prisma));
        assert_eq!(Dialect::from_hint("cobol"), None);
    }

    #[test]
    fn timestamp_defaults() {
        let policy = TimestampPolicy::enabled();
        assert!(policy.is_enabled());
        assert!(policy.uses_default_names());
        assert!(!TimestampPolicy::default().is_enabled());
    }

    #[test]
    fn invariants_reach_every_field() {
        let mut entity = Entity::new("Task", Origin::Manual);
        let mut owner = Field::text("owner");
        owner.reference = Some("User".to_string());
        entity.fields.push(owner);
        entity.enforce_invariants();
        assert_eq!(entity.fields[0].field_type, CanonicalType::Reference);
    }

    #[test]
    fn same_content_ignores_identity() {
        let a = Entity::new("Task", Origin::Source);
        let b = Entity::new("Task", Origin::Source);
        assert_ne!(a.id, b.id);
        assert!(a.same_content(&b));
        assert!(a.name_matches("task"));
    }

    #[test]
    fn names_fold_beyond_ascii() {
        let entity = Entity::new("Übung", Origin::Manual);
        assert!(entity.name_matches("ÜBUNG"));
        assert!(entity.name_matches(" übung "));
        assert!(!entity.name_matches("Ubung"));
        assert!(names_match("ΣΧΕΔΙΟ", "σχεδιο"));
        assert!(!names_match("Task", "Tasks"));
    }
}
