//! Blueprint Model
//!
//! The canonical entity-relationship model every producer converges on.
//!
//! # Overview
//!
//! - **Entity**: one record type with ordered fields, indexes and relationships
//! - **Field**: canonical type plus flags, constraints, nesting and references
//! - **CanonicalType**: the fixed type tag set and its token normalizer
//! - **Endpoint / Architecture**: sibling shapes from completion JSON
//!
//! # Example
//!
//! ```rust
//! use blueprint_model::{CanonicalType, Entity, Field, Origin};
//!
//! let mut task = Entity::new("Task", Origin::Manual);
//! task.fields.push(Field::text("title").required());
//! task.fields.push(Field::new("assignee", CanonicalType::Text).with_reference("User"));
//!
//! assert_eq!(task.fields[1].field_type, CanonicalType::Reference);
//! assert_eq!(CanonicalType::normalize("[String]"), CanonicalType::List);
//! ```

#![warn(missing_docs)]

pub mod architecture;
pub mod endpoint;
pub mod entity;
pub mod field;
pub mod ids;
pub mod index;
pub mod relationship;
pub mod types;

// Re-exports
pub use architecture::{Architecture, TechStack};
pub use endpoint::{Endpoint, Parameter, RateLimit, RequestBody, ResponseSpec};
pub use entity::{
    names_match, Dialect, Entity, Origin, Provenance, SoftDeletePolicy, TimestampPolicy,
    DEFAULT_CREATED_AT, DEFAULT_UPDATED_AT,
};
pub use field::{Field, FieldConstraints, ListItems};
pub use ids::{EntityId, ProductId};
pub use index::{Index, IndexDirection, IndexField};
pub use relationship::{Cardinality, Relationship};
pub use types::CanonicalType;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the canonical model
    pub use crate::{
        Cardinality, CanonicalType, Dialect, Endpoint, Entity, Field, Index, Origin, ProductId,
        Relationship,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
