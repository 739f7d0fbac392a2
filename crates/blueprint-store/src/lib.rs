//! Blueprint Store
//!
//! Per-product persistence of the canonical schema:
//! - One [`SchemaDocument`] per product behind the [`SchemaDocumentStore`] seam
//! - Case-insensitive upsert of entities from source, JSON or direct edits
//! - Bulk and architecture imports with per-item reports
//! - Relationship graphs with implicit reference edges
//!
//! # Example
//!
//! ```rust
//! use blueprint_model::ProductId;
//! use blueprint_store::CanonicalSchemaStore;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), blueprint_store::StoreError> {
//! let store = CanonicalSchemaStore::default();
//! let product = ProductId::new("acme");
//!
//! store
//!     .import_json_entity(&product, &json!({"name": "Task", "fields": ["title:String", "owner:ObjectId"]}), false)
//!     .await?;
//! let graph = store.get_relationship_map(&product).await?;
//! assert_eq!(graph.nodes.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod document;
pub mod error;
pub mod graph;
pub mod report;
pub mod store;

// Re-exports
pub use config::StoreConfig;
pub use document::{InMemoryDocumentStore, SchemaDocument, SchemaDocumentStore};
pub use error::{StoreError, StoreResult};
pub use graph::{build_graph, GraphEdge, GraphNode, RelationshipGraph};
pub use report::{ArchitectureImportReport, BulkImportReport, BulkItem, BulkItemResult, ImportOutcome};
pub use store::CanonicalSchemaStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
