//! Schema documents and the document-store seam
//!
//! A product owns exactly one [`SchemaDocument`]. The backing store only has
//! to offer single-document atomic compare-and-swap: every write names the
//! revision it read, and a stale write is rejected instead of applied.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use blueprint_model::{Endpoint, Entity, ProductId, TechStack};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Canonical schema of one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// Owning product
    pub product_id: ProductId,
    /// Entities in insertion order, names unique ignoring case
    #[serde(default)]
    pub entities: Vec<Entity>,
    /// Latest endpoint list
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// Latest technology stack
    #[serde(default)]
    pub tech_stack: TechStack,
    /// Incremented on every successful write; 0 before the first
    pub revision: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last write time
    pub updated_at: DateTime<Utc>,
}

impl SchemaDocument {
    /// Empty, unsaved document
    #[must_use]
    pub fn new(product_id: ProductId) -> Self {
        let now = Utc::now();
        Self {
            product_id,
            entities: Vec::new(),
            endpoints: Vec::new(),
            tech_stack: TechStack::default(),
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Entity by name, ignoring case
    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name_matches(name))
    }

    /// Position of an entity by name, ignoring case
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entities.iter().position(|e| e.name_matches(name))
    }

    /// Whether the document has never been saved
    #[inline]
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.revision == 0
    }
}

/// Single-document atomic key-value collection of schema documents
#[async_trait]
pub trait SchemaDocumentStore: Send + Sync {
    /// Current document for a product
    async fn load(&self, product: &ProductId) -> StoreResult<Option<SchemaDocument>>;

    /// Write a document if the stored revision still matches
    ///
    /// `expected_revision` is `None` when the document must not exist yet.
    ///
    /// # Errors
    /// [`StoreError::RevisionConflict`] when the stored revision differs
    async fn save(&self, document: SchemaDocument, expected_revision: Option<u64>) -> StoreResult<()>;

    /// Delete a product's document, returning it if present
    async fn remove(&self, product: &ProductId) -> StoreResult<Option<SchemaDocument>>;
}

/// Process-local document store
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: DashMap<ProductId, SchemaDocument>,
}

impl InMemoryDocumentStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// No stored documents
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl SchemaDocumentStore for InMemoryDocumentStore {
    async fn load(&self, product: &ProductId) -> StoreResult<Option<SchemaDocument>> {
        Ok(self.documents.get(product).map(|doc| doc.value().clone()))
    }

    async fn save(&self, document: SchemaDocument, expected_revision: Option<u64>) -> StoreResult<()> {
        let conflict = |product: &ProductId| StoreError::RevisionConflict {
            product: product.clone(),
            attempts: 1,
        };
        match self.documents.entry(document.product_id.clone()) {
            Entry::Occupied(mut slot) => {
                if expected_revision != Some(slot.get().revision) {
                    return Err(conflict(&document.product_id));
                }
                slot.insert(document);
            }
            Entry::Vacant(slot) => {
                if expected_revision.is_some() {
                    return Err(conflict(&document.product_id));
                }
                slot.insert(document);
            }
        }
        Ok(())
    }

    async fn remove(&self, product: &ProductId) -> StoreResult<Option<SchemaDocument>> {
        Ok(self.documents.remove(product).map(|(_, doc)| doc))
    }
}
