//! Canonical schema store
//!
//! Per-product collection of canonical entities, kept in one
//! [`SchemaDocument`] per product. Every mutation is a read-modify-write of
//! that document; a write that loses a race is retried from a fresh read up
//! to [`StoreConfig::max_write_attempts`] times.

use crate::config::StoreConfig;
use crate::document::{InMemoryDocumentStore, SchemaDocument, SchemaDocumentStore};
use crate::error::{StoreError, StoreResult};
use crate::graph::{build_graph, RelationshipGraph};
use crate::report::{ArchitectureImportReport, BulkImportReport, BulkItem, ImportOutcome};
use blueprint_extract::{CodeGenerator, Degradation, JsonNormalizer, SchemaExtractionEngine};
use blueprint_model::{Endpoint, Entity, ProductId, TechStack};
use chrono::Utc;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-product canonical entity store
pub struct CanonicalSchemaStore {
    backend: Arc<dyn SchemaDocumentStore>,
    config: StoreConfig,
    engine: SchemaExtractionEngine,
    normalizer: JsonNormalizer,
    generator: CodeGenerator,
}

impl fmt::Debug for CanonicalSchemaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanonicalSchemaStore")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl Default for CanonicalSchemaStore {
    fn default() -> Self {
        Self::in_memory(StoreConfig::default())
    }
}

impl CanonicalSchemaStore {
    /// Store over a document backend
    #[must_use]
    pub fn new(backend: Arc<dyn SchemaDocumentStore>, config: StoreConfig) -> Self {
        Self {
            backend,
            engine: SchemaExtractionEngine::new(config.extraction.clone()),
            normalizer: JsonNormalizer::new(config.extraction.clone()),
            generator: CodeGenerator::new(),
            config,
        }
    }

    /// Store over a fresh in-memory backend
    #[must_use]
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::new(Arc::new(InMemoryDocumentStore::new()), config)
    }

    /// Replace the extraction engine (custom dialect registries)
    #[must_use]
    pub fn with_engine(mut self, engine: SchemaExtractionEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Schema document for a product, created on first access
    ///
    /// # Errors
    /// Backend failures
    pub async fn get_or_create(&self, product: &ProductId) -> StoreResult<SchemaDocument> {
        if let Some(document) = self.backend.load(product).await? {
            return Ok(document);
        }
        let mut document = SchemaDocument::new(product.clone());
        document.revision = 1;
        match self.backend.save(document.clone(), None).await {
            Ok(()) => {
                info!(product = %product, "created schema document");
                Ok(document)
            }
            // Created concurrently; take theirs
            Err(err) if err.is_conflict() => self
                .backend
                .load(product)
                .await?
                .ok_or_else(|| StoreError::SchemaNotFound(product.clone())),
            Err(err) => Err(err),
        }
    }

    /// Insert or merge an entity by name, ignoring case
    ///
    /// An existing entity of the same name is replaced field-for-field when
    /// `overwrite` is set, keeping its id and first-import time.
    ///
    /// # Errors
    /// - [`StoreError::AlreadyExists`] when the name is taken and `overwrite` is off
    /// - [`StoreError::RevisionConflict`] when every write attempt lost a race
    pub async fn import_entity(&self, product: &ProductId, entity: Entity, overwrite: bool) -> StoreResult<ImportOutcome> {
        self.upsert(product, entity, overwrite, Vec::new()).await
    }

    /// Parse declaration source and import the entity it declares
    ///
    /// # Errors
    /// - [`StoreError::InputTooSparse`] when nothing could be parsed
    /// - [`StoreError::UnsupportedDialect`] when the hint names a dialect without a parser
    /// - everything [`Self::import_entity`] raises
    pub async fn import_source(
        &self,
        product: &ProductId,
        source: &str,
        dialect_hint: Option<&str>,
        overwrite: bool,
    ) -> StoreResult<ImportOutcome> {
        let extraction = self.engine.parse(source, dialect_hint)?;
        self.upsert(product, extraction.entity, overwrite, extraction.degradations)
            .await
    }

    /// Normalize completion JSON and import the entity it describes
    ///
    /// # Errors
    /// Everything [`Self::import_entity`] raises
    pub async fn import_json_entity(&self, product: &ProductId, value: &Value, overwrite: bool) -> StoreResult<ImportOutcome> {
        let normalized = self.normalizer.normalize_entity_with_report(value);
        self.upsert(product, normalized.value, overwrite, normalized.degradations)
            .await
    }

    /// Import every item independently; failures do not roll back successes
    pub async fn bulk_import(&self, product: &ProductId, items: Vec<BulkItem>, overwrite: bool) -> BulkImportReport {
        let mut report = BulkImportReport::default();
        for (index, item) in items.into_iter().enumerate() {
            let result = match item {
                BulkItem::Source { source, dialect } => {
                    self.import_source(product, &source, dialect.as_deref(), overwrite)
                        .await
                }
                BulkItem::Json(value) => self.import_json_entity(product, &value, overwrite).await,
                BulkItem::Entity(entity) => self.import_entity(product, entity, overwrite).await,
            };
            if let Err(err) = &result {
                warn!(product = %product, index, error = %err, "bulk item rejected");
            }
            report.record(index, result);
        }
        info!(
            product = %product,
            succeeded = report.succeeded,
            failed = report.failed,
            "bulk import finished"
        );
        report
    }

    /// Import a generated architecture document
    ///
    /// Entities are merged one by one; the endpoint list and the tech stack
    /// replace whatever the product had.
    ///
    /// # Errors
    /// Backend failures and revision conflicts while replacing endpoints
    pub async fn import_architecture(
        &self,
        product: &ProductId,
        value: &Value,
        overwrite: bool,
    ) -> StoreResult<ArchitectureImportReport> {
        let normalized = self.normalizer.normalize_architecture_with_report(value);
        let architecture = normalized.value;

        let items = architecture.entities.into_iter().map(BulkItem::Entity).collect();
        let entities = self.bulk_import(product, items, overwrite).await;

        let endpoints = architecture.endpoints;
        let tech_stack = architecture.tech_stack;
        let (counts, _) = self
            .write(product, |doc| {
                doc.endpoints.clone_from(&endpoints);
                doc.tech_stack.clone_from(&tech_stack);
                Ok((doc.endpoints.len(), doc.tech_stack.len()))
            })
            .await?;

        info!(
            product = %product,
            entities = entities.succeeded,
            endpoints = counts.0,
            categories = counts.1,
            "imported architecture"
        );
        Ok(ArchitectureImportReport {
            entities,
            endpoints: counts.0,
            tech_stack_categories: counts.1,
            degradations: normalized.degradations,
        })
    }

    /// Entities of a product, in insertion order
    ///
    /// # Errors
    /// Backend failures
    pub async fn list_entities(&self, product: &ProductId) -> StoreResult<Vec<Entity>> {
        Ok(self.get_or_create(product).await?.entities)
    }

    /// Entity by name, ignoring case
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when the product has no such entity
    pub async fn get_entity(&self, product: &ProductId, name: &str) -> StoreResult<Entity> {
        self.get_or_create(product)
            .await?
            .entity(name)
            .cloned()
            .ok_or_else(|| not_found(product, name))
    }

    /// Replace an entity, possibly renaming it
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] when `name` is not stored
    /// - [`StoreError::AlreadyExists`] when renaming onto another entity's name
    pub async fn update_entity(&self, product: &ProductId, name: &str, entity: Entity) -> StoreResult<Entity> {
        let (updated, _) = self
            .write(product, |doc| {
                let index = doc.position(name).ok_or_else(|| not_found(product, name))?;
                let mut updated = entity.clone();
                let taken = doc
                    .entities
                    .iter()
                    .enumerate()
                    .any(|(i, other)| i != index && other.name_matches(&updated.name));
                if taken {
                    return Err(StoreError::AlreadyExists {
                        entity: updated.name.clone(),
                    });
                }
                let existing = &doc.entities[index];
                updated.id = existing.id;
                updated.provenance.imported_at = existing.provenance.imported_at;
                updated.provenance.updated_at = Utc::now();
                updated.enforce_invariants();
                doc.entities[index] = updated.clone();
                Ok(updated)
            })
            .await?;
        info!(product = %product, entity = %updated.name, "updated entity");
        Ok(updated)
    }

    /// Remove an entity, returning it
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when `name` is not stored
    pub async fn delete_entity(&self, product: &ProductId, name: &str) -> StoreResult<Entity> {
        let (removed, _) = self
            .write(product, |doc| {
                let index = doc.position(name).ok_or_else(|| not_found(product, name))?;
                Ok(doc.entities.remove(index))
            })
            .await?;
        info!(product = %product, entity = %removed.name, "deleted entity");
        Ok(removed)
    }

    /// Re-parse an entity's retained source and merge the result
    ///
    /// The stored name, module and description survive the re-parse.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] when `name` is not stored
    /// - [`StoreError::NoSource`] when the entity was not imported from source
    /// - extraction errors from the retained source
    pub async fn resync_entity(&self, product: &ProductId, name: &str) -> StoreResult<ImportOutcome> {
        let existing = self.get_entity(product, name).await?;
        let source = existing
            .provenance
            .original_source
            .as_deref()
            .ok_or_else(|| StoreError::NoSource {
                entity: existing.name.clone(),
            })?;
        let hint = existing.provenance.dialect.map(|d| d.name());
        let extraction = self.engine.parse(source, hint)?;

        let mut entity = extraction.entity;
        entity.name.clone_from(&existing.name);
        if entity.module.is_none() {
            entity.module.clone_from(&existing.module);
        }
        if entity.description.is_none() {
            entity.description.clone_from(&existing.description);
        }
        debug!(product = %product, entity = %entity.name, "re-syncing entity from source");
        self.upsert(product, entity, true, extraction.degradations).await
    }

    /// Replace a product's endpoint list wholesale
    ///
    /// # Errors
    /// Backend failures and revision conflicts
    pub async fn replace_endpoints(&self, product: &ProductId, endpoints: Vec<Endpoint>) -> StoreResult<usize> {
        let (count, _) = self
            .write(product, |doc| {
                doc.endpoints.clone_from(&endpoints);
                Ok(doc.endpoints.len())
            })
            .await?;
        info!(product = %product, endpoints = count, "replaced endpoints");
        Ok(count)
    }

    /// Normalize completion JSON into endpoints and replace the product's list
    ///
    /// # Errors
    /// Backend failures and revision conflicts
    pub async fn replace_endpoints_json(&self, product: &ProductId, value: &Value) -> StoreResult<Vec<Degradation>> {
        let normalized = self.normalizer.normalize_endpoints_with_report(value);
        self.replace_endpoints(product, normalized.value).await?;
        Ok(normalized.degradations)
    }

    /// Endpoints of a product
    ///
    /// # Errors
    /// Backend failures
    pub async fn list_endpoints(&self, product: &ProductId) -> StoreResult<Vec<Endpoint>> {
        Ok(self.get_or_create(product).await?.endpoints)
    }

    /// Technology stack of a product
    ///
    /// # Errors
    /// Backend failures
    pub async fn tech_stack(&self, product: &ProductId) -> StoreResult<TechStack> {
        Ok(self.get_or_create(product).await?.tech_stack)
    }

    /// Relationship graph of a product, implicit edges included
    ///
    /// # Errors
    /// Backend failures
    pub async fn get_relationship_map(&self, product: &ProductId) -> StoreResult<RelationshipGraph> {
        let document = self.get_or_create(product).await?;
        Ok(build_graph(&document.entities))
    }

    /// Declaration source for a stored entity
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when `name` is not stored
    pub async fn generate_code(&self, product: &ProductId, name: &str) -> StoreResult<String> {
        let entity = self.get_entity(product, name).await?;
        Ok(self.generator.generate(&entity))
    }

    /// Remove a product's schema document
    ///
    /// # Errors
    /// [`StoreError::SchemaNotFound`] when the product has no document
    pub async fn drop_product(&self, product: &ProductId) -> StoreResult<SchemaDocument> {
        let removed = self
            .backend
            .remove(product)
            .await?
            .ok_or_else(|| StoreError::SchemaNotFound(product.clone()))?;
        info!(product = %product, entities = removed.entities.len(), "dropped schema document");
        Ok(removed)
    }

    async fn upsert(
        &self,
        product: &ProductId,
        entity: Entity,
        overwrite: bool,
        degradations: Vec<Degradation>,
    ) -> StoreResult<ImportOutcome> {
        let ((stored, created), _) = self
            .write(product, |doc| {
                let mut incoming = entity.clone();
                incoming.enforce_invariants();
                let now = Utc::now();
                incoming.provenance.updated_at = now;
                incoming.provenance.last_synced_at = Some(now);

                match doc.position(&incoming.name) {
                    None => {
                        incoming.provenance.imported_at = now;
                        doc.entities.push(incoming.clone());
                        Ok((incoming, true))
                    }
                    Some(index) if overwrite => {
                        let existing = &doc.entities[index];
                        incoming.id = existing.id;
                        incoming.provenance.imported_at = existing.provenance.imported_at;
                        doc.entities[index] = incoming.clone();
                        Ok((incoming, false))
                    }
                    Some(index) => Err(StoreError::AlreadyExists {
                        entity: doc.entities[index].name.clone(),
                    }),
                }
            })
            .await?;

        info!(
            product = %product,
            entity = %stored.name,
            created,
            fields = stored.fields.len(),
            degradations = degradations.len(),
            "imported entity"
        );
        Ok(ImportOutcome {
            entity: stored,
            created,
            degradations,
        })
    }

    /// Read-modify-write with bounded retry on revision conflicts
    async fn write<T, F>(&self, product: &ProductId, mut apply: F) -> StoreResult<(T, SchemaDocument)>
    where
        T: Send,
        F: FnMut(&mut SchemaDocument) -> StoreResult<T> + Send,
    {
        let attempts = self.config.max_write_attempts.max(1);
        for attempt in 1..=attempts {
            let current = self.backend.load(product).await?;
            let expected = current.as_ref().map(|doc| doc.revision);
            let mut document = current.unwrap_or_else(|| SchemaDocument::new(product.clone()));

            let value = apply(&mut document)?;
            document.revision += 1;
            document.updated_at = Utc::now();

            match self.backend.save(document.clone(), expected).await {
                Ok(()) => {
                    debug!(product = %product, revision = document.revision, "schema document written");
                    return Ok((value, document));
                }
                Err(err) if err.is_conflict() => {
                    warn!(product = %product, attempt, attempts, "revision conflict, retrying write");
                }
                Err(err) => return Err(err),
            }
        }
        Err(StoreError::RevisionConflict {
            product: product.clone(),
            attempts,
        })
    }
}

fn not_found(product: &ProductId, name: &str) -> StoreError {
    StoreError::NotFound {
        product: product.clone(),
        entity: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_model::{CanonicalType, Field, Origin};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn product() -> ProductId {
        ProductId::new("prod-1")
    }

    fn task(fields: &[&str]) -> Entity {
        let mut entity = Entity::new("Task", Origin::Manual);
        entity.fields = fields.iter().map(|f| Field::text(*f)).collect();
        entity
    }

    #[tokio::test]
    async fn document_is_created_lazily_once() {
        let store = CanonicalSchemaStore::default();
        let first = store.get_or_create(&product()).await.unwrap();
        let second = store.get_or_create(&product()).await.unwrap();
        assert_eq!(first.revision, 1);
        assert_eq!(first.created_at, second.created_at);
    }

    #[tokio::test]
    async fn import_is_a_case_insensitive_upsert() {
        let store = CanonicalSchemaStore::default();
        let created = store.import_entity(&product(), task(&["title"]), false).await.unwrap();
        assert!(created.created);

        let mut renamed = task(&["title", "status"]);
        renamed.name = "TASK".to_string();
        let err = store.import_entity(&product(), renamed.clone(), false).await.unwrap_err();
        assert_eq!(err.to_string(), "entity 'Task' already exists");

        let merged = store.import_entity(&product(), renamed, true).await.unwrap();
        assert!(!merged.created);
        assert_eq!(merged.entity.id, created.entity.id);
        assert_eq!(merged.entity.provenance.imported_at, created.entity.provenance.imported_at);
        assert!(merged.entity.provenance.updated_at >= created.entity.provenance.updated_at);
        assert_eq!(merged.entity.fields.len(), 2);
        assert_eq!(store.list_entities(&product()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_rejects_rename_onto_existing_name() {
        let store = CanonicalSchemaStore::default();
        store.import_entity(&product(), task(&["title"]), false).await.unwrap();
        store
            .import_entity(&product(), Entity::new("Project", Origin::Manual), false)
            .await
            .unwrap();

        let mut clash = task(&["title"]);
        clash.name = "project".to_string();
        let err = store.update_entity(&product(), "task", clash).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { ref entity } if entity == "project"));

        let mut renamed = task(&["title"]);
        renamed.name = "Todo".to_string();
        let updated = store.update_entity(&product(), "Task", renamed).await.unwrap();
        assert_eq!(updated.name, "Todo");
        assert!(store.get_entity(&product(), "task").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_keeps_identity_and_enforces_references() {
        let store = CanonicalSchemaStore::default();
        let original = store.import_entity(&product(), task(&["title"]), false).await.unwrap().entity;

        let mut edited = task(&["title"]);
        let mut owner = Field::text("owner");
        owner.reference = Some("User".to_string());
        edited.fields.push(owner);
        let updated = store.update_entity(&product(), "Task", edited).await.unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.fields[1].field_type, CanonicalType::Reference);
    }

    #[tokio::test]
    async fn delete_and_missing_entities() {
        let store = CanonicalSchemaStore::default();
        store.import_entity(&product(), task(&["title"]), false).await.unwrap();
        let removed = store.delete_entity(&product(), "TASK").await.unwrap();
        assert_eq!(removed.name, "Task");
        assert!(store.delete_entity(&product(), "Task").await.unwrap_err().is_not_found());
        assert!(store.generate_code(&product(), "Task").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn json_import_and_endpoints() {
        let store = CanonicalSchemaStore::default();
        let outcome = store
            .import_json_entity(&product(), &json!({"entity": "Comment", "fields": {"body": "text", "author": {"ref": "User"}}}), false)
            .await
            .unwrap();
        assert_eq!(outcome.entity.provenance.origin, Origin::Generated);
        assert_eq!(outcome.entity.fields[1].field_type, CanonicalType::Reference);

        store
            .replace_endpoints(&product(), vec![Endpoint::new("get", "/a"), Endpoint::new("post", "/a")])
            .await
            .unwrap();
        let degradations = store
            .replace_endpoints_json(&product(), &json!([{"method": "delete", "path": "/b"}]))
            .await
            .unwrap();
        assert!(degradations.is_empty());
        let endpoints = store.list_endpoints(&product()).await.unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].method, "DELETE");
    }

    #[tokio::test]
    async fn resync_requires_retained_source() {
        let store = CanonicalSchemaStore::default();
        store.import_entity(&product(), task(&["title"]), false).await.unwrap();
        let err = store.resync_entity(&product(), "Task").await.unwrap_err();
        assert!(matches!(err, StoreError::NoSource { .. }));
    }

    #[tokio::test]
    async fn drop_product_removes_document() {
        let store = CanonicalSchemaStore::default();
        store.import_entity(&product(), task(&["title"]), false).await.unwrap();
        let dropped = store.drop_product(&product()).await.unwrap();
        assert_eq!(dropped.entities.len(), 1);
        assert!(matches!(
            store.drop_product(&product()).await.unwrap_err(),
            StoreError::SchemaNotFound(_)
        ));
        assert!(store.list_entities(&product()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn every_write_advances_the_revision() {
        let store = CanonicalSchemaStore::default();
        store.import_entity(&product(), task(&["title"]), false).await.unwrap();
        store.replace_endpoints(&product(), Vec::new()).await.unwrap();
        let document = store.get_or_create(&product()).await.unwrap();
        assert_eq!(document.revision, 2);
    }
}
