use async_trait::async_trait;
use blueprint_model::ProductId;
use blueprint_store::{
    BulkItem, CanonicalSchemaStore, InMemoryDocumentStore, SchemaDocument, SchemaDocumentStore, StoreConfig,
    StoreError, StoreResult,
};
use blueprint_test_utils::{ai_entity_payload, entity_referencing, entity_with_fields, init_tracing, product, TASK_SOURCE};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Backend that loses the next `failures` writes to a phantom writer
#[derive(Debug, Default)]
struct ContendedStore {
    inner: InMemoryDocumentStore,
    failures: AtomicU32,
    saves: AtomicU32,
}

impl ContendedStore {
    fn losing(failures: u32) -> Self {
        Self {
            failures: AtomicU32::new(failures),
            ..Self::default()
        }
    }
}

#[async_trait]
impl SchemaDocumentStore for ContendedStore {
    async fn load(&self, product: &ProductId) -> StoreResult<Option<SchemaDocument>> {
        self.inner.load(product).await
    }

    async fn save(&self, document: SchemaDocument, expected_revision: Option<u64>) -> StoreResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let lost = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lost {
            return Err(StoreError::RevisionConflict {
                product: document.product_id,
                attempts: 1,
            });
        }
        self.inner.save(document, expected_revision).await
    }

    async fn remove(&self, product: &ProductId) -> StoreResult<Option<SchemaDocument>> {
        self.inner.remove(product).await
    }
}

/// Backend whose writes always fail
#[derive(Debug, Default)]
struct BrokenStore;

#[async_trait]
impl SchemaDocumentStore for BrokenStore {
    async fn load(&self, _product: &ProductId) -> StoreResult<Option<SchemaDocument>> {
        Ok(None)
    }

    async fn save(&self, _document: SchemaDocument, _expected_revision: Option<u64>) -> StoreResult<()> {
        Err(StoreError::Backend("disk full".to_string()))
    }

    async fn remove(&self, _product: &ProductId) -> StoreResult<Option<SchemaDocument>> {
        Ok(None)
    }
}

#[tokio::test]
async fn bulk_import_reports_every_item() {
    init_tracing();
    let store = CanonicalSchemaStore::default();
    let p = product("p");
    store.import_entity(&p, entity_with_fields("Project", &["name"]), false).await.unwrap();

    let items = vec![
        BulkItem::source(TASK_SOURCE),
        BulkItem::Json(ai_entity_payload()),
        BulkItem::Entity(entity_with_fields("project", &["title"])),
        BulkItem::source("tiny"),
        BulkItem::Source {
            source: TASK_SOURCE.to_string(),
            dialect: Some("sql".to_string()),
        },
        BulkItem::Entity(entity_referencing("Sprint", "project", "Project")),
    ];
    let report = store.bulk_import(&p, items, false).await;

    assert_eq!(report.total(), 6);
    assert_eq!((report.succeeded, report.failed), (3, 3));
    let failed: Vec<_> = report.failures().map(|(i, _)| i).collect();
    assert_eq!(failed, vec![2, 3, 4]);
    assert_eq!(report.items[2].entity_name(), Some("Project"));
    assert!(matches!(report.items[3].result, Err(StoreError::InputTooSparse(_))));
    assert!(matches!(report.items[4].result, Err(StoreError::UnsupportedDialect(_))));

    // Successes are kept even though later items failed
    let names: Vec<_> = store
        .list_entities(&p)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["Project", "Task", "Comment", "Sprint"]);
}

#[tokio::test]
async fn bulk_import_with_overwrite_merges_duplicates() {
    let store = CanonicalSchemaStore::default();
    let p = product("p");
    let items = vec![
        BulkItem::Entity(entity_with_fields("Task", &["title"])),
        BulkItem::Entity(entity_with_fields("TASK", &["title", "status"])),
    ];
    let report = store.bulk_import(&p, items, true).await;
    assert!(report.is_complete());

    let stored = store.list_entities(&p).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].fields.len(), 2);
    let first = report.items[0].result.as_ref().unwrap();
    let second = report.items[1].result.as_ref().unwrap();
    assert!(first.created && !second.created);
    assert_eq!(first.entity.id, second.entity.id);
}

#[tokio::test]
async fn lost_writes_are_retried_from_a_fresh_read() {
    init_tracing();
    let backend = Arc::new(ContendedStore::losing(2));
    let store = CanonicalSchemaStore::new(backend.clone(), StoreConfig::new().with_max_write_attempts(3));
    let p = product("p");

    let outcome = store.import_entity(&p, entity_with_fields("Task", &["title"]), false).await.unwrap();
    assert!(outcome.created);
    assert_eq!(backend.saves.load(Ordering::SeqCst), 3);
    assert_eq!(store.list_entities(&p).await.unwrap().len(), 1);
}

#[tokio::test]
async fn persistent_contention_surfaces_a_conflict() {
    let backend = Arc::new(ContendedStore::losing(u32::MAX));
    let store = CanonicalSchemaStore::new(backend.clone(), StoreConfig::new().with_max_write_attempts(4));
    let p = product("p");

    let err = store
        .replace_endpoints(&p, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::RevisionConflict { attempts: 4, .. }));
    assert_eq!(backend.saves.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn concurrent_imports_all_land() {
    let store = Arc::new(CanonicalSchemaStore::default());
    let p = product("p");
    store.get_or_create(&p).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            let p = p.clone();
            tokio::spawn(async move {
                let entity = entity_with_fields(&format!("Entity{i}"), &["name"]);
                let config_attempts = store.config().max_write_attempts;
                // Retry at the call site too; eight writers can exhaust three attempts
                for _ in 0..config_attempts * 8 {
                    match store.import_entity(&p, entity.clone(), false).await {
                        Err(err) if err.is_conflict() => continue,
                        other => return other,
                    }
                }
                Err(StoreError::Backend("gave up".to_string()))
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    let document = store.get_or_create(&p).await.unwrap();
    assert_eq!(document.entities.len(), 8);
    assert_eq!(document.revision, 9);
}

#[tokio::test]
async fn backend_failures_are_not_retried() {
    let store = CanonicalSchemaStore::new(Arc::new(BrokenStore), StoreConfig::default());
    let err = store
        .import_json_entity(&product("p"), &json!({"name": "Task"}), false)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Backend(ref detail) if detail == "disk full"));
}
