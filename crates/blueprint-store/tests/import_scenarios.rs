use blueprint_extract::JsonNormalizer;
use blueprint_model::{Cardinality, CanonicalType, Dialect, Origin, TimestampPolicy};
use blueprint_store::{CanonicalSchemaStore, StoreError};
use blueprint_test_utils::{
    ai_architecture_payload, ai_entity_payload, init_tracing, product, PRISMA_SOURCE, PROJECT_SOURCE, TASK_SOURCE,
};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn task_declaration_becomes_canonical_entity() {
    init_tracing();
    let store = CanonicalSchemaStore::default();
    let outcome = store.import_source(&product("p"), TASK_SOURCE, None, false).await.unwrap();
    let task = outcome.entity;

    assert!(outcome.created);
    assert!(outcome.degradations.is_empty());
    assert_eq!(task.name, "Task");
    assert_eq!(task.fields.len(), 3);

    let title = task.field("title").unwrap();
    assert_eq!(title.field_type, CanonicalType::Text);
    assert!(title.required);
    assert_eq!(title.constraints.max_length, Some(200));

    let assigned = task.field("assignedTo").unwrap();
    assert_eq!(assigned.field_type, CanonicalType::Reference);
    assert_eq!(assigned.reference_target(), Some("User"));

    let tags = task.field("tags").unwrap();
    assert_eq!(tags.field_type, CanonicalType::List);
    assert_eq!(tags.items.as_ref().unwrap().item_type, CanonicalType::Text);

    assert_eq!(task.relationships.len(), 1);
    let rel = &task.relationships[0];
    assert_eq!((rel.target.as_str(), rel.kind, rel.field.as_str()), ("User", Cardinality::OneToOne, "assignedTo"));
    assert!(rel.inferred);

    assert_eq!(task.timestamps, TimestampPolicy::enabled());
    assert!(task.timestamps.uses_default_names());
    assert_eq!(task.provenance.origin, Origin::Source);
    assert_eq!(task.provenance.dialect, Some(Dialect::Mongoose));
}

#[tokio::test]
async fn project_declaration_keeps_probes_and_secondary_declarations() {
    init_tracing();
    let store = CanonicalSchemaStore::default();
    let project = store
        .import_source(&product("p"), PROJECT_SOURCE, Some("mongoose"), false)
        .await
        .unwrap()
        .entity;

    assert_eq!(project.fields.len(), 9);
    assert_eq!(project.collection.as_deref(), Some("projects"));

    let name = project.field("name").unwrap();
    assert!(name.required && name.unique && name.constraints.trim);

    let key = project.field("key").unwrap();
    assert!(key.constraints.uppercase);
    assert_eq!((key.constraints.min_length, key.constraints.max_length), (Some(2), Some(8)));
    assert_eq!(key.constraints.pattern.as_deref(), Some("^[A-Z]+$"));

    let status = project.field("status").unwrap();
    assert_eq!(status.enum_values, vec![json!("active"), json!("archived")]);
    assert_eq!(status.default, Some(json!("active")));

    let budget = project.field("budget").unwrap();
    assert_eq!((budget.constraints.min, budget.constraints.max), (Some(0.0), Some(1_000_000.0)));

    let members = project.field("members").unwrap();
    assert_eq!(members.field_type, CanonicalType::Reference);
    assert!(members.is_list());

    let settings = project.field("settings").unwrap();
    assert_eq!(settings.field_type, CanonicalType::Structure);
    assert_eq!(settings.fields.len(), 2);

    let relationship_fields: Vec<_> = project.relationships.iter().map(|r| r.field.as_str()).collect();
    assert_eq!(relationship_fields, vec!["owner", "members", "settings.lead"]);
    assert_eq!(project.relationships[1].kind, Cardinality::OneToMany);

    assert_eq!(project.timestamps.created_at.as_deref(), Some("created"));
    assert_eq!(project.timestamps.updated_at.as_deref(), Some("modified"));
    assert!(project.soft_delete.enabled);
    assert_eq!(project.soft_delete.field.as_deref(), Some("deletedAt"));

    let declared: Vec<_> = project.indexes.iter().filter(|i| !i.field_level).collect();
    assert_eq!(declared.len(), 1);
    assert_eq!(declared[0].name.as_deref(), Some("owner_status"));
    assert!(project.indexes.iter().any(|i| i.field_level && i.keys_exactly(&["name"])));
}

#[tokio::test]
async fn prisma_models_take_the_reduced_path() {
    let store = CanonicalSchemaStore::default();
    let sprint = store.import_source(&product("p"), PRISMA_SOURCE, None, false).await.unwrap().entity;

    assert_eq!(sprint.name, "Sprint");
    assert_eq!(sprint.provenance.dialect, Some(Dialect::Prisma));
    assert_eq!(sprint.field("startsOn").unwrap().field_type, CanonicalType::Date);
    assert!(!sprint.field("goal").unwrap().required);
    assert_eq!(sprint.field("project").unwrap().reference_target(), Some("Project"));
    let tasks = sprint.field("tasks").unwrap();
    assert_eq!(tasks.field_type, CanonicalType::Reference);
    assert!(tasks.is_list());
}

#[tokio::test]
async fn rejected_sources() {
    let store = CanonicalSchemaStore::default();
    let err = store.import_source(&product("p"), "let x;", None, false).await.unwrap_err();
    assert!(matches!(err, StoreError::InputTooSparse(_)));

    for hint in ["sql", "typeorm", "sequelize", "cobol"] {
        let err = store.import_source(&product("p"), TASK_SOURCE, Some(hint), false).await.unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedDialect(_)), "{hint}");
    }
    assert!(store.list_entities(&product("p")).await.unwrap().is_empty());
}

#[test]
fn minimal_endpoint_is_authenticated_and_empty() {
    let endpoint = JsonNormalizer::default().normalize_endpoint(&json!({"method": "post", "path": "/x"}));
    assert_eq!(endpoint.method, "POST");
    assert!(endpoint.auth_required);
    assert!(endpoint.roles_allowed.is_empty());
    assert!(endpoint.responses.is_empty());
}

#[tokio::test]
async fn loose_entity_json_is_normalized() {
    let store = CanonicalSchemaStore::default();
    let outcome = store.import_json_entity(&product("p"), &ai_entity_payload(), false).await.unwrap();
    let comment = outcome.entity;

    assert_eq!(comment.name, "Comment");
    assert_eq!(comment.description.as_deref(), Some("Discussion on a task"));
    let names: Vec<_> = comment.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["body", "author", "createdAt", "reactions"]);

    let body = &comment.fields[0];
    assert!(body.required);
    assert_eq!(body.constraints.max_length, Some(2000));
    assert_eq!(comment.fields[1].field_type, CanonicalType::Reference);
    assert_eq!(comment.fields[2].field_type, CanonicalType::Date);
    assert_eq!(comment.fields[3].items.as_ref().unwrap().item_type, CanonicalType::Text);

    assert_eq!(comment.relationships[0].target, "Task");
    assert_eq!(comment.relationships[0].kind, Cardinality::OneToOne);
    assert!(comment.timestamps.is_enabled());
}

#[tokio::test]
async fn architecture_import_replaces_endpoints_and_stack() {
    init_tracing();
    let store = CanonicalSchemaStore::default();
    let p = product("p");
    let report = store.import_architecture(&p, &ai_architecture_payload(), false).await.unwrap();

    assert_eq!(report.entities.succeeded, 2);
    assert_eq!(report.endpoints, 2);
    assert_eq!(report.tech_stack_categories, 3);

    let endpoints = store.list_endpoints(&p).await.unwrap();
    assert_eq!(endpoints[1].path, "/projects/:projectId/tasks");
    assert_eq!(endpoints[1].path_params[0].name, "projectId");
    assert_eq!(endpoints[1].rate_limit.map(|r| r.window_seconds), Some(60));

    let stack = store.tech_stack(&p).await.unwrap();
    assert_eq!(stack.section("database").unwrap()["primary"], json!("MongoDB"));
    assert_eq!(stack.section("observability").unwrap()["items"], json!(["OpenTelemetry"]));

    // A second run replaces rather than merges
    store
        .import_architecture(&p, &json!({"endpoints": [{"path": "/health", "public": true}]}), true)
        .await
        .unwrap();
    let endpoints = store.list_endpoints(&p).await.unwrap();
    assert_eq!(endpoints.len(), 1);
    assert!(!endpoints[0].auth_required);
    assert!(store.tech_stack(&p).await.unwrap().is_empty());
    assert_eq!(store.list_entities(&p).await.unwrap().len(), 2);
}

#[tokio::test]
async fn resync_rereads_retained_source() {
    let store = CanonicalSchemaStore::default();
    let p = product("p");
    let first = store.import_source(&p, TASK_SOURCE, None, false).await.unwrap().entity;

    let mut edited = first.clone();
    edited.fields.truncate(1);
    edited.module = Some("planning".to_string());
    store.update_entity(&p, "Task", edited).await.unwrap();

    let resynced = store.resync_entity(&p, "task").await.unwrap();
    assert!(!resynced.created);
    assert_eq!(resynced.entity.id, first.id);
    assert_eq!(resynced.entity.fields, first.fields);
    assert_eq!(resynced.entity.module.as_deref(), Some("planning"));
}
