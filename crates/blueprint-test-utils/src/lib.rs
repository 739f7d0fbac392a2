//! Testing utilities for the Blueprint workspace
//!
//! Shared declaration sources, completion payloads and tracing setup.

#![allow(missing_docs)]

use blueprint_model::{CanonicalType, Entity, Field, Origin, ProductId};
use serde_json::{json, Value};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Task schema with a field descriptor, a reference and a list
pub const TASK_SOURCE: &str = r"const mongoose = require('mongoose');
const ObjectIdType = mongoose.Schema.Types.ObjectId;

const taskSchema = new mongoose.Schema({
  title: { type: String, required: true, maxlength: 200 },
  assignedTo: { type: ObjectIdType, ref: 'User' },
  tags: [String]
}, { timestamps: true });

module.exports = mongoose.model('Task', taskSchema);
";

/// Project schema exercising most field probes and secondary declarations
pub const PROJECT_SOURCE: &str = r"const mongoose = require('mongoose');

const projectSchema = new mongoose.Schema({
  // display name, may contain commas
  name: { type: String, required: [true, 'name, please'], trim: true, unique: true },
  key: { type: String, uppercase: true, minlength: 2, maxlength: 8, match: /^[A-Z]+$/ },
  status: { type: String, enum: ['active', 'archived'], default: 'active' },
  budget: { type: Number, min: 0, max: 1000000 },
  owner: { type: mongoose.Schema.Types.ObjectId, ref: 'User', required: true },
  members: [{ type: mongoose.Schema.Types.ObjectId, ref: 'User' }],
  settings: {
    visibility: { type: String, enum: ['private', 'public'] },
    lead: { type: mongoose.Schema.Types.ObjectId, ref: 'User' }
  },
  contactEmail: { type: String, lowercase: true, trim: true },
  deletedAt: { type: Date, default: null }
}, { timestamps: { createdAt: 'created', updatedAt: 'modified' }, collection: 'projects' });

projectSchema.index({ owner: 1, status: -1 }, { name: 'owner_status' });

module.exports = mongoose.model('Project', projectSchema);
";

/// User schema; the other fixtures reference it
pub const USER_SOURCE: &str = r"const mongoose = require('mongoose');

const userSchema = new mongoose.Schema({
  email: { type: String, required: true, unique: true, lowercase: true },
  password: { type: String, required: true, select: false },
  displayName: String,
  roles: [String]
}, { timestamps: true });

module.exports = mongoose.model('User', userSchema);
";

/// Relational model block, read on the reduced-fidelity path
pub const PRISMA_SOURCE: &str = r#"datasource db {
  provider = "postgresql"
}

model Sprint {
  id        String   @id
  name      String
  goal      String?
  startsOn  DateTime
  project   Project  @relation(fields: [projectId], references: [id])
  projectId String
  tasks     Task[]
}
"#;

/// Completion payload describing one entity loosely
#[must_use]
pub fn ai_entity_payload() -> Value {
    json!({
        "entity_name": "Comment",
        "description": "Discussion on a task",
        "fields": [
            {"name": "body", "data_type": "text", "is_required": "yes", "max_length": "2000"},
            {"field": "author", "type": "string", "references": "User"},
            "createdAt:Date",
            {"name": "reactions", "type": "[String]"}
        ],
        "relationships": [{"target": "Task", "type": "belongsTo", "field": "task"}],
        "timestamps": true
    })
}

/// Completion payload describing a whole architecture
#[must_use]
pub fn ai_architecture_payload() -> Value {
    json!({
        "overview": "Project tracker",
        "entities": {
            "Task": {"fields": {"title": "String", "project": {"type": "ObjectId", "ref": "Project"}}},
            "Project": ["name:String", "owner:ObjectId"]
        },
        "endpoints": [
            {"method": "get", "path": "/projects"},
            {"method": "POST", "route": "projects/:projectId/tasks", "roles": ["member"], "rate_limit": "30/min"}
        ],
        "tech_stack": {
            "frontend": ["React", "TypeScript"],
            "database": "MongoDB",
            "observability": ["OpenTelemetry"]
        }
    })
}

pub fn product(id: &str) -> ProductId {
    ProductId::new(id)
}

/// Manual entity with text fields
pub fn entity_with_fields(name: &str, fields: &[&str]) -> Entity {
    let mut entity = Entity::new(name, Origin::Manual);
    entity.fields = fields.iter().map(|f| Field::text(*f)).collect();
    entity
}

/// Manual entity with one reference field
pub fn entity_referencing(name: &str, field: &str, target: &str) -> Entity {
    let mut entity = Entity::new(name, Origin::Manual);
    entity.fields.push(Field::new(field, CanonicalType::Text).with_reference(target));
    entity
}

static TRACING: Once = Once::new();

/// Install a test-writer fmt subscriber once per process
///
/// Honors `RUST_LOG`; defaults to `warn`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
