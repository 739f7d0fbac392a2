//! Relationship graph over a product's entities
//!
//! Edges come from two places: relationships stored on an entity, and
//! reference fields no stored relationship accounts for. The second kind is
//! computed here on every build and never written back.

use blueprint_model::{Cardinality, Entity};
use serde::{Deserialize, Serialize};

/// One entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Entity name
    pub id: String,
    /// Top-level field count
    pub weight: usize,
    /// Module tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Collection name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

/// One owner -> target link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Owning entity
    pub source: String,
    /// Target entity, resolved to its stored spelling when known
    pub target: String,
    /// Cardinality from the owner's side
    pub kind: Cardinality,
    /// Owning field (dotted path for nested fields)
    pub field: String,
    /// Derived from a reference field, not stored
    pub implicit: bool,
    /// Deleting the owner deletes the target
    pub cascade_delete: bool,
    /// Target is not an entity of this product
    pub dangling: bool,
}

/// Node/edge view of a schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    /// One per entity, in entity order
    pub nodes: Vec<GraphNode>,
    /// Stored edges first per entity, then implicit ones
    pub edges: Vec<GraphEdge>,
}

impl RelationshipGraph {
    /// Edges leaving `entity`
    pub fn edges_from<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == entity)
    }

    /// Edges whose target is unknown
    pub fn dangling(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(|e| e.dangling)
    }

    /// Node by entity name
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Build the relationship graph of `entities`
#[must_use]
pub fn build_graph(entities: &[Entity]) -> RelationshipGraph {
    let resolve = |target: &str| -> (String, bool) {
        entities
            .iter()
            .find(|e| e.name_matches(target))
            .map_or_else(|| (target.to_string(), true), |e| (e.name.clone(), false))
    };

    let nodes = entities
        .iter()
        .map(|entity| GraphNode {
            id: entity.name.clone(),
            weight: entity.fields.len(),
            module: entity.module.clone(),
            collection: entity.collection.clone(),
        })
        .collect();

    let mut edges = Vec::new();
    for entity in entities {
        for relationship in &entity.relationships {
            let (target, dangling) = resolve(&relationship.target);
            edges.push(GraphEdge {
                source: entity.name.clone(),
                target,
                kind: relationship.kind,
                field: relationship.field.clone(),
                implicit: false,
                cascade_delete: relationship.cascade_delete,
                dangling,
            });
        }

        for field in &entity.fields {
            for (path, reference) in field.reference_paths() {
                let Some(raw_target) = reference.reference_target() else {
                    continue;
                };
                if entity.relationships.iter().any(|r| r.covers(&path, raw_target)) {
                    continue;
                }
                let (target, dangling) = resolve(raw_target);
                let kind = if reference.is_list() {
                    Cardinality::OneToMany
                } else {
                    Cardinality::OneToOne
                };
                edges.push(GraphEdge {
                    source: entity.name.clone(),
                    target,
                    kind,
                    field: path,
                    implicit: true,
                    cascade_delete: false,
                    dangling,
                });
            }
        }
    }

    tracing::debug!(
        nodes = entities.len(),
        edges = edges.len(),
        "built relationship graph"
    );
    RelationshipGraph { nodes, edges }
}
