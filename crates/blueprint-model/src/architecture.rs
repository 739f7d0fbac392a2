//! Generated architecture documents

use crate::endpoint::Endpoint;
use crate::entity::Entity;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Technology stack: category -> structured section, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechStack(pub IndexMap<String, Map<String, Value>>);

impl TechStack {
    /// Section for `category`
    #[must_use]
    pub fn section(&self, category: &str) -> Option<&Map<String, Value>> {
        self.0.get(category)
    }

    /// Insert or replace a section
    pub fn insert(&mut self, category: impl Into<String>, section: Map<String, Value>) {
        self.0.insert(category.into(), section);
    }

    /// Number of sections
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No sections
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Architecture proposal for a product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    /// Overview text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Data model
    #[serde(default)]
    pub entities: Vec<Entity>,
    /// API surface
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// Technology choices
    #[serde(default)]
    pub tech_stack: TechStack,
}
