//! Import outcomes and bulk reports

use crate::error::StoreError;
use blueprint_extract::Degradation;
use blueprint_model::Entity;
use serde_json::Value;

/// One successful import
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    /// Entity as stored
    pub entity: Entity,
    /// Appended rather than merged into an existing record
    pub created: bool,
    /// What extraction or normalization had to reduce
    pub degradations: Vec<Degradation>,
}

/// One item of a bulk import
#[derive(Debug, Clone, PartialEq)]
pub enum BulkItem {
    /// Declaration source with an optional dialect hint
    Source {
        /// Declaration text
        source: String,
        /// Dialect hint
        dialect: Option<String>,
    },
    /// Completion-service JSON
    Json(Value),
    /// Already canonical entity
    Entity(Entity),
}

impl BulkItem {
    /// Source item without a dialect hint
    #[must_use]
    pub fn source(source: impl Into<String>) -> Self {
        Self::Source {
            source: source.into(),
            dialect: None,
        }
    }
}

/// Result of one bulk item, in input order
#[derive(Debug)]
pub struct BulkItemResult {
    /// Position in the input
    pub index: usize,
    /// Import outcome or the reason it failed
    pub result: Result<ImportOutcome, StoreError>,
}

impl BulkItemResult {
    /// Entity name, when the item got far enough to have one
    #[must_use]
    pub fn entity_name(&self) -> Option<&str> {
        match &self.result {
            Ok(outcome) => Some(outcome.entity.name.as_str()),
            Err(StoreError::AlreadyExists { entity } | StoreError::NotFound { entity, .. }) => Some(entity.as_str()),
            Err(_) => None,
        }
    }
}

/// Counts and per-item detail of a bulk import
#[derive(Debug, Default)]
pub struct BulkImportReport {
    /// Items imported
    pub succeeded: usize,
    /// Items rejected
    pub failed: usize,
    /// Every item, never truncated
    pub items: Vec<BulkItemResult>,
}

impl BulkImportReport {
    pub(crate) fn record(&mut self, index: usize, result: Result<ImportOutcome, StoreError>) {
        if result.is_ok() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.items.push(BulkItemResult { index, result });
    }

    /// Total items processed
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Whether every item was imported
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    /// Failed items
    pub fn failures(&self) -> impl Iterator<Item = (usize, &StoreError)> {
        self.items
            .iter()
            .filter_map(|item| item.result.as_ref().err().map(|e| (item.index, e)))
    }
}

/// Result of importing an architecture document
#[derive(Debug, Default)]
pub struct ArchitectureImportReport {
    /// Per-entity import results
    pub entities: BulkImportReport,
    /// Endpoints now stored for the product
    pub endpoints: usize,
    /// Tech-stack categories now stored for the product
    pub tech_stack_categories: usize,
    /// Reductions made while normalizing the document
    pub degradations: Vec<Degradation>,
}
