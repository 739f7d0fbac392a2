//! Completion-JSON normalization
//!
//! Converts loosely structured JSON from a completion service into canonical
//! entities, endpoints and architecture documents. Normalization is total:
//! every input, however malformed, yields a structurally valid record. Parts
//! that could not be read are defaulted and reported as degradations.
//!
//! # Example
//!
//! ```rust
//! use blueprint_extract::JsonNormalizer;
//! use serde_json::json;
//!
//! let normalizer = JsonNormalizer::default();
//! let endpoint = normalizer.normalize_endpoint(&json!({"method": "post", "path": "/x"}));
//! assert_eq!(endpoint.method, "POST");
//! assert!(endpoint.auth_required);
//! ```

use crate::config::ExtractionConfig;
use crate::degradation::{Degradation, DegradationKind, Normalized};
use blueprint_model::{Architecture, Endpoint, Entity, TechStack};
use serde_json::Value;

mod architecture;
mod endpoint;
mod entity;
mod value;

pub use architecture::{category_slots, ADDITIONAL_KEY, ITEMS_KEY};

/// Degradations collected during one normalization run
#[derive(Debug, Default)]
pub(crate) struct Report {
    degradations: Vec<Degradation>,
}

impl Report {
    pub(crate) fn degrade(&mut self, location: impl Into<String>, kind: DegradationKind, detail: impl Into<String>) {
        let record = Degradation::new(location, kind, detail);
        tracing::warn!(
            location = %record.location,
            kind = ?record.kind,
            detail = %record.detail,
            "degraded normalization"
        );
        self.degradations.push(record);
    }

    pub(crate) fn finish<T>(self, value: T) -> Normalized<T> {
        Normalized {
            value,
            degradations: self.degradations,
        }
    }
}

/// Normalizer for completion-service JSON
#[derive(Debug, Clone, Default)]
pub struct JsonNormalizer {
    config: ExtractionConfig,
}

impl JsonNormalizer {
    /// Create normalizer
    #[inline]
    #[must_use]
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Canonical entity from any JSON value
    #[must_use]
    pub fn normalize_entity(&self, value: &Value) -> Entity {
        self.normalize_entity_with_report(value).into_value()
    }

    /// Canonical entity plus what was defaulted
    #[must_use]
    pub fn normalize_entity_with_report(&self, value: &Value) -> Normalized<Entity> {
        let mut report = Report::default();
        let entity = entity::entity(&mut report, &self.config, value, "entity");
        report.finish(entity)
    }

    /// Entities from a list (or a single object, or a name-keyed map)
    #[must_use]
    pub fn normalize_entities_with_report(&self, value: &Value) -> Normalized<Vec<Entity>> {
        let mut report = Report::default();
        let entities = entity::entities(&mut report, &self.config, value, "entities");
        report.finish(entities)
    }

    /// Canonical endpoint from any JSON value
    #[must_use]
    pub fn normalize_endpoint(&self, value: &Value) -> Endpoint {
        self.normalize_endpoint_with_report(value).into_value()
    }

    /// Canonical endpoint plus what was defaulted
    #[must_use]
    pub fn normalize_endpoint_with_report(&self, value: &Value) -> Normalized<Endpoint> {
        let mut report = Report::default();
        let endpoint = endpoint::endpoint(&mut report, &self.config, value, "endpoint");
        report.finish(endpoint)
    }

    /// Endpoints from a list, a single object, or a path-keyed map
    #[must_use]
    pub fn normalize_endpoints_with_report(&self, value: &Value) -> Normalized<Vec<Endpoint>> {
        let mut report = Report::default();
        let endpoints = endpoint::endpoints(&mut report, &self.config, value, "endpoints");
        report.finish(endpoints)
    }

    /// Technology stack from any JSON value
    #[must_use]
    pub fn normalize_tech_stack(&self, value: &Value) -> TechStack {
        let mut report = Report::default();
        architecture::tech_stack(&mut report, value, "tech_stack")
    }

    /// Architecture document from any JSON value
    #[must_use]
    pub fn normalize_architecture(&self, value: &Value) -> Architecture {
        self.normalize_architecture_with_report(value).into_value()
    }

    /// Architecture document plus what was defaulted
    #[must_use]
    pub fn normalize_architecture_with_report(&self, value: &Value) -> Normalized<Architecture> {
        let mut report = Report::default();
        let architecture = architecture::architecture(&mut report, &self.config, value);
        report.finish(architecture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_model::CanonicalType;
    use proptest::prelude::*;

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z:_ ]{0,12}".prop_map(Value::String),
            prop::sample::select(vec![
                "name", "fields", "type", "ref", "String", "ObjectId", "[Number]", "method", "path",
                "frontend", "required", "yes",
            ])
            .prop_map(Value::from),
        ];
        leaf.prop_recursive(4, 64, 6, |inner| {
            let keys = prop::sample::select(vec![
                "name", "entity", "fields", "type", "ref", "references", "items", "enum", "required",
                "relationships", "indexes", "timestamps", "method", "path", "parameters", "responses",
                "rate_limit", "auth", "roles", "tech_stack", "entities", "endpoints", "frontend",
                "backend", "target", "cardinality", "x",
            ]);
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
                prop::collection::vec((keys, inner), 0..6).prop_map(|pairs| {
                    Value::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn entity_normalization_is_total(value in arb_json()) {
            let entity = JsonNormalizer::default().normalize_entity(&value);
            prop_assert!(!entity.name.trim().is_empty());
            for field in &entity.fields {
                prop_assert!(!field.name.is_empty());
                for (_, reference) in field.reference_paths() {
                    prop_assert_eq!(&reference.field_type, &CanonicalType::Reference);
                }
            }
        }

        #[test]
        fn endpoint_normalization_is_total(value in arb_json()) {
            let endpoint = JsonNormalizer::default().normalize_endpoint(&value);
            prop_assert!(!endpoint.method.is_empty());
            prop_assert_eq!(endpoint.method.to_ascii_uppercase(), endpoint.method.clone());
            prop_assert!(endpoint.path.starts_with('/'));
        }

        #[test]
        fn architecture_normalization_is_total(value in arb_json()) {
            let normalized = JsonNormalizer::default().normalize_architecture_with_report(&value);
            for entity in &normalized.value.entities {
                prop_assert!(!entity.name.trim().is_empty());
            }
        }
    }
}
