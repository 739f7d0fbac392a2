//! Architecture and technology-stack normalization

use super::endpoint::endpoints;
use super::entity::entities;
use super::value::{as_string_list, as_text, kind_of, pick, text_of};
use super::Report;
use crate::config::ExtractionConfig;
use crate::degradation::DegradationKind;
use blueprint_model::{Architecture, TechStack};
use serde_json::{Map, Value};

/// Key holding list entries beyond a category's fixed slots
pub const ADDITIONAL_KEY: &str = "additional";

/// Key holding every entry of a category without fixed slots
pub const ITEMS_KEY: &str = "items";

const FRONTEND: &[&str] = &["framework", "language", "styling", "state_management", "build_tool"];
const BACKEND: &[&str] = &["framework", "language", "runtime", "api_style"];
const DATABASE: &[&str] = &["primary", "cache", "search", "orm"];
const INFRASTRUCTURE: &[&str] = &["hosting", "ci_cd", "containerization", "monitoring"];
const TESTING: &[&str] = &["unit", "integration", "e2e"];

/// Fixed slot names for a tech-stack category, in positional order
///
/// Unknown categories have no slots; their entries land under [`ITEMS_KEY`].
#[must_use]
pub fn category_slots(category: &str) -> &'static [&'static str] {
    match canonical_category(category) {
        Some("frontend") => FRONTEND,
        Some("backend") => BACKEND,
        Some("database") => DATABASE,
        Some("infrastructure") => INFRASTRUCTURE,
        Some("testing") => TESTING,
        _ => &[],
    }
}

fn canonical_category(category: &str) -> Option<&'static str> {
    let lowered = category.trim().to_ascii_lowercase().replace(['-', ' '], "_");
    let canonical = match lowered.as_str() {
        "frontend" | "front_end" | "fe" | "client" | "ui" | "web" => "frontend",
        "backend" | "back_end" | "be" | "server" | "api" => "backend",
        "database" | "databases" | "db" | "data" | "storage" | "persistence" => "database",
        "infrastructure" | "infra" | "devops" | "deployment" | "hosting" | "ops" => "infrastructure",
        "testing" | "tests" | "test" | "qa" => "testing",
        _ => return None,
    };
    Some(canonical)
}

/// Architecture document from any JSON value
pub(crate) fn architecture(report: &mut Report, config: &ExtractionConfig, value: &Value) -> Architecture {
    let Value::Object(obj) = value else {
        report.degrade("architecture", DegradationKind::ShapeMismatch, format!("expected object, got {}", kind_of(value)));
        return Architecture::default();
    };
    // Some services wrap the document one level down
    if let Some(inner @ Value::Object(_)) = pick(obj, &["architecture", "blueprint"]) {
        return architecture(report, config, inner);
    }

    Architecture {
        summary: text_of(obj, &["summary", "overview", "description"]),
        entities: pick(obj, &["entities", "models", "data_model", "dataModel", "schemas"])
            .map(|v| entities(report, config, v, "architecture.entities"))
            .unwrap_or_default(),
        endpoints: pick(obj, &["endpoints", "api", "routes", "api_endpoints", "apiEndpoints"])
            .map(|v| endpoints(report, config, v, "architecture.endpoints"))
            .unwrap_or_default(),
        tech_stack: pick(obj, &["tech_stack", "techStack", "stack", "technologies"])
            .map(|v| tech_stack(report, v, "architecture.tech_stack"))
            .unwrap_or_default(),
    }
}

/// Technology stack from a category-keyed object or a list of category records
pub(crate) fn tech_stack(report: &mut Report, value: &Value, location: &str) -> TechStack {
    let mut stack = TechStack::default();
    match value {
        Value::Object(categories) => {
            for (category, entries) in categories {
                let loc = format!("{location}.{category}");
                if let Some(section) = section(report, category, entries, &loc) {
                    stack.insert(category.trim(), section);
                }
            }
        }
        // `[{ "category": "frontend", "technologies": [...] }]`
        Value::Array(records) => {
            for (i, record) in records.iter().enumerate() {
                let loc = format!("{location}[{i}]");
                let parsed = record.as_object().and_then(|r| {
                    let category = text_of(r, &["category", "name", "layer"])?;
                    let entries = pick(r, &["technologies", "items", "tools", "stack", "choices"])?;
                    Some((category, entries))
                });
                match parsed {
                    Some((category, entries)) => {
                        if let Some(section) = section(report, &category, entries, &loc) {
                            stack.insert(category, section);
                        }
                    }
                    None => report.degrade(loc, DegradationKind::ShapeMismatch, "unreadable tech-stack record"),
                }
            }
        }
        Value::Null => {}
        other => report.degrade(
            location,
            DegradationKind::ShapeMismatch,
            format!("expected object of categories, got {}", kind_of(other)),
        ),
    }
    stack
}

fn section(report: &mut Report, category: &str, entries: &Value, location: &str) -> Option<Map<String, Value>> {
    if category.trim().is_empty() {
        report.degrade(location, DegradationKind::MissingName, "tech-stack category without name");
        return None;
    }
    let slots = category_slots(category);
    match entries {
        Value::Object(section) => Some(section.clone()),
        Value::Array(items) => {
            let names: Vec<Value> = items.iter().filter_map(entry_name).map(Value::String).collect();
            Some(positional(slots, names))
        }
        Value::String(_) => {
            let names = as_text(entries).map(Value::String).into_iter().collect();
            Some(positional(slots, names))
        }
        Value::Null => None,
        other => {
            let names = as_string_list(other).into_iter().map(Value::String).collect();
            report.degrade(location, DegradationKind::ShapeMismatch, format!("unexpected {} section", kind_of(other)));
            Some(positional(slots, names))
        }
    }
}

/// Technology name from `"React"` or `{ "name": "React", ... }`
fn entry_name(entry: &Value) -> Option<String> {
    match entry {
        Value::Object(obj) => text_of(obj, &["name", "technology", "tool", "value"]),
        other => as_text(other),
    }
}

fn positional(slots: &[&str], mut names: Vec<Value>) -> Map<String, Value> {
    let mut section = Map::new();
    if slots.is_empty() {
        section.insert(ITEMS_KEY.to_string(), Value::Array(names));
        return section;
    }
    let extra = names.split_off(slots.len().min(names.len()));
    for (slot, name) in slots.iter().zip(names) {
        section.insert((*slot).to_string(), name);
    }
    if !extra.is_empty() {
        section.insert(ADDITIONAL_KEY.to_string(), Value::Array(extra));
    }
    section
}
