//! Declaration source generation
//!
//! Renders a canonical [`Entity`] back into primary-dialect schema source.
//! Output is deterministic: attributes are always written in [`ATTRIBUTE_ORDER`].
//! Anything outside the canonical attribute set is not rendered.

use crate::literal::{quote, render_key, render_literal, render_number};
use blueprint_model::{CanonicalType, Entity, Field, Index, TimestampPolicy};

/// Order in which descriptor attributes are written
pub const ATTRIBUTE_ORDER: &[&str] = &[
    "type",
    "required",
    "unique",
    "index",
    "sparse",
    "default",
    "enum",
    "ref",
    "trim",
    "lowercase",
    "uppercase",
    "min",
    "max",
    "minlength",
    "maxlength",
    "match",
    "select",
];

const INDENT: &str = "  ";

/// Renders entities as schema declaration source
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeGenerator;

impl CodeGenerator {
    /// Create generator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Render an entity
    #[must_use]
    pub fn generate(&self, entity: &Entity) -> String {
        let schema_var = schema_variable(&entity.name);
        let mut out = String::from("const mongoose = require('mongoose');\n\n");

        out.push_str(&format!("const {schema_var} = new mongoose.Schema({{\n"));
        for field in &entity.fields {
            out.push_str(&format!("{INDENT}{},\n", render_field(field, 1)));
        }
        if let Some(marker) = entity.soft_delete.field.as_deref().filter(|_| entity.soft_delete.enabled) {
            if entity.field(marker).is_none() {
                out.push_str(&format!("{INDENT}{}: {{ type: Date, default: null }},\n", render_key(marker)));
            }
        }
        out.push('}');

        let options = schema_options(entity);
        if !options.is_empty() {
            out.push_str(&format!(", {{ {} }}", options.join(", ")));
        }
        out.push_str(");\n");

        let declared: Vec<&Index> = entity.indexes.iter().filter(|i| !i.field_level).collect();
        if !declared.is_empty() {
            out.push('\n');
            for index in declared {
                out.push_str(&format!("{schema_var}.index({});\n", render_index(index)));
            }
        }

        out.push_str(&format!(
            "\nmodule.exports = mongoose.model({}, {schema_var});\n",
            quote(&entity.name)
        ));
        out
    }
}

/// `taskSchema` for `Task`
fn schema_variable(name: &str) -> String {
    let ident: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) if !first.is_ascii_digit() => {
            format!("{}{}Schema", first.to_ascii_lowercase(), chars.as_str())
        }
        _ => "entitySchema".to_string(),
    }
}

fn schema_options(entity: &Entity) -> Vec<String> {
    let mut options = Vec::new();
    if let Some(ts) = render_timestamps(&entity.timestamps) {
        options.push(format!("timestamps: {ts}"));
    }
    if let Some(collection) = &entity.collection {
        options.push(format!("collection: {}", quote(collection)));
    }
    options
}

fn render_timestamps(policy: &TimestampPolicy) -> Option<String> {
    if !policy.is_enabled() {
        return None;
    }
    if policy.uses_default_names() {
        return Some("true".to_string());
    }
    let side = |name: &Option<String>| name.as_deref().map_or_else(|| "false".to_string(), quote);
    Some(format!(
        "{{ createdAt: {}, updatedAt: {} }}",
        side(&policy.created_at),
        side(&policy.updated_at)
    ))
}

fn render_index(index: &Index) -> String {
    let keys: Vec<String> = index
        .fields
        .iter()
        .map(|f| format!("{}: {}", render_key(&f.name), f.direction.as_literal()))
        .collect();
    let mut options = Vec::new();
    if index.unique {
        options.push("unique: true".to_string());
    }
    if index.sparse {
        options.push("sparse: true".to_string());
    }
    if let Some(name) = &index.name {
        options.push(format!("name: {}", quote(name)));
    }
    if options.is_empty() {
        format!("{{ {} }}", keys.join(", "))
    } else {
        format!("{{ {} }}, {{ {} }}", keys.join(", "), options.join(", "))
    }
}

fn render_field(field: &Field, depth: usize) -> String {
    format!("{}: {}", render_key(&field.name), render_value(field, depth))
}

fn render_value(field: &Field, depth: usize) -> String {
    if field.is_list() {
        let list = format!("[{}]", list_element(field, depth));
        let attrs = attributes(field, false);
        return if attrs.is_empty() {
            list
        } else {
            descriptor(std::iter::once(("type", list)).chain(attrs))
        };
    }
    if field.field_type == CanonicalType::Structure && !field.fields.is_empty() {
        let body = nested(&field.fields, depth);
        // Attributes on a structure need the `{ type: { ... } }` form
        let attrs = attributes(field, false);
        return if attrs.is_empty() {
            body
        } else {
            descriptor(std::iter::once(("type", body)).chain(attrs))
        };
    }
    let attrs = attributes(field, true);
    match attrs.as_slice() {
        [(name, token)] if *name == "type" => token.clone(),
        _ => descriptor(attrs),
    }
}

fn list_element(field: &Field, depth: usize) -> String {
    if let Some(target) = field.reference_target() {
        return format!("{{ type: {}, ref: {} }}", type_token(&CanonicalType::Reference), quote(target));
    }
    if !field.fields.is_empty() {
        let body = nested(&field.fields, depth);
        let list_of_lists = field.items.as_ref().is_some_and(|i| i.item_type == CanonicalType::List);
        return if list_of_lists { format!("[{body}]") } else { body };
    }
    let element = field
        .items
        .as_ref()
        .map_or(CanonicalType::OpenValue, |i| i.item_type.clone());
    type_token(&element)
}

fn nested(fields: &[Field], depth: usize) -> String {
    let inner = INDENT.repeat(depth + 1);
    let outer = INDENT.repeat(depth);
    let mut out = String::from("{\n");
    for sub in fields {
        let mut value = render_value(sub, depth + 1);
        // A bare `type: X` would turn the enclosing literal into a descriptor
        if sub.name == "type" && !value.starts_with("{ type: ") {
            value = format!("{{ type: {value} }}");
        }
        out.push_str(&format!("{inner}{}: {value},\n", render_key(&sub.name)));
    }
    out.push_str(&outer);
    out.push('}');
    out
}

fn descriptor<'a>(attrs: impl IntoIterator<Item = (&'a str, String)>) -> String {
    let parts: Vec<String> = attrs.into_iter().map(|(k, v)| format!("{k}: {v}")).collect();
    format!("{{ {} }}", parts.join(", "))
}

/// Source token for a canonical type
fn type_token(ty: &CanonicalType) -> String {
    match ty {
        CanonicalType::Reference => "mongoose.Schema.Types.ObjectId".to_string(),
        CanonicalType::OpenValue => "mongoose.Schema.Types.Mixed".to_string(),
        CanonicalType::Decimal => "mongoose.Schema.Types.Decimal128".to_string(),
        CanonicalType::Uuid => "mongoose.Schema.Types.UUID".to_string(),
        other => other.as_str().to_string(),
    }
}

/// Attributes in [`ATTRIBUTE_ORDER`]; list fields carry type and ref in the element
fn attributes(field: &Field, scalar: bool) -> Vec<(&'static str, String)> {
    let c = &field.constraints;
    let mut attrs = Vec::new();
    for &key in ATTRIBUTE_ORDER {
        let value = match key {
            "type" if scalar => Some(type_token(&field.field_type)),
            "required" => field.required.then(|| "true".to_string()),
            "unique" => field.unique.then(|| "true".to_string()),
            "index" => field.index.then(|| "true".to_string()),
            "sparse" => field.sparse.then(|| "true".to_string()),
            "default" => field.default.as_ref().map(render_literal),
            "enum" if !field.enum_values.is_empty() => {
                Some(render_literal(&serde_json::Value::Array(field.enum_values.clone())))
            }
            "ref" if scalar => field.reference_target().map(quote),
            "trim" => c.trim.then(|| "true".to_string()),
            "lowercase" => c.lowercase.then(|| "true".to_string()),
            "uppercase" => c.uppercase.then(|| "true".to_string()),
            "min" => c.min.map(render_number),
            "max" => c.max.map(render_number),
            "minlength" => c.min_length.map(|n| n.to_string()),
            "maxlength" => c.max_length.map(|n| n.to_string()),
            "match" => c.pattern.as_deref().map(render_pattern),
            "select" => field.hidden.then(|| "false".to_string()),
            _ => None,
        };
        if let Some(value) = value {
            attrs.push((key, value));
        }
    }
    attrs
}

fn render_pattern(pattern: &str) -> String {
    if pattern.is_empty() {
        return "new RegExp('')".to_string();
    }
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('/');
    let mut escaped = false;
    for c in pattern.chars() {
        if c == '/' && !escaped {
            out.push('\\');
        }
        escaped = c == '\\' && !escaped;
        out.push(c);
    }
    out.push('/');
    out
}
