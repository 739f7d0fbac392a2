//! Field extraction
//!
//! Turns the declarations found by the tokenizer into canonical [`Field`]s.
//! A value is one of:
//!
//! - a bare type token (`String`, `mongoose.Schema.Types.ObjectId`)
//! - a bracketed list (`[String]`, `[{ type: ObjectId, ref: 'User' }]`)
//! - a descriptor: an object literal with a `type` key, read by [`PROBES`]
//! - a nested structure: any other object literal
//!
//! Nothing here fails. A value that cannot be read becomes a text field and a
//! [`Degradation`] is recorded.

use crate::config::ExtractionConfig;
use crate::degradation::{Degradation, DegradationKind};
use crate::literal::{
    is_identifier, parse_bool_flag, parse_literal, parse_number, parse_number_option, parse_regex,
    unquote,
};
use crate::tokenizer::{find_block, split_declarations, split_items, Split};
use blueprint_model::{CanonicalType, Field, ListItems};
use serde_json::Value;

/// One independent option reader folded over a field
pub struct Probe {
    /// Option name, used in degradation locations
    pub name: &'static str,
    /// Keys that trigger this probe; the first present wins
    pub keys: &'static [&'static str],
    /// Apply the option value to the field
    pub extract: fn(&mut Field, &str) -> Result<(), String>,
}

impl Probe {
    /// Value text this probe reads from a descriptor, if present
    #[inline]
    #[must_use]
    pub fn detect<'a>(&self, descriptor: &Split<'a>) -> Option<&'a str> {
        descriptor.get_any(self.keys)
    }
}

/// Descriptor probes, applied in order
pub static PROBES: &[Probe] = &[
    Probe {
        name: "type",
        keys: &["type"],
        extract: probe_type,
    },
    Probe {
        name: "required",
        keys: &["required"],
        extract: |f, v| flag(v).map(|b| f.required = b),
    },
    Probe {
        name: "unique",
        keys: &["unique"],
        extract: |f, v| flag(v).map(|b| f.unique = b),
    },
    Probe {
        name: "index",
        keys: &["index"],
        extract: probe_index,
    },
    Probe {
        name: "sparse",
        keys: &["sparse"],
        extract: |f, v| flag(v).map(|b| f.sparse = b),
    },
    Probe {
        name: "default",
        keys: &["default"],
        extract: probe_default,
    },
    Probe {
        name: "enum",
        keys: &["enum"],
        extract: probe_enum,
    },
    Probe {
        name: "min",
        keys: &["min"],
        extract: |f, v| number(v).map(|n| f.constraints.min = Some(n)),
    },
    Probe {
        name: "max",
        keys: &["max"],
        extract: |f, v| number(v).map(|n| f.constraints.max = Some(n)),
    },
    Probe {
        name: "minlength",
        keys: &["minlength", "minLength"],
        extract: |f, v| length(v).map(|n| f.constraints.min_length = Some(n)),
    },
    Probe {
        name: "maxlength",
        keys: &["maxlength", "maxLength"],
        extract: |f, v| length(v).map(|n| f.constraints.max_length = Some(n)),
    },
    Probe {
        name: "match",
        keys: &["match"],
        extract: |f, v| {
            let pattern = parse_regex(v).ok_or_else(|| format!("not a pattern: {v}"))?;
            f.constraints.pattern = Some(pattern);
            Ok(())
        },
    },
    Probe {
        name: "trim",
        keys: &["trim"],
        extract: |f, v| flag(v).map(|b| f.constraints.trim = b),
    },
    Probe {
        name: "lowercase",
        keys: &["lowercase"],
        extract: |f, v| flag(v).map(|b| f.constraints.lowercase = b),
    },
    Probe {
        name: "uppercase",
        keys: &["uppercase"],
        extract: |f, v| flag(v).map(|b| f.constraints.uppercase = b),
    },
    Probe {
        name: "select",
        keys: &["select"],
        extract: |f, v| flag(v).map(|b| f.hidden = !b),
    },
    Probe {
        name: "ref",
        keys: &["ref"],
        extract: probe_ref,
    },
    Probe {
        name: "description",
        keys: &["description", "desc"],
        extract: |f, v| {
            f.description = Some(unquote(v).ok_or_else(|| format!("not a string: {v}"))?);
            Ok(())
        },
    },
    Probe {
        name: "example",
        keys: &["example"],
        extract: |f, v| {
            f.example = Some(parse_literal(v).ok_or_else(|| format!("not a literal: {v}"))?);
            Ok(())
        },
    },
];

fn flag(value: &str) -> Result<bool, String> {
    parse_bool_flag(value).ok_or_else(|| format!("not a boolean: {value}"))
}

fn number(value: &str) -> Result<f64, String> {
    parse_number_option(value).ok_or_else(|| format!("not a number: {value}"))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn length(value: &str) -> Result<u64, String> {
    let n = number(value)?;
    if n < 0.0 {
        return Err(format!("negative length: {value}"));
    }
    Ok(n as u64)
}

fn probe_type(field: &mut Field, value: &str) -> Result<(), String> {
    let value = value.trim();
    if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        let element = split_items(inner).first().copied();
        let mut items = ListItems::of(CanonicalType::OpenValue);
        field.field_type = CanonicalType::List;
        if let Some(element) = element {
            if element.starts_with('{') {
                let inner = element.trim_start_matches('{').trim_end_matches('}');
                let descriptor = split_declarations(inner);
                if let Some(ty) = descriptor.get("type") {
                    items.item_type = CanonicalType::normalize(ty);
                }
                if let Some(target) = descriptor.get("ref") {
                    probe_ref(field, target)?;
                }
            } else {
                items.item_type = CanonicalType::normalize(element);
            }
        }
        field.items = Some(items);
        return Ok(());
    }
    if !looks_like_type(value) {
        return Err(format!("unreadable type: {value}"));
    }
    field.field_type = CanonicalType::normalize(value);
    if field.field_type == CanonicalType::List {
        let element = CanonicalType::element_of(value).unwrap_or(CanonicalType::OpenValue);
        field.items = Some(ListItems::of(element));
    }
    Ok(())
}

fn probe_index(field: &mut Field, value: &str) -> Result<(), String> {
    if let Some(b) = parse_bool_flag(value) {
        field.index = b;
        return Ok(());
    }
    // Direction or kind literals (`1`, `-1`, `'text'`) also request an index
    if parse_number(value).is_some() || unquote(value).is_some() {
        field.index = true;
        return Ok(());
    }
    Err(format!("not an index flag: {value}"))
}

fn probe_default(field: &mut Field, value: &str) -> Result<(), String> {
    // Computed defaults are dropped without a report
    field.default = parse_literal(value);
    Ok(())
}

fn probe_enum(field: &mut Field, value: &str) -> Result<(), String> {
    let parsed = parse_literal(value).ok_or_else(|| format!("not a literal: {value}"))?;
    let values = match parsed {
        Value::Array(values) => values,
        Value::Object(mut map) => match map.remove("values") {
            Some(Value::Array(values)) => values,
            _ => return Err("enum object without `values`".to_string()),
        },
        other => vec![other],
    };
    field.enum_values = values;
    Ok(())
}

fn probe_ref(field: &mut Field, value: &str) -> Result<(), String> {
    let value = value.trim();
    let target = unquote(value)
        .or_else(|| is_identifier(value).then(|| value.to_string()))
        .ok_or_else(|| format!("unreadable ref: {value}"))?;
    field.reference = Some(target);
    Ok(())
}

/// Whether a bare value can be read as a type token
fn looks_like_type(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '[' | ']' | '<' | '>' | '\'' | '"' | '?'))
}

/// Stateful extractor collecting degradations as it goes
pub(crate) struct FieldExtractor<'c> {
    config: &'c ExtractionConfig,
    degradations: Vec<Degradation>,
}

impl<'c> FieldExtractor<'c> {
    pub(crate) fn new(config: &'c ExtractionConfig) -> Self {
        Self {
            config,
            degradations: Vec::new(),
        }
    }

    pub(crate) fn into_degradations(self) -> Vec<Degradation> {
        self.degradations
    }

    fn degrade(&mut self, location: impl Into<String>, kind: DegradationKind, detail: impl Into<String>) {
        let record = Degradation::new(location, kind, detail);
        tracing::warn!(
            location = %record.location,
            kind = ?record.kind,
            detail = %record.detail,
            "degraded field extraction"
        );
        self.degradations.push(record);
    }

    /// Fields of an object-literal body
    pub(crate) fn extract_block(&mut self, inner: &str, prefix: Option<&str>, depth: usize) -> Vec<Field> {
        let split = split_declarations(inner);
        for fragment in &split.skipped {
            self.degrade(
                prefix.unwrap_or("<root>"),
                DegradationKind::SkippedFragment,
                format!("no key in fragment `{}`", abbreviate(fragment)),
            );
        }
        split
            .declarations
            .iter()
            .map(|decl| {
                let path = join_path(prefix, decl.key);
                self.extract_value(decl.key, decl.value, &path, depth)
            })
            .collect()
    }

    /// One field from its value text
    pub(crate) fn extract_value(&mut self, name: &str, value: &str, path: &str, depth: usize) -> Field {
        let value = value.trim();
        let mut field = if value.starts_with('[') {
            self.extract_list(name, value, path, depth)
        } else if value.starts_with('{') {
            self.extract_object(name, value, path, depth)
        } else if let Some(open) = nested_schema_body(value) {
            self.extract_object(name, &value[open..], path, depth)
        } else if looks_like_type(value) {
            let mut field = Field::new(name, CanonicalType::normalize(value));
            if field.field_type == CanonicalType::List {
                let element = CanonicalType::element_of(value).unwrap_or(CanonicalType::OpenValue);
                field.items = Some(ListItems::of(element));
            }
            field
        } else {
            self.degrade(path, DegradationKind::MalformedField, format!("unreadable value `{}`", abbreviate(value)));
            Field::text(name)
        };
        field.enforce_reference_type();
        field.sensitive = field.sensitive || self.config.is_sensitive_name(name);
        field
    }

    fn extract_list(&mut self, name: &str, value: &str, path: &str, depth: usize) -> Field {
        let Some(block) = find_block(value, 0).filter(|b| b.terminated) else {
            self.degrade(path, DegradationKind::Unterminated, "list literal not closed");
            return Field::text(name);
        };
        let items = split_items(block.inner(value));
        let Some(first) = items.first() else {
            return Field::list_of(name, CanonicalType::OpenValue);
        };
        if depth >= self.config.max_nesting_depth && first.starts_with(['[', '{']) {
            self.degrade(
                path,
                DegradationKind::DepthExceeded,
                format!("nesting deeper than {}", self.config.max_nesting_depth),
            );
            return Field::list_of(name, CanonicalType::OpenValue);
        }

        let element = self.extract_value(name, first, path, depth + 1);
        let mut field = Field::new(name, CanonicalType::List);
        let item_type = if element.reference_target().is_some() {
            field.reference = element.reference.clone();
            CanonicalType::Reference
        } else if element.is_list() {
            // Nested lists keep only the outer shape
            CanonicalType::List
        } else {
            element.field_type.clone()
        };
        field.items = Some(ListItems::of(item_type));
        field.fields = element.fields;
        field.enum_values = element.enum_values;
        field.constraints = element.constraints;
        field
    }

    fn extract_object(&mut self, name: &str, value: &str, path: &str, depth: usize) -> Field {
        let Some(block) = find_block(value, 0).filter(|b| b.terminated) else {
            self.degrade(path, DegradationKind::Unterminated, "object literal not closed");
            return Field::text(name);
        };
        let inner = block.inner(value);
        if inner.trim().is_empty() {
            return Field::new(name, CanonicalType::OpenValue);
        }

        let split = split_declarations(inner);
        if is_descriptor(&split) {
            return self.apply_probes(name, &split, path, depth);
        }

        if depth >= self.config.max_nesting_depth {
            self.degrade(
                path,
                DegradationKind::DepthExceeded,
                format!("nesting deeper than {}", self.config.max_nesting_depth),
            );
            return Field::new(name, CanonicalType::OpenValue);
        }
        let mut field = Field::new(name, CanonicalType::Structure);
        field.fields = self.extract_block(inner, Some(path), depth + 1);
        field
    }

    fn apply_probes(&mut self, name: &str, descriptor: &Split<'_>, path: &str, depth: usize) -> Field {
        let mut field = Field::text(name);
        for probe in PROBES {
            let Some(value) = probe.detect(descriptor) else {
                continue;
            };
            // Structured element types inside a descriptor list recurse
            if probe.name == "type" && value.starts_with('[') && value[1..].trim_start().starts_with('{') {
                let list = self.extract_list(name, value, path, depth + 1);
                field.field_type = list.field_type;
                field.items = list.items;
                field.fields = list.fields;
                field.reference = list.reference;
                continue;
            }
            if probe.name == "type" && value.starts_with('{') {
                if depth >= self.config.max_nesting_depth {
                    self.degrade(
                        path,
                        DegradationKind::DepthExceeded,
                        format!("nesting deeper than {}", self.config.max_nesting_depth),
                    );
                    field.field_type = CanonicalType::OpenValue;
                    continue;
                }
                let nested = self.extract_object(name, value, path, depth + 1);
                field.field_type = nested.field_type;
                field.fields = nested.fields;
                continue;
            }
            if let Err(detail) = (probe.extract)(&mut field, value) {
                self.degrade(format!("{path}.{}", probe.name), DegradationKind::MalformedField, detail);
            }
        }
        field
    }
}

/// Fields and degradations of an object-literal body
#[must_use]
pub fn extract_fields(block: &str, config: &ExtractionConfig) -> (Vec<Field>, Vec<Degradation>) {
    let mut extractor = FieldExtractor::new(config);
    let fields = extractor.extract_block(block, None, 0);
    (fields, extractor.into_degradations())
}

/// Longest `type: { type: ... }` chain inspected before assuming a descriptor
const TYPE_CHAIN_LIMIT: usize = 16;

/// A `type` key marks a descriptor unless its value is itself a descriptor,
/// in which case the literal is a structure with a field named `type`
fn is_descriptor(split: &Split<'_>) -> bool {
    is_descriptor_within(split, TYPE_CHAIN_LIMIT)
}

fn is_descriptor_within(split: &Split<'_>, budget: usize) -> bool {
    match split.get("type") {
        None => false,
        Some(value) if value.starts_with('{') && budget > 0 => match find_block(value, 0) {
            Some(block) => !is_descriptor_within(&split_declarations(block.inner(value)), budget - 1),
            None => true,
        },
        Some(_) => true,
    }
}

/// Offset of the body of an inline `new Schema({ ... })`
fn nested_schema_body(value: &str) -> Option<usize> {
    if !value.starts_with("new ") {
        return None;
    }
    let call = value.find("Schema(")?;
    let open = call + "Schema(".len();
    let brace = open + value[open..].find(|c: char| !c.is_whitespace())?;
    (value.as_bytes().get(brace) == Some(&b'{')).then_some(brace)
}

fn join_path(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) => format!("{p}.{name}"),
        None => name.to_string(),
    }
}

fn abbreviate(text: &str) -> String {
    const LIMIT: usize = 40;
    if text.chars().count() <= LIMIT {
        text.to_string()
    } else {
        let head: String = text.chars().take(LIMIT).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fields(block: &str) -> (Vec<Field>, Vec<Degradation>) {
        extract_fields(block, &ExtractionConfig::default())
    }

    #[test]
    fn descriptor_probes() {
        let (fields, degradations) = fields(
            "title: { type: String, required: [true, 'Title is required'], trim: true, maxlength: 200 },
             status: { type: String, enum: ['todo', 'in-progress', 'done'], default: 'todo', index: true }",
        );
        assert!(degradations.is_empty());
        let title = &fields[0];
        assert_eq!(title.field_type, CanonicalType::Text);
        assert!(title.required);
        assert!(title.constraints.trim);
        assert_eq!(title.constraints.max_length, Some(200));

        let status = &fields[1];
        assert_eq!(status.enum_values, vec![json!("todo"), json!("in-progress"), json!("done")]);
        assert_eq!(status.default, Some(json!("todo")));
        assert!(status.index);
    }

    #[test]
    fn reference_descriptor_forces_type() {
        let (fields, _) = fields("assignee: { type: String, ref: 'User' }");
        assert_eq!(fields[0].field_type, CanonicalType::Reference);
        assert_eq!(fields[0].reference_target(), Some("User"));
    }

    #[test]
    fn list_of_references() {
        let (fields, _) = fields("members: [{ type: mongoose.Schema.Types.ObjectId, ref: 'User' }]");
        let members = &fields[0];
        assert_eq!(members.field_type, CanonicalType::Reference);
        assert!(members.is_list());
        assert_eq!(members.items.as_ref().unwrap().item_type, CanonicalType::Reference);
        assert_eq!(members.reference_target(), Some("User"));
    }

    #[test]
    fn descriptor_with_list_type() {
        let (fields, _) = fields("tags: { type: [String], default: [] }, ids: { type: [{ type: ObjectId, ref: 'Tag' }] }");
        assert_eq!(fields[0].field_type, CanonicalType::List);
        assert_eq!(fields[0].items.as_ref().unwrap().item_type, CanonicalType::Text);
        assert_eq!(fields[0].default, Some(json!([])));
        assert_eq!(fields[1].field_type, CanonicalType::Reference);
        assert_eq!(fields[1].reference_target(), Some("Tag"));
    }

    #[test]
    fn bare_tokens() {
        let (fields, _) = fields("a: String, b: [Number], c: Schema.Types.Mixed, d: {}, e: Buffer");
        let types: Vec<_> = fields.iter().map(|f| f.field_type.clone()).collect();
        assert_eq!(
            types,
            vec![
                CanonicalType::Text,
                CanonicalType::List,
                CanonicalType::OpenValue,
                CanonicalType::OpenValue,
                CanonicalType::Binary
            ]
        );
        assert_eq!(fields[1].items.as_ref().unwrap().item_type, CanonicalType::Number);
    }

    #[test]
    fn nested_structure() {
        let (fields, _) = fields("address: { street: String, city: { type: String, required: true } }");
        let address = &fields[0];
        assert_eq!(address.field_type, CanonicalType::Structure);
        assert_eq!(address.fields.len(), 2);
        assert!(address.fields[1].required);
    }

    #[test]
    fn field_named_type_is_structure() {
        let (fields, _) = fields("meta: { type: { type: String }, label: String }");
        assert_eq!(fields[0].field_type, CanonicalType::Structure);
        assert_eq!(fields[0].fields[0].name, "type");
    }

    #[test]
    fn type_key_inside_descriptor_structure() {
        let (fields, _) = fields("addr: { type: { type: { type: String }, city: String }, required: true }");
        let addr = &fields[0];
        assert_eq!(addr.field_type, CanonicalType::Structure);
        assert!(addr.required);
        let names: Vec<_> = addr.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["type", "city"]);
    }

    #[test]
    fn deep_list_nesting_degrades() {
        let depth = 500;
        let block = format!("grid: {}String{}, ok: Number", "[".repeat(depth), "]".repeat(depth));
        let (fields, degradations) = fields(&block);
        assert_eq!(fields.len(), 2);
        assert!(fields[0].is_list());
        assert_eq!(degradations.len(), 1);
        assert_eq!(degradations[0].kind, DegradationKind::DepthExceeded);
        assert_eq!(degradations[0].location, "grid");
    }

    #[test]
    fn long_type_chains_terminate() {
        let depth = 300;
        let block = format!("chain: {}{{ city: String }}{}", "{ type: ".repeat(depth), " }".repeat(depth));
        let (fields, degradations) = fields(&block);
        assert_eq!(fields.len(), 1);
        assert!(degradations.iter().any(|d| d.kind == DegradationKind::DepthExceeded));
    }

    #[test]
    fn computed_default_is_dropped() {
        let (fields, degradations) = fields("dueDate: { type: Date, default: Date.now }");
        assert_eq!(fields[0].field_type, CanonicalType::Date);
        assert_eq!(fields[0].default, None);
        assert!(degradations.is_empty());
    }

    #[test]
    fn malformed_value_degrades_to_text() {
        let (fields, degradations) = fields("weird: () => 5, ok: Number");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0], Field::text("weird"));
        assert_eq!(degradations.len(), 1);
        assert_eq!(degradations[0].kind, DegradationKind::MalformedField);
        assert_eq!(degradations[0].location, "weird");
    }

    #[test]
    fn depth_limit() {
        let config = ExtractionConfig::default().with_max_nesting_depth(1);
        let (fields, degradations) = extract_fields("a: { b: { c: String } }", &config);
        assert_eq!(fields[0].fields[0].field_type, CanonicalType::OpenValue);
        assert_eq!(degradations[0].kind, DegradationKind::DepthExceeded);
        assert_eq!(degradations[0].location, "a.b");
    }

    #[test]
    fn select_false_hides_and_sensitive_names() {
        let (fields, _) = fields("passwordHash: { type: String, select: false }");
        assert!(fields[0].hidden);
        assert!(fields[0].sensitive);
    }

    #[test]
    fn regex_and_enum_object() {
        let (fields, _) = fields(
            r"email: { type: String, match: [/^\S+@\S+$/, 'bad email'], lowercase: true },
              role: { type: String, enum: { values: ['a', 'b'], message: 'nope' } }",
        );
        assert_eq!(fields[0].constraints.pattern.as_deref(), Some(r"^\S+@\S+$"));
        assert!(fields[0].constraints.lowercase);
        assert_eq!(fields[1].enum_values.len(), 2);
    }

    #[test]
    fn inline_nested_schema() {
        let (fields, _) = fields("profile: new mongoose.Schema({ bio: String, age: Number })");
        assert_eq!(fields[0].field_type, CanonicalType::Structure);
        assert_eq!(fields[0].fields.len(), 2);
    }

    #[test]
    fn probe_names_are_unique() {
        let mut names: Vec<_> = PROBES.iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), PROBES.len());
    }
}
