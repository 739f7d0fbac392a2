//! Index and timestamp detection
//!
//! Both read the whole source rather than the field block: compound indexes
//! are declared by calls after the schema, and the timestamp policy lives in
//! the schema options or a later `set` call.

use crate::literal::{parse_bool_flag, unquote};
use crate::tokenizer::{find_block, skip_ws, split_declarations, top_level_objects, Split};
use blueprint_model::{
    Field, Index, IndexDirection, IndexField, TimestampPolicy, DEFAULT_CREATED_AT, DEFAULT_UPDATED_AT,
};
use once_cell::sync::Lazy;
use regex::Regex;

static SCHEMA_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bSchema\s*\(").expect("static regex"));

static TIMESTAMPS_SET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\.set\(\s*['"]timestamps['"]\s*,\s*(true|false)\s*\)"#).expect("static regex")
});

/// Every `<schema_ident>.index({...}, {...})` call in the source
#[must_use]
pub fn extract_indexes(source: &str, schema_ident: &str) -> Vec<Index> {
    let pattern = format!(r"\b{}\s*\.\s*index\s*\(", regex::escape(schema_ident));
    let Ok(call) = Regex::new(&pattern) else {
        return Vec::new();
    };

    let mut indexes = Vec::new();
    for m in call.find_iter(source) {
        let keys_at = skip_ws(source, m.end());
        let Some(keys) = find_block(source, keys_at).filter(|b| b.terminated) else {
            continue;
        };
        if source.as_bytes()[keys_at] != b'{' {
            continue;
        }
        let fields: Vec<IndexField> = split_declarations(keys.inner(source))
            .declarations
            .iter()
            .map(|d| IndexField {
                name: d.key.to_string(),
                direction: IndexDirection::from_literal(d.value),
            })
            .collect();
        if fields.is_empty() {
            continue;
        }

        let mut index = Index {
            name: None,
            fields,
            unique: false,
            sparse: false,
            field_level: false,
        };

        let after = skip_ws(source, keys.end());
        if source.as_bytes().get(after) == Some(&b',') {
            let opts_at = skip_ws(source, after + 1);
            if source.as_bytes().get(opts_at) == Some(&b'{') {
                if let Some(opts) = find_block(source, opts_at).filter(|b| b.terminated) {
                    let opts = split_declarations(opts.inner(source));
                    index.unique = opts.get("unique").and_then(parse_bool_flag).unwrap_or(false);
                    index.sparse = opts.get("sparse").and_then(parse_bool_flag).unwrap_or(false);
                    index.name = opts.get("name").and_then(unquote);
                }
            }
        }
        indexes.push(index);
    }
    indexes
}

/// Add single-field indexes for fields flagged `unique` or `index`
///
/// Skipped when an index over exactly that field already exists.
pub fn apply_field_level_indexes(fields: &[Field], indexes: &mut Vec<Index>) {
    for field in fields.iter().filter(|f| f.unique || f.index) {
        if indexes.iter().any(|i| i.keys_exactly(&[field.name.as_str()])) {
            continue;
        }
        let mut index = Index::on([field.name.clone()]);
        index.unique = field.unique;
        index.sparse = field.sparse;
        index.field_level = true;
        indexes.push(index);
    }
}

/// Timestamp policy from the schema options
///
/// Only a `timestamps` key at the top level of an options literal counts:
/// the second argument of a schema constructor, or else a standalone object
/// literal such as `const options = { timestamps: true }`. A key of that name
/// inside a field block is a field. `<schema>.set('timestamps', true)` is
/// honoured last.
#[must_use]
pub fn detect_timestamps(source: &str) -> TimestampPolicy {
    let from_constructor = SCHEMA_CALL
        .find_iter(source)
        .filter_map(|m| constructor_options(source, m.end()))
        .find_map(|opts| policy_of(opts.get("timestamps")?));
    if let Some(policy) = from_constructor {
        return policy;
    }

    let from_literal = top_level_objects(source)
        .iter()
        .find_map(|block| policy_of(split_declarations(block.inner(source)).get("timestamps")?));
    if let Some(policy) = from_literal {
        return policy;
    }

    match TIMESTAMPS_SET.captures(source) {
        Some(caps) if &caps[1] == "true" => TimestampPolicy::enabled(),
        _ => TimestampPolicy::default(),
    }
}

/// Declarations of the options literal following the field block of a
/// constructor call whose argument list starts at `args`
fn constructor_options(source: &str, args: usize) -> Option<Split<'_>> {
    let fields_at = skip_ws(source, args);
    let fields = find_block(source, fields_at).filter(|b| b.terminated && source.as_bytes()[fields_at] == b'{')?;
    let comma = skip_ws(source, fields.end());
    if source.as_bytes().get(comma) != Some(&b',') {
        return None;
    }
    let opts_at = skip_ws(source, comma + 1);
    if source.as_bytes().get(opts_at) != Some(&b'{') {
        return None;
    }
    let opts = find_block(source, opts_at).filter(|b| b.terminated)?;
    Some(split_declarations(opts.inner(source)))
}

/// Policy from a `timestamps` option value
///
/// An object with its own `type` key is a field descriptor, not the option.
fn policy_of(value: &str) -> Option<TimestampPolicy> {
    if let Some(flag) = parse_bool_flag(value) {
        return Some(if flag { TimestampPolicy::enabled() } else { TimestampPolicy::default() });
    }
    let block = find_block(value, 0).filter(|b| b.terminated && value.starts_with('{'))?;
    let opts = split_declarations(block.inner(value));
    if opts.has("type") {
        return None;
    }
    Some(TimestampPolicy::with_names(
        side(opts.get("createdAt"), DEFAULT_CREATED_AT),
        side(opts.get("updatedAt"), DEFAULT_UPDATED_AT),
    ))
}

/// One side of an override: missing keeps the default name, `false` disables
fn side(value: Option<&str>, default: &str) -> Option<String> {
    match value {
        None => Some(default.to_string()),
        Some(v) => match parse_bool_flag(v) {
            Some(true) => Some(default.to_string()),
            Some(false) => None,
            None => unquote(v).or_else(|| Some(default.to_string())),
        },
    }
}
