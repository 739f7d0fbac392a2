//! Lenient accessors over completion JSON
//!
//! Completion payloads spell the same thing many ways. These helpers read a
//! value under any of several keys and coerce loosely typed scalars.

use serde_json::{Map, Value};

/// First non-null value under any of `keys`
pub(crate) fn pick<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

/// Non-empty trimmed text; numbers and booleans are stringified
pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Boolean from `true`, `"true"`, `"yes"`, `1` and their negatives
pub(crate) fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "on" => Some(true),
            "false" | "no" | "n" | "0" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Non-negative integer from a number or numeric string
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.is_finite()).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| *f >= 0.0 && f.is_finite()).map(|f| f as u64),
        _ => None,
    }
}

/// Float from a number or numeric string
pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Strings from a list, a comma-separated string, or a single scalar
pub(crate) fn as_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(as_text).collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        other => as_text(other).into_iter().collect(),
    }
}

/// Text under any of `keys`
pub(crate) fn text_of(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    pick(obj, keys).and_then(as_text)
}

/// Boolean under any of `keys`
pub(crate) fn bool_of(obj: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    pick(obj, keys).and_then(as_bool)
}

/// Short JSON type name for degradation details
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `userId` from `User`
pub(crate) fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    chars
        .next()
        .map(|c| c.to_lowercase().chain(chars).collect())
        .unwrap_or_default()
}
