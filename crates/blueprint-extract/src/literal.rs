//! Literal values in declaration source
//!
//! Reads and writes the small literal subset schema declarations use for
//! defaults, enums and option values. Anything computed (calls, arrow
//! functions, identifiers such as `Date.now`) is not a literal and reads as
//! `None`.

use crate::tokenizer::{split_declarations, split_items};
use serde_json::{Map, Number, Value};

/// Parse a literal into JSON
#[must_use]
pub fn parse_literal(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match text {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" => return Some(Value::Null),
        _ => {}
    }
    if let Some(s) = unquote(text) {
        return Some(Value::String(s));
    }
    if let Some(n) = parse_number(text) {
        return number_value(n);
    }
    if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        return split_items(inner)
            .into_iter()
            .map(parse_literal)
            .collect::<Option<Vec<_>>>()
            .map(Value::Array);
    }
    if let Some(inner) = text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        let split = split_declarations(inner);
        if !split.skipped.is_empty() {
            return None;
        }
        let mut map = Map::new();
        for decl in split.declarations {
            map.insert(decl.key.to_string(), parse_literal(decl.value)?);
        }
        return Some(Value::Object(map));
    }
    None
}

/// Parse a numeric literal
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let first = text.chars().next()?;
    if !(first.is_ascii_digit() || first == '-' || first == '+' || first == '.') {
        return None;
    }
    text.replace('_', "").parse::<f64>().ok().filter(|n| n.is_finite())
}

/// JSON number, integral when the value has no fraction
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn number_value(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        return Some(Value::Number(Number::from(n as i64)));
    }
    Number::from_f64(n).map(Value::Number)
}

/// Read a boolean option
///
/// Accepts `true`/`false` and the array form `[true, 'message']`, whose first
/// element is the flag.
#[must_use]
pub fn parse_bool_flag(text: &str) -> Option<bool> {
    let text = text.trim();
    match text {
        "true" => Some(true),
        "false" => Some(false),
        _ => {
            let inner = text.strip_prefix('[')?.strip_suffix(']')?;
            split_items(inner).first().and_then(|first| parse_bool_flag(first))
        }
    }
}

/// Read a numeric option, including the array form `[5, 'message']`
#[must_use]
pub fn parse_number_option(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        return split_items(inner).first().and_then(|first| parse_number(first));
    }
    parse_number(text)
}

/// Read a regex option: a `/pattern/flags` literal, a quoted pattern, or the
/// array form `[/pattern/, 'message']`
#[must_use]
pub fn parse_regex(text: &str) -> Option<String> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix('/') {
        let close = rest.rfind('/')?;
        return Some(rest[..close].replace("\\/", "/"));
    }
    if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        return split_items(inner).first().and_then(|first| parse_regex(first));
    }
    if let Some(inner) = text
        .strip_prefix("new RegExp(")
        .and_then(|t| t.strip_suffix(')'))
    {
        return split_items(inner).first().and_then(|first| unquote(first));
    }
    unquote(text)
}

/// Remove matching quotes, resolving simple escapes
#[must_use]
pub fn unquote(text: &str) -> Option<String> {
    let text = text.trim();
    let quote = text.chars().next()?;
    if !matches!(quote, '\'' | '"' | '`') || text.len() < 2 || !text.ends_with(quote) {
        return None;
    }
    let body = &text[1..text.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else if c == quote {
            // Unescaped inner quote: two adjacent literals, not one
            return None;
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Quote a string as a single-quoted literal
#[must_use]
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Whether `key` can be written unquoted
#[must_use]
pub fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Object key, quoted only when needed
#[must_use]
pub fn render_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        quote(key)
    }
}

/// Render a number the way declaration source writes it
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Render JSON as a declaration-source literal
#[must_use]
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.as_f64().map_or_else(|| n.to_string(), render_number),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(render_literal).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(map) => {
            if map.is_empty() {
                return "{}".to_string();
            }
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", render_key(k), render_literal(v)))
                .collect();
            format!("{{ {} }}", parts.join(", "))
        }
    }
}
