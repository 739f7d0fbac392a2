//! Canonical field types
//!
//! Every dialect and every completion payload funnels its loosely written type
//! tokens through [`CanonicalType::normalize`]. The tag set is fixed; tokens
//! the alias table does not know survive as a capitalized [`CanonicalType::Other`]
//! so extraction degrades instead of failing on unfamiliar dialects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical type tag of a field
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CanonicalType {
    /// Free text
    #[default]
    Text,
    /// Any numeric value
    Number,
    /// True/false
    Boolean,
    /// Date or timestamp
    Date,
    /// Identifier referencing another entity
    Reference,
    /// Raw bytes
    Binary,
    /// Ordered list; element type lives on the field's list descriptor
    List,
    /// Nested structure with its own sub-fields
    Structure,
    /// Schemaless value
    OpenValue,
    /// String-keyed map
    Map,
    /// High-precision decimal
    Decimal,
    /// UUID value
    Uuid,
    /// Unknown token, passed through capitalized
    Other(String),
}

/// Alias table: lower-cased token -> canonical tag
const ALIASES: &[(&str, CanonicalType)] = &[
    ("string", CanonicalType::Text),
    ("str", CanonicalType::Text),
    ("text", CanonicalType::Text),
    ("varchar", CanonicalType::Text),
    ("char", CanonicalType::Text),
    ("email", CanonicalType::Text),
    ("url", CanonicalType::Text),
    ("number", CanonicalType::Number),
    ("int", CanonicalType::Number),
    ("integer", CanonicalType::Number),
    ("float", CanonicalType::Number),
    ("double", CanonicalType::Number),
    ("long", CanonicalType::Number),
    ("short", CanonicalType::Number),
    ("bigint", CanonicalType::Number),
    ("numeric", CanonicalType::Number),
    ("boolean", CanonicalType::Boolean),
    ("bool", CanonicalType::Boolean),
    ("date", CanonicalType::Date),
    ("datetime", CanonicalType::Date),
    ("timestamp", CanonicalType::Date),
    ("time", CanonicalType::Date),
    ("objectid", CanonicalType::Reference),
    ("ref", CanonicalType::Reference),
    ("reference", CanonicalType::Reference),
    ("foreignkey", CanonicalType::Reference),
    ("id", CanonicalType::Reference),
    ("buffer", CanonicalType::Binary),
    ("binary", CanonicalType::Binary),
    ("bytes", CanonicalType::Binary),
    ("blob", CanonicalType::Binary),
    ("array", CanonicalType::List),
    ("list", CanonicalType::List),
    ("object", CanonicalType::Structure),
    ("struct", CanonicalType::Structure),
    ("embedded", CanonicalType::Structure),
    ("subdocument", CanonicalType::Structure),
    ("mixed", CanonicalType::OpenValue),
    ("any", CanonicalType::OpenValue),
    ("json", CanonicalType::OpenValue),
    ("unknown", CanonicalType::OpenValue),
    ("map", CanonicalType::Map),
    ("record", CanonicalType::Map),
    ("dictionary", CanonicalType::Map),
    ("decimal128", CanonicalType::Decimal),
    ("decimal", CanonicalType::Decimal),
    ("money", CanonicalType::Decimal),
    ("uuid", CanonicalType::Uuid),
    ("guid", CanonicalType::Uuid),
];

impl CanonicalType {
    /// Normalize a loosely written type token
    ///
    /// Bracketed (`[String]`), suffixed (`String[]`) and generic (`Array<String>`)
    /// list spellings all yield [`CanonicalType::List`]; use
    /// [`CanonicalType::element_of`] for the element type. Namespaces such as
    /// `mongoose.Schema.Types.` are ignored. Never fails.
    #[must_use]
    pub fn normalize(token: &str) -> Self {
        let token = strip_token(token);
        if token.is_empty() {
            return Self::Text;
        }
        if list_inner(token).is_some() {
            return Self::List;
        }

        let bare = token.rsplit('.').next().unwrap_or(token).trim();
        if bare.is_empty() {
            return Self::Text;
        }
        if list_inner(bare).is_some() {
            return Self::List;
        }
        let lowered = bare.to_ascii_lowercase();
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == lowered)
            .map_or_else(|| Self::Other(capitalize(bare)), |(_, ty)| ty.clone())
    }

    /// Element type of a list token, if the token spells a list
    ///
    /// `[]` and `Array<>` have an open-value element.
    #[must_use]
    pub fn element_of(token: &str) -> Option<Self> {
        let inner = list_inner(strip_token(token))?;
        let inner = inner.trim();
        if inner.is_empty() {
            Some(Self::OpenValue)
        } else {
            Some(Self::normalize(inner))
        }
    }

    /// Canonical tag string
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "String",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
            Self::Reference => "ObjectId",
            Self::Binary => "Buffer",
            Self::List => "Array",
            Self::Structure => "Object",
            Self::OpenValue => "Mixed",
            Self::Map => "Map",
            Self::Decimal => "Decimal128",
            Self::Uuid => "UUID",
            Self::Other(name) => name,
        }
    }

    /// Whether this is one of the fixed tags (not a pass-through)
    #[inline]
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for CanonicalType {
    fn from(value: String) -> Self {
        Self::normalize(&value)
    }
}

impl From<&str> for CanonicalType {
    fn from(value: &str) -> Self {
        Self::normalize(value)
    }
}

impl From<CanonicalType> for String {
    fn from(value: CanonicalType) -> Self {
        value.as_str().to_string()
    }
}

fn strip_token(token: &str) -> &str {
    token
        .trim()
        .trim_matches(|c| c == '\'' || c == '"' || c == '`')
        .trim_end_matches('?')
        .trim()
}

/// Inner text of a list spelling, if `token` is one
fn list_inner(token: &str) -> Option<&str> {
    if let Some(rest) = token.strip_prefix('[') {
        return rest.strip_suffix(']');
    }
    if let Some(rest) = token.strip_suffix("[]") {
        return Some(rest);
    }
    let lowered = token.to_ascii_lowercase();
    if lowered.starts_with("array<") && token.ends_with('>') {
        return Some(&token["array<".len()..token.len() - 1]);
    }
    None
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
