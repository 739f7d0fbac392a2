//! Secondary indexes

use serde::{Deserialize, Serialize};

/// Direction or kind of one index key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexDirection {
    /// Ascending (`1`)
    #[default]
    Ascending,
    /// Descending (`-1`)
    Descending,
    /// Full-text (`'text'`)
    Text,
    /// Hashed (`'hashed'`)
    Hashed,
    /// Geospatial (`'2dsphere'`)
    Geo,
}

impl IndexDirection {
    /// Parse the value side of an index key literal
    ///
    /// Unrecognised values read as ascending.
    #[must_use]
    pub fn from_literal(value: &str) -> Self {
        let value = value.trim().trim_matches(|c| c == '\'' || c == '"' || c == '`');
        match value.to_ascii_lowercase().as_str() {
            "-1" | "desc" | "descending" => Self::Descending,
            "text" => Self::Text,
            "hashed" => Self::Hashed,
            "2dsphere" | "2d" => Self::Geo,
            _ => Self::Ascending,
        }
    }

    /// Literal form in declaration source
    #[must_use]
    pub fn as_literal(&self) -> &'static str {
        match self {
            Self::Ascending => "1",
            Self::Descending => "-1",
            Self::Text => "'text'",
            Self::Hashed => "'hashed'",
            Self::Geo => "'2dsphere'",
        }
    }
}

/// One key of an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexField {
    /// Field name (dotted for nested paths)
    pub name: String,
    /// Key direction
    #[serde(default)]
    pub direction: IndexDirection,
}

/// Secondary index over one or more fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Optional index name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Ordered keys
    pub fields: Vec<IndexField>,

    /// Unique index
    #[serde(default)]
    pub unique: bool,

    /// Sparse index
    #[serde(default)]
    pub sparse: bool,

    /// Defaulted from a field's own unique/index flag
    #[serde(default)]
    pub field_level: bool,
}

impl Index {
    /// Ascending index over `names`
    #[must_use]
    pub fn on<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            fields: names
                .into_iter()
                .map(|n| IndexField {
                    name: n.into(),
                    direction: IndexDirection::Ascending,
                })
                .collect(),
            unique: false,
            sparse: false,
            field_level: false,
        }
    }

    /// Mark unique
    #[inline]
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Field names in key order
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Whether this index keys exactly `names`, in order
    #[must_use]
    pub fn keys_exactly(&self, names: &[&str]) -> bool {
        self.field_names() == names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_literals() {
        assert_eq!(IndexDirection::from_literal("-1"), IndexDirection::Descending);
        assert_eq!(IndexDirection::from_literal("'text'"), IndexDirection::Text);
        assert_eq!(IndexDirection::from_literal("1"), IndexDirection::Ascending);
        assert_eq!(IndexDirection::from_literal("whatever"), IndexDirection::Ascending);
        assert_eq!(IndexDirection::Geo.as_literal(), "'2dsphere'");
    }

    #[test]
    fn index_keys() {
        let idx = Index::on(["project", "status"]).unique();
        assert!(idx.unique);
        assert!(idx.keys_exactly(&["project", "status"]));
        assert!(!idx.keys_exactly(&["status", "project"]));
    }
}
