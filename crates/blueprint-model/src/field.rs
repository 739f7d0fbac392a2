//! Canonical field
//!
//! A [`Field`] is the dialect-independent description of one attribute of an
//! entity. Whatever produced it (declaration source, completion JSON, manual
//! edit), a field carrying a reference target always has type
//! [`CanonicalType::Reference`]; see [`Field::enforce_reference_type`].

use crate::types::CanonicalType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One attribute of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name as declared
    pub name: String,

    /// Canonical type
    #[serde(rename = "type")]
    pub field_type: CanonicalType,

    /// Value must be present
    #[serde(default)]
    pub required: bool,

    /// Value must be unique across records
    #[serde(default)]
    pub unique: bool,

    /// Field carries a secondary index
    #[serde(default)]
    pub index: bool,

    /// Index skips records without the field
    #[serde(default)]
    pub sparse: bool,

    /// Literal default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Type-appropriate constraints
    #[serde(default, skip_serializing_if = "FieldConstraints::is_empty")]
    pub constraints: FieldConstraints,

    /// Allowed values
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,

    /// Target entity when this field is a foreign key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Sub-fields of a structure (or of list elements that are structures)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,

    /// List element descriptor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ListItems>,

    /// Example value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,

    /// Human description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Holds sensitive data (credentials, secrets)
    #[serde(default)]
    pub sensitive: bool,

    /// Excluded from default projections
    #[serde(default)]
    pub hidden: bool,
}

/// Constraints on a field's value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraints {
    /// Trim surrounding whitespace
    #[serde(default)]
    pub trim: bool,
    /// Store lower-cased
    #[serde(default)]
    pub lowercase: bool,
    /// Store upper-cased
    #[serde(default)]
    pub uppercase: bool,
    /// Minimum text length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    /// Maximum text length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// Regular expression the text must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Minimum numeric value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum numeric value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FieldConstraints {
    /// True when no constraint is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Element descriptor of a list field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItems {
    /// Element type
    #[serde(rename = "type")]
    pub item_type: CanonicalType,
    /// Minimum element count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    /// Maximum element count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
}

impl ListItems {
    /// Unbounded list of `item_type`
    #[inline]
    #[must_use]
    pub fn of(item_type: CanonicalType) -> Self {
        Self {
            item_type,
            min_items: None,
            max_items: None,
        }
    }
}

impl Field {
    /// Create a field with no flags or constraints
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: CanonicalType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            unique: false,
            index: false,
            sparse: false,
            default: None,
            constraints: FieldConstraints::default(),
            enum_values: Vec::new(),
            reference: None,
            fields: Vec::new(),
            items: None,
            example: None,
            description: None,
            sensitive: false,
            hidden: false,
        }
    }

    /// Minimal text field, the shape degraded fragments fall back to
    #[inline]
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, CanonicalType::Text)
    }

    /// List field with the given element type
    #[must_use]
    pub fn list_of(name: impl Into<String>, item_type: CanonicalType) -> Self {
        let mut field = Self::new(name, CanonicalType::List);
        field.items = Some(ListItems::of(item_type));
        field
    }

    /// Mark as required
    #[inline]
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Point at a target entity; forces the reference type
    #[must_use]
    pub fn with_reference(mut self, target: impl Into<String>) -> Self {
        self.reference = Some(target.into());
        self.enforce_reference_type();
        self
    }

    /// Whether the field holds a list of values
    ///
    /// A list of references keeps type [`CanonicalType::Reference`] and is
    /// recognised by its element descriptor.
    #[inline]
    #[must_use]
    pub fn is_list(&self) -> bool {
        self.field_type == CanonicalType::List || self.items.is_some()
    }

    /// Non-empty reference target, if any
    #[must_use]
    pub fn reference_target(&self) -> Option<&str> {
        self.reference.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Apply the reference-implies-type invariant, recursively
    ///
    /// Blank reference targets are cleared. A referencing list keeps its
    /// element descriptor, with the element type set to the reference type.
    pub fn enforce_reference_type(&mut self) {
        match self.reference_target().map(str::to_string) {
            Some(target) => {
                if self.field_type == CanonicalType::List && self.items.is_none() {
                    self.items = Some(ListItems::of(CanonicalType::Reference));
                }
                if let Some(items) = self.items.as_mut() {
                    items.item_type = CanonicalType::Reference;
                }
                self.field_type = CanonicalType::Reference;
                self.reference = Some(target);
            }
            None => self.reference = None,
        }
        for sub in &mut self.fields {
            sub.enforce_reference_type();
        }
    }

    /// All reference fields in this subtree, with dotted paths
    #[must_use]
    pub fn reference_paths(&self) -> Vec<(String, &Field)> {
        let mut out = Vec::new();
        self.collect_references(None, &mut out);
        out
    }

    fn collect_references<'a>(&'a self, prefix: Option<&str>, out: &mut Vec<(String, &'a Field)>) {
        let path = match prefix {
            Some(p) => format!("{p}.{}", self.name),
            None => self.name.clone(),
        };
        if self.reference_target().is_some() {
            out.push((path.clone(), self));
        }
        for sub in &self.fields {
            sub.collect_references(Some(&path), out);
        }
    }
}
