//! Entity, field, relationship and index normalization

use super::value::{
    as_bool, as_f64, as_string_list, as_text, as_u64, bool_of, kind_of, lower_first, pick, text_of,
};
use super::Report;
use crate::config::ExtractionConfig;
use crate::degradation::DegradationKind;
use blueprint_model::{
    CanonicalType, Cardinality, Entity, Field, Index, IndexDirection, IndexField, ListItems, Origin,
    Relationship, SoftDeletePolicy, TimestampPolicy, DEFAULT_CREATED_AT, DEFAULT_UPDATED_AT,
};
use serde_json::{Map, Value};

const NAME_KEYS: &[&str] = &["name", "entity", "entity_name", "entityName", "title"];
const FIELD_LIST_KEYS: &[&str] = &["fields", "attributes", "properties", "columns", "schema"];

const FIELD_NAME_KEYS: &[&str] = &["name", "field", "field_name", "fieldName", "key", "column"];
const TYPE_KEYS: &[&str] = &["type", "data_type", "dataType", "datatype", "field_type", "fieldType"];
const ITEM_KEYS: &[&str] = &["items", "of", "item_type", "itemType", "element_type", "elementType", "array_of"];
const REF_KEYS: &[&str] = &[
    "ref",
    "reference",
    "references",
    "foreign_key",
    "foreignKey",
    "relation",
    "ref_entity",
    "refEntity",
];
const ENUM_KEYS: &[&str] = &[
    "enum",
    "enum_values",
    "enumValues",
    "values",
    "options",
    "allowed_values",
    "allowedValues",
    "choices",
];
const SUB_FIELD_KEYS: &[&str] = &["fields", "properties", "children", "sub_fields", "subFields"];
const CONSTRAINT_KEYS: &[&str] = &["constraints", "validation", "validations", "rules"];

/// Entities from a list, a single object, or a name-keyed map
pub(crate) fn entities(report: &mut Report, config: &ExtractionConfig, value: &Value, location: &str) -> Vec<Entity> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| entity(report, config, item, &format!("{location}[{i}]")))
            .collect(),
        Value::Object(map) if text_of(map, NAME_KEYS).is_some() || pick(map, FIELD_LIST_KEYS).is_some() => {
            vec![entity(report, config, value, location)]
        }
        Value::Object(map) => map
            .iter()
            .map(|(name, body)| {
                let loc = format!("{location}.{name}");
                let named = match body {
                    Value::Object(obj) if text_of(obj, NAME_KEYS).is_some() => body.clone(),
                    Value::Object(obj) => {
                        let mut obj = obj.clone();
                        obj.insert("name".to_string(), Value::String(name.clone()));
                        Value::Object(obj)
                    }
                    // A bare field list under the entity name
                    Value::Array(_) => serde_json::json!({ "name": name, "fields": body }),
                    _ => Value::String(name.clone()),
                };
                entity(report, config, &named, &loc)
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            report.degrade(location, DegradationKind::ShapeMismatch, format!("expected list of entities, got {}", kind_of(other)));
            Vec::new()
        }
    }
}

/// Entity from any JSON value
pub(crate) fn entity(report: &mut Report, config: &ExtractionConfig, value: &Value, location: &str) -> Entity {
    let empty = Map::new();
    let obj = match value {
        Value::Object(map) => map,
        Value::String(name) if !name.trim().is_empty() => return Entity::new(name.trim(), Origin::Generated),
        other => {
            report.degrade(location, DegradationKind::ShapeMismatch, format!("expected object, got {}", kind_of(other)));
            &empty
        }
    };

    let name = text_of(obj, NAME_KEYS).unwrap_or_else(|| {
        report.degrade(
            location,
            DegradationKind::MissingName,
            format!("entity name not found; using '{}'", config.placeholder_entity_name),
        );
        config.placeholder_entity_name.clone()
    });

    let mut entity = Entity::new(name, Origin::Generated);
    entity.description = text_of(obj, &["description", "desc", "summary", "purpose"]);
    entity.collection = text_of(
        obj,
        &["collection", "collection_name", "collectionName", "table", "table_name", "tableName"],
    );
    entity.module = text_of(obj, &["module", "module_name", "moduleName", "group", "domain"]);

    if let Some(fields) = pick(obj, FIELD_LIST_KEYS) {
        entity.fields = field_list(report, config, fields, &format!("{location}.fields"), 0);
    }
    if let Some(rels) = pick(obj, &["relationships", "relations", "associations"]) {
        entity.relationships = relationships(report, rels, &format!("{location}.relationships"));
    }
    if let Some(indexes) = pick(obj, &["indexes", "indices"]) {
        entity.indexes = index_list(report, indexes, &format!("{location}.indexes"));
    }
    entity.timestamps = pick(obj, &["timestamps", "timestamp"]).map_or_else(TimestampPolicy::default, timestamps);
    entity.soft_delete = match pick(obj, &["soft_delete", "softDelete", "paranoid"]) {
        Some(v) => soft_delete(v),
        None => entity
            .fields
            .iter()
            .find(|f| config.is_soft_delete_marker(&f.name))
            .map(|f| SoftDeletePolicy::on(f.name.clone()))
            .unwrap_or_default(),
    };
    entity.enforce_invariants();
    entity
}

/// Fields from a list of objects, a list of strings, or a name-keyed map
pub(crate) fn field_list(
    report: &mut Report,
    config: &ExtractionConfig,
    value: &Value,
    location: &str,
    depth: usize,
) -> Vec<Field> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                let loc = format!("{location}[{i}]");
                match item {
                    Value::Object(obj) => Some(field(report, config, obj, None, &loc, depth)),
                    Value::String(spec) => field_from_string(config, spec),
                    other => {
                        report.degrade(loc, DegradationKind::ShapeMismatch, format!("skipped {} in field list", kind_of(other)));
                        None
                    }
                }
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .filter(|(name, _)| !name.trim().is_empty())
            .map(|(name, body)| {
                let loc = format!("{location}.{name}");
                match body {
                    Value::Object(obj) => field(report, config, obj, Some(name.as_str()), &loc, depth),
                    Value::String(ty) => finish_field(config, typed_field(name, ty)),
                    Value::Array(_) => {
                        let mut obj = Map::new();
                        obj.insert("type".to_string(), body.clone());
                        field(report, config, &obj, Some(name.as_str()), &loc, depth)
                    }
                    other => {
                        report.degrade(loc, DegradationKind::MalformedField, format!("unreadable {} descriptor", kind_of(other)));
                        finish_field(config, Field::text(name))
                    }
                }
            })
            .collect(),
        Value::String(spec) => spec
            .split(',')
            .filter_map(|part| field_from_string(config, part))
            .collect(),
        Value::Null => Vec::new(),
        other => {
            report.degrade(location, DegradationKind::ShapeMismatch, format!("expected field list, got {}", kind_of(other)));
            Vec::new()
        }
    }
}

/// `"title:String"` or `"title"`
fn field_from_string(config: &ExtractionConfig, spec: &str) -> Option<Field> {
    let (name, ty) = match spec.split_once(':') {
        Some((name, ty)) => (name.trim(), ty.trim()),
        None => (spec.trim(), ""),
    };
    let name = name.trim_end_matches('?');
    if name.is_empty() {
        return None;
    }
    Some(finish_field(config, typed_field(name, ty)))
}

/// Field of a type token, with list element when the token spells a list
fn typed_field(name: &str, token: &str) -> Field {
    let mut field = Field::new(name, CanonicalType::normalize(token));
    if field.field_type == CanonicalType::List {
        let element = CanonicalType::element_of(token).unwrap_or(CanonicalType::OpenValue);
        field.items = Some(ListItems::of(element));
    }
    field
}

fn finish_field(config: &ExtractionConfig, mut field: Field) -> Field {
    field.enforce_reference_type();
    field.sensitive = field.sensitive || config.is_sensitive_name(&field.name);
    field
}

/// Constraint keys may sit on the descriptor or in a nested constraints object
fn constraint<'a>(obj: &'a Map<String, Value>, nested: Option<&'a Map<String, Value>>, keys: &[&str]) -> Option<&'a Value> {
    pick(obj, keys).or_else(|| nested.and_then(|n| pick(n, keys)))
}

fn field(
    report: &mut Report,
    config: &ExtractionConfig,
    obj: &Map<String, Value>,
    fallback_name: Option<&str>,
    location: &str,
    depth: usize,
) -> Field {
    let name = text_of(obj, FIELD_NAME_KEYS)
        .or_else(|| fallback_name.map(str::to_string))
        .unwrap_or_else(|| {
            report.degrade(location, DegradationKind::MissingName, "field name not found");
            positional_name(location)
        });

    let mut field = match pick(obj, TYPE_KEYS) {
        Some(Value::String(token)) => typed_field(&name, token),
        Some(Value::Array(elements)) => {
            let mut field = Field::new(&name, CanonicalType::List);
            field.items = Some(ListItems::of(CanonicalType::OpenValue));
            if let Some(first) = elements.first() {
                apply_items(report, config, &mut field, first, location, depth);
            }
            field
        }
        Some(Value::Object(nested)) => {
            // `type` holding a descriptor of its own
            let mut inner = field(report, config, nested, Some(name.as_str()), location, depth);
            inner.name.clone_from(&name);
            inner
        }
        Some(other) => {
            report.degrade(format!("{location}.type"), DegradationKind::MalformedField, format!("unreadable {} type", kind_of(other)));
            Field::text(&name)
        }
        None => Field::text(&name),
    };

    if let Some(items) = pick(obj, ITEM_KEYS) {
        if field.field_type != CanonicalType::Map {
            field.field_type = CanonicalType::List;
        }
        apply_items(report, config, &mut field, items, location, depth);
    }

    let nested = pick(obj, CONSTRAINT_KEYS).and_then(Value::as_object);

    field.required = match constraint(obj, nested, &["required", "is_required", "isRequired", "mandatory"]).and_then(as_bool) {
        Some(required) => required,
        None => bool_of(obj, &["optional", "nullable"]).is_some_and(|optional| !optional),
    };
    field.unique = constraint(obj, nested, &["unique", "is_unique", "isUnique"]).and_then(as_bool).unwrap_or(false);
    field.index = constraint(obj, nested, &["index", "indexed", "is_indexed", "isIndexed"]).and_then(as_bool).unwrap_or(false);
    field.sparse = constraint(obj, nested, &["sparse"]).and_then(as_bool).unwrap_or(false);
    field.default = constraint(obj, nested, &["default", "default_value", "defaultValue"]).cloned();

    if let Some(values) = constraint(obj, nested, ENUM_KEYS) {
        field.enum_values = match values {
            Value::Array(values) => values.clone(),
            Value::String(_) => as_string_list(values).into_iter().map(Value::String).collect(),
            other => {
                report.degrade(format!("{location}.enum"), DegradationKind::MalformedField, format!("unreadable {} enum", kind_of(other)));
                Vec::new()
            }
        };
    }

    if let Some(target) = pick(obj, REF_KEYS).and_then(reference_target) {
        field.reference = Some(target);
    }

    let c = &mut field.constraints;
    c.min_length = constraint(obj, nested, &["minlength", "min_length", "minLength"]).and_then(as_u64);
    c.max_length = constraint(obj, nested, &["maxlength", "max_length", "maxLength"]).and_then(as_u64);
    c.min = constraint(obj, nested, &["min", "minimum"]).and_then(as_f64);
    c.max = constraint(obj, nested, &["max", "maximum"]).and_then(as_f64);
    c.pattern = constraint(obj, nested, &["match", "pattern", "regex"]).and_then(as_text);
    c.trim = constraint(obj, nested, &["trim"]).and_then(as_bool).unwrap_or(false);
    c.lowercase = constraint(obj, nested, &["lowercase"]).and_then(as_bool).unwrap_or(false);
    c.uppercase = constraint(obj, nested, &["uppercase"]).and_then(as_bool).unwrap_or(false);

    field.description = text_of(obj, &["description", "desc", "comment"]);
    field.example = pick(obj, &["example", "sample"]).cloned();
    field.sensitive = bool_of(obj, &["sensitive", "is_sensitive", "isSensitive", "pii", "secret"]).unwrap_or(false);
    field.hidden = bool_of(obj, &["hidden", "private", "write_only", "writeOnly"]).unwrap_or(false)
        || bool_of(obj, &["select"]) == Some(false);

    if let Some(subs) = pick(obj, SUB_FIELD_KEYS) {
        if depth >= config.max_nesting_depth {
            report.degrade(
                location,
                DegradationKind::DepthExceeded,
                format!("nesting deeper than {}", config.max_nesting_depth),
            );
            field.field_type = CanonicalType::OpenValue;
        } else {
            field.fields = field_list(report, config, subs, &format!("{location}.fields"), depth + 1);
            if !field.is_list() && !field.fields.is_empty() && matches!(field.field_type, CanonicalType::Text | CanonicalType::OpenValue) {
                field.field_type = CanonicalType::Structure;
            }
        }
    }

    finish_field(config, field)
}

/// `field_2` for `entity.fields[2]`
fn positional_name(location: &str) -> String {
    location
        .rsplit('[')
        .next()
        .and_then(|tail| tail.strip_suffix(']'))
        .filter(|i| i.chars().all(|c| c.is_ascii_digit()))
        .map_or_else(|| "field".to_string(), |i| format!("field_{i}"))
}

/// Element descriptor from a type token or element object
fn apply_items(report: &mut Report, config: &ExtractionConfig, field: &mut Field, items: &Value, location: &str, depth: usize) {
    match items {
        Value::String(token) => {
            let element = CanonicalType::element_of(token).map_or_else(|| CanonicalType::normalize(token), |_| CanonicalType::List);
            field.items = Some(ListItems::of(element));
        }
        Value::Object(obj) => {
            let element = self::field(report, config, obj, Some(field.name.as_str()), location, depth + 1);
            let item_type = if element.reference_target().is_some() {
                field.reference.clone_from(&element.reference);
                CanonicalType::Reference
            } else if element.fields.is_empty() {
                element.field_type
            } else {
                CanonicalType::Structure
            };
            let mut descriptor = ListItems::of(item_type);
            descriptor.min_items = pick(obj, &["min_items", "minItems"]).and_then(as_u64);
            descriptor.max_items = pick(obj, &["max_items", "maxItems"]).and_then(as_u64);
            field.items = Some(descriptor);
            if !element.fields.is_empty() {
                field.fields = element.fields;
            }
        }
        other => {
            report.degrade(format!("{location}.items"), DegradationKind::MalformedField, format!("unreadable {} element", kind_of(other)));
            field.items = Some(ListItems::of(CanonicalType::OpenValue));
        }
    }
}

/// Reference target from a name or `{ entity | model | table }` object
fn reference_target(value: &Value) -> Option<String> {
    match value {
        Value::Object(obj) => text_of(obj, &["entity", "model", "table", "target", "name"]),
        Value::Bool(_) => None,
        other => as_text(other),
    }
}

/// Cardinality from the many ways completions spell it
pub(crate) fn cardinality(text: &str) -> Option<Cardinality> {
    let key: String = text
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .collect::<String>()
        .to_ascii_lowercase();
    let kind = match key.as_str() {
        "onetoone" | "1:1" | "hasone" | "belongsto" | "one" | "manytoone" | "n:1" | "m:1" | "*:1" | "reference" => {
            Cardinality::OneToOne
        }
        "onetomany" | "1:n" | "1:m" | "1:*" | "hasmany" | "many" | "embedsmany" => Cardinality::OneToMany,
        "manytomany" | "n:m" | "m:n" | "n:n" | "*:*" | "belongstomany" | "hasandbelongstomany" => {
            Cardinality::ManyToMany
        }
        _ => return None,
    };
    Some(kind)
}

fn relationships(report: &mut Report, value: &Value, location: &str) -> Vec<Relationship> {
    let items: Vec<(String, &Value, Option<&str>)> = match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (format!("{location}[{i}]"), item, None))
            .collect(),
        // Map keyed by target name
        Value::Object(map) => map
            .iter()
            .map(|(target, item)| (format!("{location}.{target}"), item, Some(target.as_str())))
            .collect(),
        Value::Null => Vec::new(),
        other => {
            report.degrade(location, DegradationKind::ShapeMismatch, format!("expected relationship list, got {}", kind_of(other)));
            Vec::new()
        }
    };

    items
        .into_iter()
        .filter_map(|(loc, item, keyed_target)| match item {
            Value::String(text) => match keyed_target {
                Some(target) => Some(relationship_to(target, cardinality(text).unwrap_or_default())),
                None if !text.trim().is_empty() => Some(relationship_to(text.trim(), Cardinality::OneToOne)),
                None => None,
            },
            Value::Object(obj) => {
                let target = text_of(obj, &["target", "entity", "to", "model", "ref", "references", "target_entity", "targetEntity"])
                    .or_else(|| keyed_target.map(str::to_string));
                let Some(target) = target else {
                    report.degrade(loc, DegradationKind::ShapeMismatch, "relationship without target");
                    return None;
                };
                let kind = text_of(obj, &["type", "kind", "cardinality", "relation", "relationship"])
                    .and_then(|t| cardinality(&t))
                    .unwrap_or_default();
                let mut rel = relationship_to(&target, kind);
                if let Some(field) = text_of(obj, &["field", "foreign_key", "foreignKey", "via", "local_field", "localField", "name"]) {
                    rel.field = field;
                }
                rel.inverse_field = text_of(obj, &["inverse_field", "inverseField", "inverse", "mapped_by", "mappedBy"]);
                rel.cascade_delete = match pick(obj, &["cascade_delete", "cascadeDelete", "cascade", "on_delete", "onDelete"]) {
                    Some(Value::String(s)) if s.eq_ignore_ascii_case("cascade") => true,
                    Some(v) => as_bool(v).unwrap_or(false),
                    None => false,
                };
                Some(rel)
            }
            other => {
                report.degrade(loc, DegradationKind::ShapeMismatch, format!("skipped {} relationship", kind_of(other)));
                None
            }
        })
        .collect()
}

fn relationship_to(target: &str, kind: Cardinality) -> Relationship {
    let field = match kind {
        Cardinality::OneToOne => lower_first(target),
        Cardinality::OneToMany | Cardinality::ManyToMany => format!("{}s", lower_first(target)),
    };
    Relationship::new(target, kind, field)
}

fn index_list(report: &mut Report, value: &Value, location: &str) -> Vec<Index> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| index(report, item, &format!("{location}[{i}]")))
            .collect(),
        Value::Null => Vec::new(),
        other => index(report, other, location).into_iter().collect(),
    }
}

fn index(report: &mut Report, value: &Value, location: &str) -> Option<Index> {
    let (keys, options) = match value {
        Value::Object(obj) => match pick(obj, &["fields", "keys", "columns", "key", "on"]) {
            Some(keys) => (index_keys(keys), Some(obj)),
            // Bare `{ field: 1 }` key map
            None => (index_keys(value), None),
        },
        other => (index_keys(other), None),
    };
    if keys.is_empty() {
        report.degrade(location, DegradationKind::ShapeMismatch, "index without fields");
        return None;
    }
    let mut index = Index {
        name: None,
        fields: keys,
        unique: false,
        sparse: false,
        field_level: false,
    };
    if let Some(obj) = options {
        index.name = text_of(obj, &["name", "index_name", "indexName"]);
        index.unique = bool_of(obj, &["unique"]).unwrap_or(false);
        index.sparse = bool_of(obj, &["sparse"]).unwrap_or(false);
    }
    Some(index)
}

fn index_keys(value: &Value) -> Vec<IndexField> {
    let ascending = |name: String| IndexField {
        name,
        direction: IndexDirection::Ascending,
    };
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(name, dir)| IndexField {
                name: name.clone(),
                direction: as_text(dir).map_or(IndexDirection::Ascending, |d| IndexDirection::from_literal(&d)),
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(obj) => text_of(obj, &["name", "field"]).map(|name| IndexField {
                    name,
                    direction: text_of(obj, &["direction", "order", "sort"])
                        .map_or(IndexDirection::Ascending, |d| IndexDirection::from_literal(&d)),
                }),
                other => as_text(other).map(ascending),
            })
            .collect(),
        other => as_string_list(other).into_iter().map(ascending).collect(),
    }
}

fn timestamps(value: &Value) -> TimestampPolicy {
    match value {
        Value::Object(obj) => {
            let side = |keys: &[&str], default: &str| match pick(obj, keys) {
                None => Some(default.to_string()),
                Some(v) => match as_bool(v) {
                    Some(true) => Some(default.to_string()),
                    Some(false) => None,
                    None => as_text(v).or_else(|| Some(default.to_string())),
                },
            };
            TimestampPolicy::with_names(
                side(&["createdAt", "created_at", "created"], DEFAULT_CREATED_AT),
                side(&["updatedAt", "updated_at", "updated"], DEFAULT_UPDATED_AT),
            )
        }
        other if as_bool(other) == Some(true) => TimestampPolicy::enabled(),
        _ => TimestampPolicy::default(),
    }
}

fn soft_delete(value: &Value) -> SoftDeletePolicy {
    match value {
        Value::Object(obj) => {
            let field = text_of(obj, &["field", "column", "name"]).unwrap_or_else(|| "deletedAt".to_string());
            if bool_of(obj, &["enabled"]).unwrap_or(true) {
                SoftDeletePolicy::on(field)
            } else {
                SoftDeletePolicy::default()
            }
        }
        Value::String(s) if as_bool(value).is_none() && !s.trim().is_empty() => SoftDeletePolicy::on(s.trim()),
        other if as_bool(other) == Some(true) => SoftDeletePolicy::on("deletedAt"),
        _ => SoftDeletePolicy::default(),
    }
}

#[cfg(test)]
mod tests {
    use crate::json::JsonNormalizer;
    use blueprint_model::{CanonicalType, Cardinality, IndexDirection, Origin, SoftDeletePolicy};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn normalizer() -> JsonNormalizer {
        JsonNormalizer::default()
    }

    #[test]
    fn field_list_of_objects_with_aliases() {
        let entity = normalizer().normalize_entity(&json!({
            "entity_name": "Project",
            "fields": [
                {"name": "title", "data_type": "string", "required": "yes", "min_length": "3"},
                {"field_name": "owner", "type": "ObjectId", "references": "User"},
                {"name": "status", "type": "String", "enum_values": "draft, live"},
                {"name": "tags", "type": "Array", "items": "String"},
                {"name": "secretKey", "type": "String"}
            ]
        }));
        assert_eq!(entity.name, "Project");
        assert_eq!(entity.provenance.origin, Origin::Generated);
        let title = entity.field("title").unwrap();
        assert!(title.required);
        assert_eq!(title.constraints.min_length, Some(3));
        let owner = entity.field("owner").unwrap();
        assert_eq!(owner.field_type, CanonicalType::Reference);
        assert_eq!(owner.reference_target(), Some("User"));
        assert_eq!(entity.field("status").unwrap().enum_values, vec![json!("draft"), json!("live")]);
        assert_eq!(entity.field("tags").unwrap().items.as_ref().unwrap().item_type, CanonicalType::Text);
        assert!(entity.field("secretKey").unwrap().sensitive);
    }

    #[test]
    fn field_list_of_strings_and_maps() {
        let entity = normalizer().normalize_entity(&json!({
            "name": "Note",
            "fields": ["title:String", "body", "views: number", "labels:[String]"]
        }));
        let types: Vec<_> = entity.fields.iter().map(|f| f.field_type.clone()).collect();
        assert_eq!(
            types,
            vec![CanonicalType::Text, CanonicalType::Text, CanonicalType::Number, CanonicalType::List]
        );

        let entity = normalizer().normalize_entity(&json!({
            "name": "Note",
            "fields": {"title": "String", "author": {"type": "string", "ref": "User"}, "meta": {"properties": {"a": "Number"}}}
        }));
        assert_eq!(entity.fields.len(), 3);
        assert_eq!(entity.field("author").unwrap().field_type, CanonicalType::Reference);
        let meta = entity.field("meta").unwrap();
        assert_eq!(meta.field_type, CanonicalType::Structure);
        assert_eq!(meta.fields[0].field_type, CanonicalType::Number);
    }

    #[test]
    fn reference_list_from_items_object() {
        let entity = normalizer().normalize_entity(&json!({
            "name": "Team",
            "fields": [{"name": "members", "type": "array", "items": {"type": "ObjectId", "ref": "User"}}]
        }));
        let members = &entity.fields[0];
        assert_eq!(members.field_type, CanonicalType::Reference);
        assert!(members.is_list());
        assert_eq!(members.reference_target(), Some("User"));
    }

    #[test]
    fn relationships_in_many_spellings() {
        let entity = normalizer().normalize_entity(&json!({
            "name": "Order",
            "relationships": [
                "Customer",
                {"target": "Line", "type": "hasMany", "cascade": "true"},
                {"entity": "Tag", "cardinality": "many_to_many", "field": "tagIds"},
                {"type": "1:1"}
            ]
        }));
        let rels = &entity.relationships;
        assert_eq!(rels.len(), 3);
        assert_eq!(rels[0].kind, Cardinality::OneToOne);
        assert_eq!(rels[0].field, "customer");
        assert_eq!(rels[1].kind, Cardinality::OneToMany);
        assert!(rels[1].cascade_delete);
        assert_eq!(rels[2].kind, Cardinality::ManyToMany);
        assert_eq!(rels[2].field, "tagIds");
        assert!(!rels[0].inferred);
    }

    #[test]
    fn relationship_map_keyed_by_target() {
        let entity = normalizer().normalize_entity(&json!({
            "name": "Post",
            "relations": {"Author": "belongsTo", "Comment": {"type": "one-to-many"}}
        }));
        assert_eq!(entity.relationships.len(), 2);
        assert_eq!(entity.relationships[0].target, "Author");
        assert_eq!(entity.relationships[1].kind, Cardinality::OneToMany);
    }

    #[test]
    fn indexes_in_many_spellings() {
        let entity = normalizer().normalize_entity(&json!({
            "name": "Order",
            "indexes": [
                {"fields": ["customer", "status"], "unique": true},
                "email",
                {"createdAt": -1},
                {"keys": "a, b", "name": "ab"}
            ]
        }));
        let idx = &entity.indexes;
        assert_eq!(idx.len(), 4);
        assert!(idx[0].unique && idx[0].keys_exactly(&["customer", "status"]));
        assert!(idx[1].keys_exactly(&["email"]));
        assert_eq!(idx[2].fields[0].direction, IndexDirection::Descending);
        assert_eq!(idx[3].name.as_deref(), Some("ab"));
    }

    #[test]
    fn timestamps_and_soft_delete() {
        let entity = normalizer().normalize_entity(&json!({
            "name": "Doc",
            "timestamps": {"created_at": "created_on", "updated_at": false},
            "soft_delete": true
        }));
        assert_eq!(entity.timestamps.created_at.as_deref(), Some("created_on"));
        assert_eq!(entity.timestamps.updated_at, None);
        assert_eq!(entity.soft_delete, SoftDeletePolicy::on("deletedAt"));

        let entity = normalizer().normalize_entity(&json!({"name": "Doc", "fields": ["isDeleted:Boolean"], "timestamps": "yes"}));
        assert!(entity.timestamps.uses_default_names());
        assert_eq!(entity.soft_delete, SoftDeletePolicy::on("isDeleted"));
    }

    #[test]
    fn garbage_degrades_to_placeholder() {
        let normalized = normalizer().normalize_entity_with_report(&json!(42));
        assert_eq!(normalized.value.name, "UnnamedEntity");
        assert!(normalized.value.fields.is_empty());
        assert_eq!(normalized.degradations.len(), 2);
    }

    #[test]
    fn entity_map_keyed_by_name() {
        let normalized = normalizer().normalize_entities_with_report(&json!({
            "User": {"fields": ["email:String"]},
            "Task": {"fields": ["title"]}
        }));
        let names: Vec<_> = normalized.value.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["User", "Task"]);
    }
}
