//! Relational model blocks (reduced fidelity)
//!
//! Only field name, type, optionality, list shape and reference target are
//! read. Attributes (`@default`, `@unique`, `@@index`, ...) are not.

use super::{infer_relationships, DialectParser};
use crate::config::ExtractionConfig;
use crate::degradation::{Degradation, DegradationKind, Extraction};
use crate::error::{ExtractError, ExtractResult};
use crate::tokenizer::{find_block, strip_comments};
use blueprint_model::{CanonicalType, Dialect, Entity, Field, ListItems, Origin};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static MODEL_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*model\s+([A-Za-z_]\w*)\s*\{").expect("static regex"));

static ENUM_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*enum\s+([A-Za-z_]\w*)\s*\{").expect("static regex"));

static MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)@id\b|@relation\b|^\s*(?:datasource|generator)\s+\w+\s*\{").expect("static regex")
});

/// Parser for relational model blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct PrismaParser;

fn scalar(token: &str) -> Option<CanonicalType> {
    let ty = match token {
        "String" => CanonicalType::Text,
        "Int" | "BigInt" | "Float" => CanonicalType::Number,
        "Decimal" => CanonicalType::Decimal,
        "Boolean" => CanonicalType::Boolean,
        "DateTime" => CanonicalType::Date,
        "Json" => CanonicalType::OpenValue,
        "Bytes" => CanonicalType::Binary,
        _ => return None,
    };
    Some(ty)
}

impl DialectParser for PrismaParser {
    fn dialect(&self) -> Dialect {
        Dialect::Prisma
    }

    fn detect(&self, source: &str) -> bool {
        MODEL_BLOCK.is_match(source) && !source.contains("Schema(") && MARKERS.is_match(source)
    }

    fn parse(&self, source: &str, _config: &ExtractionConfig) -> ExtractResult<Extraction> {
        let clean = strip_comments(source);
        let clean = clean.as_ref();

        let no_model = || ExtractError::NoDeclaration {
            dialect: Dialect::Prisma,
        };
        let caps = MODEL_BLOCK.captures(clean).ok_or_else(no_model)?;
        let name = caps.get(1).ok_or_else(no_model)?.as_str();
        let open = caps.get(0).ok_or_else(no_model)?.end() - 1;
        let block = find_block(clean, open).ok_or_else(no_model)?;

        let enums: HashSet<&str> = ENUM_BLOCK
            .captures_iter(clean)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();

        let mut degradations = Vec::new();
        if !block.terminated {
            degradations.push(Degradation::new(
                name,
                DegradationKind::Unterminated,
                "model block not closed; read to end of input",
            ));
        }

        let mut fields = Vec::new();
        for line in block.inner(clean).lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("@@") {
                continue;
            }
            let mut parts = line.split_whitespace();
            let Some(field_name) = parts.next() else {
                continue;
            };
            let Some(token) = parts.next().filter(|t| !t.starts_with('@')) else {
                degradations.push(Degradation::new(
                    field_name,
                    DegradationKind::MalformedField,
                    "field line without a type",
                ));
                fields.push(Field::text(field_name));
                continue;
            };

            let optional = token.ends_with('?');
            let token = token.trim_end_matches('?');
            let is_list = token.ends_with("[]");
            let base = token.trim_end_matches("[]");

            let mut field = match scalar(base) {
                Some(ty) => Field::new(field_name, ty),
                None if enums.contains(base) => Field::text(field_name),
                None if base.starts_with(|c: char| c.is_ascii_uppercase()) => {
                    Field::text(field_name).with_reference(base)
                }
                None => Field::new(field_name, CanonicalType::normalize(base)),
            };
            if is_list {
                let element = field.field_type.clone();
                if field.reference.is_none() {
                    field.field_type = CanonicalType::List;
                }
                field.items = Some(ListItems::of(element));
            }
            field.required = !optional && !is_list;
            fields.push(field);
        }

        let mut entity = Entity::new(name, Origin::Source);
        entity.relationships = infer_relationships(&fields);
        entity.fields = fields;
        entity.provenance.dialect = Some(Dialect::Prisma);
        entity.provenance.original_source = Some(source.to_string());

        Ok(Extraction {
            entity,
            dialect: Dialect::Prisma,
            degradations,
        })
    }

    fn priority(&self) -> i32 {
        20
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_model::Cardinality;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = r#"
datasource db {
  provider = "postgresql"
}

enum Status {
  TODO
  DONE
}

model Task {
  id        String   @id @default(cuid())
  title     String
  status    Status   @default(TODO)
  estimate  Float?
  owner     User     @relation(fields: [ownerId], references: [id])
  ownerId   String
  labels    Label[]
  tags      String[]
  @@index([ownerId])
}
"#;

    #[test]
    fn reads_model_block() {
        let ex = PrismaParser.parse(SOURCE, &ExtractionConfig::default()).unwrap();
        let entity = &ex.entity;
        assert_eq!(entity.name, "Task");
        assert_eq!(entity.fields.len(), 8);
        assert_eq!(entity.field("status").unwrap().field_type, CanonicalType::Text);
        assert!(!entity.field("estimate").unwrap().required);
        assert_eq!(entity.field("owner").unwrap().field_type, CanonicalType::Reference);

        let labels = entity.field("labels").unwrap();
        assert_eq!(labels.field_type, CanonicalType::Reference);
        assert!(labels.is_list());

        let tags = entity.field("tags").unwrap();
        assert_eq!(tags.field_type, CanonicalType::List);
        assert_eq!(tags.items.as_ref().unwrap().item_type, CanonicalType::Text);

        assert_eq!(entity.relationships.len(), 2);
        assert_eq!(entity.relationships[1].kind, Cardinality::OneToMany);
        assert!(entity.indexes.is_empty());
    }

    #[test]
    fn detects_markers() {
        assert!(PrismaParser.detect(SOURCE));
        assert!(!PrismaParser.detect("const s = new Schema({ model: String })"));
    }

    #[test]
    fn missing_model_is_error() {
        let err = PrismaParser
            .parse("generator client { provider = \"x\" }", &ExtractionConfig::default())
            .unwrap_err();
        assert!(matches!(err, ExtractError::NoDeclaration { dialect: Dialect::Prisma }));
    }
}
