//! Document-model schema declarations
//!
//! Reads `new Schema({...}, {...})` declarations together with the model
//! registration, export and index calls around them.

use super::{capitalize, infer_relationships, DialectParser};
use crate::config::ExtractionConfig;
use crate::degradation::{Degradation, DegradationKind, Extraction};
use crate::error::{ExtractError, ExtractResult};
use crate::field::FieldExtractor;
use crate::literal::unquote;
use crate::secondary::{apply_field_level_indexes, detect_timestamps, extract_indexes};
use crate::tokenizer::{find_block, skip_ws, split_declarations, strip_comments};
use blueprint_model::{Dialect, Entity, Origin, SoftDeletePolicy};
use once_cell::sync::Lazy;
use regex::Regex;

static SCHEMA_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*new\s+(?:mongoose\s*\.\s*)?Schema\s*(?:<[^>]*>)?\s*\(",
    )
    .expect("static regex")
});

static SCHEMA_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bnew\s+(?:mongoose\s*\.\s*)?Schema\s*(?:<[^>]*>)?\s*\(").expect("static regex")
});

static MODEL_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\bmodel\s*(?:<[^>]*>)?\s*\(\s*['"`]([^'"`]+)['"`]\s*(?:,\s*([A-Za-z_$][\w$]*))?(?:\s*,\s*['"`]([^'"`]+)['"`])?"#,
    )
    .expect("static regex")
});

static EXPORT_BINDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\bexport\s+(?:const|let|var)\s+|\bmodule\.exports\.|\bexports\.)([A-Za-z_$][\w$]*)\s*=")
        .expect("static regex")
});

/// Parser for document-model schema declarations
#[derive(Debug, Clone, Copy, Default)]
pub struct MongooseParser;

/// A `model('Name', schemaVar, 'collection')` call
struct ModelCall<'a> {
    name: &'a str,
    schema: Option<&'a str>,
    collection: Option<&'a str>,
}

impl MongooseParser {
    fn model_call<'a>(source: &'a str, schema_ident: Option<&str>) -> Option<ModelCall<'a>> {
        let calls: Vec<ModelCall<'a>> = MODEL_CALL
            .captures_iter(source)
            .filter_map(|caps| {
                Some(ModelCall {
                    name: caps.get(1)?.as_str(),
                    schema: caps.get(2).map(|m| m.as_str()),
                    collection: caps.get(3).map(|m| m.as_str()),
                })
            })
            .collect();
        let preferred = calls
            .iter()
            .position(|c| schema_ident.is_some() && c.schema == schema_ident);
        let mut calls = calls;
        match preferred {
            Some(i) => Some(calls.swap_remove(i)),
            None => calls.into_iter().next(),
        }
    }

    fn exported_name(source: &str, schema_ident: Option<&str>) -> Option<String> {
        EXPORT_BINDING
            .captures_iter(source)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .find(|name| {
                Some(*name) != schema_ident && !name.to_ascii_lowercase().ends_with("schema")
            })
            .map(str::to_string)
    }

    fn name_from_schema_ident(ident: &str) -> Option<String> {
        let lowered = ident.to_ascii_lowercase();
        let stem = if lowered.ends_with("schema") {
            &ident[..ident.len() - "schema".len()]
        } else {
            ident
        };
        let stem = stem.trim_end_matches('_');
        (!stem.is_empty()).then(|| capitalize(stem))
    }
}

impl DialectParser for MongooseParser {
    fn dialect(&self) -> Dialect {
        Dialect::Mongoose
    }

    fn detect(&self, source: &str) -> bool {
        SCHEMA_CALL.is_match(source) || source.contains("mongoose")
    }

    fn parse(&self, source: &str, config: &ExtractionConfig) -> ExtractResult<Extraction> {
        let clean = strip_comments(source);
        let clean = clean.as_ref();

        let (schema_ident, open_paren) = match SCHEMA_DECL.captures(clean) {
            Some(caps) => {
                let whole = caps.get(0).ok_or(ExtractError::NoDeclaration {
                    dialect: Dialect::Mongoose,
                })?;
                (caps.get(1).map(|m| m.as_str()), whole.end())
            }
            None => {
                let call = SCHEMA_CALL.find(clean).ok_or(ExtractError::NoDeclaration {
                    dialect: Dialect::Mongoose,
                })?;
                (None, call.end())
            }
        };

        let body_at = skip_ws(clean, open_paren);
        if clean.as_bytes().get(body_at) != Some(&b'{') {
            return Err(ExtractError::NoDeclaration {
                dialect: Dialect::Mongoose,
            });
        }
        let mut degradations = Vec::new();
        let body = find_block(clean, body_at).ok_or(ExtractError::NoDeclaration {
            dialect: Dialect::Mongoose,
        })?;
        if !body.terminated {
            degradations.push(Degradation::new(
                "<schema>",
                DegradationKind::Unterminated,
                "schema body not closed; read to end of input",
            ));
        }

        let mut extractor = FieldExtractor::new(config);
        let fields = extractor.extract_block(body.inner(clean), None, 0);
        degradations.extend(extractor.into_degradations());

        // Options literal after the field block
        let mut collection = None;
        let after = skip_ws(clean, body.end());
        if clean.as_bytes().get(after) == Some(&b',') {
            let opts_at = skip_ws(clean, after + 1);
            if let Some(opts) = find_block(clean, opts_at).filter(|b| b.terminated) {
                collection = split_declarations(opts.inner(clean))
                    .get("collection")
                    .and_then(unquote);
            }
        }

        let model = Self::model_call(clean, schema_ident);
        let name = model
            .as_ref()
            .map(|m| m.name.to_string())
            .or_else(|| Self::exported_name(clean, schema_ident))
            .or_else(|| schema_ident.and_then(Self::name_from_schema_ident));
        let name = if let Some(name) = name {
            name
        } else {
            degradations.push(Degradation::new(
                "<entity>",
                DegradationKind::MissingName,
                format!("entity name not found; using '{}'", config.placeholder_entity_name),
            ));
            config.placeholder_entity_name.clone()
        };
        let collection = collection.or_else(|| model.and_then(|m| m.collection.map(str::to_string)));

        let mut entity = Entity::new(name, Origin::Source);
        entity.collection = collection;
        entity.relationships = infer_relationships(&fields);
        entity.timestamps = detect_timestamps(clean);
        if let Some(marker) = fields.iter().find(|f| config.is_soft_delete_marker(&f.name)) {
            entity.soft_delete = SoftDeletePolicy::on(marker.name.clone());
        }
        let mut indexes = schema_ident.map(|ident| extract_indexes(clean, ident)).unwrap_or_default();
        apply_field_level_indexes(&fields, &mut indexes);
        entity.indexes = indexes;
        entity.fields = fields;
        entity.provenance.dialect = Some(Dialect::Mongoose);
        entity.provenance.original_source = Some(source.to_string());

        Ok(Extraction {
            entity,
            dialect: Dialect::Mongoose,
            degradations,
        })
    }

    fn priority(&self) -> i32 {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_model::{CanonicalType, Cardinality};
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Extraction {
        MongooseParser.parse(source, &ExtractionConfig::default()).unwrap()
    }

    #[test]
    fn name_from_model_call() {
        let ex = parse(
            "const taskSchema = new mongoose.Schema({ title: String });\n\
             module.exports = mongoose.model('Task', taskSchema, 'task_items');",
        );
        assert_eq!(ex.entity.name, "Task");
        assert_eq!(ex.entity.collection.as_deref(), Some("task_items"));
        assert!(!ex.is_degraded());
    }

    #[test]
    fn model_call_matching_schema_wins() {
        let ex = parse(
            "const other = mongoose.model('Other', otherSchema);\n\
             const noteSchema = new Schema({ body: String });\n\
             export default model<INote>('Note', noteSchema);",
        );
        assert_eq!(ex.entity.name, "Note");
    }

    #[test]
    fn name_from_export_then_schema_variable() {
        let ex = parse("const userSchema = new Schema({ email: String });\nexport const Member = userSchema;");
        assert_eq!(ex.entity.name, "Member");

        let ex = parse("const projectSchema = new Schema({ title: String, n: Number });");
        assert_eq!(ex.entity.name, "Project");
    }

    #[test]
    fn placeholder_name_is_degradation() {
        let ex = parse("mongoose.connect(url); const x = new Schema({ title: String });");
        assert_eq!(ex.entity.name, "X");

        let ex = parse("register(new Schema({ title: String, body: String }));");
        assert_eq!(ex.entity.name, "UnnamedEntity");
        assert_eq!(ex.degradations[0].kind, DegradationKind::MissingName);
    }

    #[test]
    fn collection_from_options() {
        let ex = parse("const s = new Schema({ a: String }, { collection: 'things', timestamps: true });");
        assert_eq!(ex.entity.collection.as_deref(), Some("things"));
        assert!(ex.entity.timestamps.uses_default_names());
    }

    #[test]
    fn relationships_soft_delete_and_indexes() {
        let ex = parse(
            "const orderSchema = new Schema({
                customer: { type: Schema.Types.ObjectId, ref: 'Customer', required: true },
                items: [{ type: Schema.Types.ObjectId, ref: 'Product' }],
                sku: { type: String, unique: true },
                deletedAt: Date,
             });
             orderSchema.index({ customer: 1, sku: 1 });",
        );
        let entity = &ex.entity;
        assert_eq!(entity.name, "Order");
        assert_eq!(entity.relationships.len(), 2);
        assert_eq!(entity.relationships[0].kind, Cardinality::OneToOne);
        assert_eq!(entity.relationships[1].kind, Cardinality::OneToMany);
        assert_eq!(entity.soft_delete, SoftDeletePolicy::on("deletedAt"));
        assert_eq!(entity.indexes.len(), 2);
        assert!(entity.indexes[1].field_level);
        assert_eq!(entity.field("items").unwrap().field_type, CanonicalType::Reference);
    }

    #[test]
    fn comments_are_ignored() {
        let ex = parse(
            "// const oldSchema = new Schema({ gone: String });\n\
             const itemSchema = new Schema({\n  /* price, in cents */ price: Number, // total\n  label: String\n});",
        );
        assert_eq!(ex.entity.name, "Item");
        assert_eq!(ex.entity.fields.len(), 2);
    }

    #[test]
    fn unterminated_body_degrades() {
        let ex = parse("const taskSchema = new Schema({ title: String, done: Boolean");
        assert_eq!(ex.entity.fields.len(), 2);
        assert_eq!(ex.degradations[0].kind, DegradationKind::Unterminated);
    }

    #[test]
    fn no_schema_is_error() {
        let err = MongooseParser
            .parse("just some prose about mongoose", &ExtractionConfig::default())
            .unwrap_err();
        assert!(err.is_input_too_sparse());
    }

    #[test]
    fn provenance_keeps_source() {
        let source = "const tagSchema = new Schema({ label: String });";
        let ex = parse(source);
        assert_eq!(ex.entity.provenance.origin, Origin::Source);
        assert_eq!(ex.entity.provenance.original_source.as_deref(), Some(source));
        assert_eq!(ex.entity.provenance.dialect, Some(Dialect::Mongoose));
    }
}
