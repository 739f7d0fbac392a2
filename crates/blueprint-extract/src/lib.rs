//! Blueprint Extract
//!
//! Turns schema declarations and completion-service JSON into canonical
//! entities, and renders canonical entities back into declaration source.
//!
//! # Overview
//!
//! - **Engine**: dialect detection and dispatch ([`SchemaExtractionEngine`])
//! - **Dialects**: pluggable parsers behind [`DialectParser`], Mongoose first
//! - **Tokenizer**: top-level splitting of object-literal bodies
//! - **Field probes**: per-attribute extraction from field descriptors
//! - **JSON**: total normalization of loosely shaped completion output
//! - **Codegen**: deterministic Mongoose declaration output
//!
//! Extraction never fails on a single bad field. Whatever could not be read
//! is recorded as a [`Degradation`] next to the result.
//!
//! # Example
//!
//! ```rust
//! use blueprint_extract::SchemaExtractionEngine;
//! use blueprint_model::CanonicalType;
//!
//! let source = r#"
//! const mongoose = require('mongoose');
//! const taskSchema = new mongoose.Schema({
//!   title: { type: String, required: true },
//!   project: { type: mongoose.Schema.Types.ObjectId, ref: 'Project' },
//! });
//! module.exports = mongoose.model('Task', taskSchema);
//! "#;
//!
//! let extraction = SchemaExtractionEngine::default().parse(source, None).unwrap();
//! assert_eq!(extraction.entity.name, "Task");
//! assert_eq!(extraction.entity.fields[1].field_type, CanonicalType::Reference);
//! ```

#![warn(missing_docs)]

pub mod codegen;
pub mod config;
pub mod degradation;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod field;
pub mod json;
pub mod literal;
pub mod secondary;
pub mod tokenizer;

// Re-exports
pub use codegen::{CodeGenerator, ATTRIBUTE_ORDER};
pub use config::ExtractionConfig;
pub use degradation::{Degradation, DegradationKind, Extraction, Normalized};
pub use dialect::{default_dialects, DialectParser, DialectRegistry, MongooseParser, PrismaParser};
pub use engine::SchemaExtractionEngine;
pub use error::{ExtractError, ExtractResult};
pub use field::{extract_fields, Probe, PROBES};
pub use json::JsonNormalizer;
pub use secondary::{apply_field_level_indexes, detect_timestamps, extract_indexes};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
