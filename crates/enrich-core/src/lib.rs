//! # enrich-core
//!
//! Shared types for Enrich: the declarative entity model (entities, fields,
//! relationships), entity instances produced by application code, and the
//! configuration loaded by the CLI.
//!
//! The model is plain data. Binding resolvers to relationships and walking the
//! relationship graph lives in `enrich-mcp`.

pub mod config;
pub mod entity;
pub mod error;
pub mod model;
pub mod pagination;

pub use config::{ConfigError, EnrichConfig, InliningConfig, McpConfig, ModelFile, Transport};
pub use entity::{Entity, EntityValue};
pub use error::ModelError;
pub use pagination::PageResult;
pub use model::{
    Cardinality, EntityDef, FieldDef, FieldType, RelationTarget, RelationshipDef,
};
