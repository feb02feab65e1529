//! Declarative model files.
//!
//! A model file lists entities with their fields and relationships in YAML.
//! Relationships may carry a `join` describing how to resolve them against
//! tabular data: rows of the target whose `remote` column equals the source's
//! `local` attribute.

use crate::error::ModelError;
use crate::model::{Cardinality, EntityDef, FieldDef, FieldType, RelationTarget, RelationshipDef};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::ConfigError;

/// Top-level model file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelFile {
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
}

/// One entity in a model file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub relationships: Vec<RelationshipSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    /// Allowed values when `type` is `literal`.
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mutable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipSpec {
    pub name: String,
    pub target: String,
    #[serde(default)]
    pub many: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub inline: bool,
    /// How to resolve the relationship from tabular data. Relationships
    /// without a join need a resolver bound in code.
    #[serde(default)]
    pub join: Option<JoinSpec>,
}

/// Column pairing for a relationship.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinSpec {
    /// Attribute on the source entity.
    #[serde(default = "default_local")]
    pub local: String,
    /// Attribute on the target entity.
    pub remote: String,
}

fn default_field_type() -> String {
    "json".to_string()
}

fn default_local() -> String {
    "id".to_string()
}

impl ModelFile {
    /// Load a model file from disk (YAML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse a model file from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Find an entity spec by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntitySpec> {
        self.entities.iter().find(|e| e.name == name)
    }
}

impl EntitySpec {
    /// Convert to an entity declaration. Descriptions are not checked here;
    /// that happens when the entity is registered.
    pub fn to_def(&self) -> Result<EntityDef, ModelError> {
        let mut def = EntityDef::new(&self.name, &self.description);

        for field in &self.fields {
            let field_type = FieldType::parse(&field.field_type, &field.values)?;
            let mut f = FieldDef::new(&field.name, field_type, &field.description);
            f.mutable = field.mutable;
            def = def.field(f);
        }

        for rel in &self.relationships {
            def = def.relationship(RelationshipDef {
                name: rel.name.clone(),
                target: RelationTarget {
                    entity: rel.target.clone(),
                    cardinality: if rel.many {
                        Cardinality::Many
                    } else {
                        Cardinality::One
                    },
                },
                description: rel.description.clone(),
                inline: rel.inline,
            });
        }

        Ok(def)
    }
}
