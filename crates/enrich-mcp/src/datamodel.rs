//! Data model description.
//!
//! Structured and Markdown views of every registered entity, served to
//! agents by the built-in `explore_*_data_model` tool.

use enrich_core::EntityDef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Description of one plain field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub description: String,
    pub mutable: bool,
}

/// Description of one relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDescription {
    pub name: String,
    pub target: String,
    pub description: String,
}

/// Description of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescription {
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldDescription>,
    pub relationships: Vec<RelationshipDescription>,
}

impl From<&EntityDef> for EntityDescription {
    fn from(def: &EntityDef) -> Self {
        Self {
            name: def.name.clone(),
            description: def.description.trim().to_string(),
            fields: def
                .fields
                .iter()
                .map(|f| FieldDescription {
                    name: f.name.clone(),
                    field_type: f.field_type.to_string(),
                    description: f.description.clone(),
                    mutable: f.mutable,
                })
                .collect(),
            relationships: def
                .relationships
                .iter()
                .map(|r| RelationshipDescription {
                    name: r.name.clone(),
                    target: r.target.to_string(),
                    description: r.description.clone(),
                })
                .collect(),
        }
    }
}

/// Description of the whole model. Entities are sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub title: String,
    pub description: String,
    pub entities: Vec<EntityDescription>,
}

impl ModelDescription {
    pub fn new<'a>(
        title: impl Into<String>,
        description: impl Into<String>,
        defs: impl IntoIterator<Item = &'a EntityDef>,
    ) -> Self {
        let mut entities: Vec<EntityDescription> =
            defs.into_iter().map(EntityDescription::from).collect();
        entities.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            title: title.into(),
            description: description.into(),
            entities,
        }
    }
}

impl fmt::Display for ModelDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Data Model: {}", self.title)?;
        if !self.description.is_empty() {
            writeln!(f, "{}", self.description)?;
        }

        if self.entities.is_empty() {
            writeln!(f)?;
            return write!(f, "*No entities registered*");
        }

        writeln!(f)?;
        writeln!(f, "## Table of Contents")?;
        for entity in &self.entities {
            writeln!(f, "- [{}](#{})", entity.name, entity.name.to_lowercase())?;
        }

        for entity in &self.entities {
            writeln!(f)?;
            writeln!(f, "## {}", entity.name)?;
            writeln!(f, "{}", entity.description)?;

            if !entity.fields.is_empty() {
                writeln!(f)?;
                writeln!(f, "### Fields")?;
                for field in &entity.fields {
                    let mutable = if field.mutable { ", mutable" } else { "" };
                    writeln!(
                        f,
                        "- **{}** ({}{}): {}",
                        field.name, field.field_type, mutable, field.description
                    )?;
                }
            }

            if !entity.relationships.is_empty() {
                writeln!(f)?;
                writeln!(f, "### Relationships")?;
                for rel in &entity.relationships {
                    writeln!(f, "- **{}** → {}: {}", rel.name, rel.target, rel.description)?;
                }
            }
        }

        Ok(())
    }
}

/// Result of the built-in data model exploration tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataModelSummary {
    pub title: String,
    pub description: String,
    pub entity_count: usize,
    pub entities: Vec<String>,
    /// Full Markdown model description.
    pub model: String,
    pub usage_hint: String,
}

pub(crate) const USAGE_HINT: &str = "Use the model information above to understand how to query the data. \
Each entity has fields and relationships. Relationships must be resolved separately \
using their specific resolver endpoints.";

impl fmt::Display for DataModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.title)?;
        if !self.description.is_empty() {
            writeln!(f, "{}", self.description)?;
        }
        writeln!(f)?;
        writeln!(f, "**Entity count:** {}", self.entity_count)?;
        if !self.entities.is_empty() {
            writeln!(f)?;
            writeln!(f, "## Entities")?;
            let mut names: Vec<&String> = self.entities.iter().collect();
            names.sort();
            for name in names {
                writeln!(f, "- {}", name)?;
            }
        }
        writeln!(f)?;
        writeln!(f, "{}", self.model)?;
        writeln!(f)?;
        write!(f, "{}", self.usage_hint)
    }
}
