//! Entity model declarations.
//!
//! An [`EntityDef`] is an ordered list of described fields plus an ordered
//! list of [`RelationshipDef`]s. Declaration order matters: the inlining
//! engine walks relationships in the order they were declared.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::fmt;

/// Semantic type of a plain (non-relationship) field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// RFC 3339 timestamp carried as a string.
    Datetime,
    /// Any JSON value.
    Json,
    /// One of a fixed set of string values.
    Literal(Vec<String>),
}

impl FieldType {
    /// Parse a type name as written in a model file.
    ///
    /// `literal` needs its values supplied separately.
    pub fn parse(name: &str, values: &[String]) -> Result<Self, ModelError> {
        match name.to_lowercase().as_str() {
            "string" | "str" | "text" => Ok(FieldType::String),
            "integer" | "int" => Ok(FieldType::Integer),
            "number" | "float" | "decimal" => Ok(FieldType::Number),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "datetime" | "timestamp" => Ok(FieldType::Datetime),
            "json" | "any" => Ok(FieldType::Json),
            "literal" | "enum" if !values.is_empty() => Ok(FieldType::Literal(values.to_vec())),
            other => Err(ModelError::UnknownFieldType(other.to_string())),
        }
    }

    /// JSON Schema fragment for this type.
    pub fn json_schema(&self) -> Value {
        match self {
            FieldType::String => json!({ "type": "string" }),
            FieldType::Integer => json!({ "type": "integer" }),
            FieldType::Number => json!({ "type": "number" }),
            FieldType::Boolean => json!({ "type": "boolean" }),
            FieldType::Datetime => json!({ "type": "string", "format": "date-time" }),
            FieldType::Json => json!({}),
            FieldType::Literal(values) => json!({ "type": "string", "enum": values }),
        }
    }

    /// Check whether a JSON value is acceptable for this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Datetime => value
                .as_str()
                .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
            FieldType::Json => true,
            FieldType::Literal(values) => value
                .as_str()
                .is_some_and(|s| values.iter().any(|v| v == s)),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "str"),
            FieldType::Integer => write!(f, "int"),
            FieldType::Number => write!(f, "float"),
            FieldType::Boolean => write!(f, "bool"),
            FieldType::Datetime => write!(f, "datetime"),
            FieldType::Json => write!(f, "Any"),
            FieldType::Literal(values) => {
                let quoted: Vec<String> = values.iter().map(|v| format!("'{}'", v)).collect();
                write!(f, "Literal[{}]", quoted.join(", "))
            }
        }
    }
}

/// A described plain field of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub description: String,
    #[serde(default)]
    pub mutable: bool,
}

impl FieldDef {
    /// Create an immutable field.
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            description: description.into(),
            mutable: false,
        }
    }

    /// Mark the field as mutable (it becomes part of the patch schema).
    pub fn mutable(mut self) -> Self {
        self.mutable = true;
        self
    }
}

/// Whether a relationship points at one entity or a sequence of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

/// Target of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTarget {
    pub entity: String,
    pub cardinality: Cardinality,
}

impl fmt::Display for RelationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cardinality {
            Cardinality::One => write!(f, "{}", self.entity),
            Cardinality::Many => write!(f, "list[{}]", self.entity),
        }
    }
}

/// A typed, described relationship slot on an entity.
///
/// The resolver functions for the slot are held by the application registry,
/// keyed by owning entity and field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDef {
    pub name: String,
    pub target: RelationTarget,
    pub description: String,
    /// Traverse this relationship when inlining with `only_inline`.
    #[serde(default)]
    pub inline: bool,
}

impl RelationshipDef {
    /// Relationship to a single entity.
    pub fn one(
        name: impl Into<String>,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::with_cardinality(name, target, Cardinality::One, description)
    }

    /// Relationship to a sequence of entities.
    pub fn many(
        name: impl Into<String>,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::with_cardinality(name, target, Cardinality::Many, description)
    }

    fn with_cardinality(
        name: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: RelationTarget {
                entity: target.into(),
                cardinality,
            },
            description: description.into(),
            inline: false,
        }
    }

    /// Flag the relationship for default inlining.
    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }
}

/// Declaration of an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDef>,
}

impl EntityDef {
    /// Start declaring an entity.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            fields: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Append a plain field.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a relationship.
    pub fn relationship(mut self, relationship: RelationshipDef) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Check that the declaration is complete.
    ///
    /// Every entity, field and relationship needs a non-empty description and
    /// names must be unique across fields and relationships.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.description.trim().is_empty() {
            return Err(ModelError::MissingEntityDescription {
                entity: self.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ModelError::DuplicateField {
                    entity: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            if field.description.trim().is_empty() {
                return Err(ModelError::MissingFieldDescription {
                    entity: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        for rel in &self.relationships {
            if !seen.insert(rel.name.as_str()) {
                return Err(ModelError::DuplicateField {
                    entity: self.name.clone(),
                    field: rel.name.clone(),
                });
            }
            if rel.description.trim().is_empty() {
                return Err(ModelError::MissingRelationshipDescription {
                    entity: self.name.clone(),
                    field: rel.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Look up a plain field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a relationship by name.
    pub fn get_relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Fields that may be changed through a patch.
    pub fn mutable_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.mutable)
    }

    /// Lowercased entity name, used for tool and parameter names.
    pub fn lower_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// Conventional identifier parameter for this entity, e.g. `user_id`.
    pub fn id_param(&self) -> String {
        format!("{}_id", self.lower_name())
    }

    /// Type of the `id` field, defaulting to integer.
    pub fn id_type(&self) -> FieldType {
        self.get_field("id")
            .map(|f| f.field_type.clone())
            .unwrap_or(FieldType::Integer)
    }

    /// JSON Schema of the patch object for this entity.
    ///
    /// Every mutable field is optional and nullable. Returns `None` when the
    /// entity has no mutable fields.
    pub fn patch_schema(&self) -> Option<Value> {
        let mut properties = Map::new();
        for field in self.mutable_fields() {
            let mut schema = field.field_type.json_schema();
            if let Value::Object(ref mut obj) = schema {
                obj.insert("description".to_string(), json!(field.description));
            }
            properties.insert(
                field.name.clone(),
                json!({ "anyOf": [schema, { "type": "null" }] }),
            );
        }

        if properties.is_empty() {
            return None;
        }

        Some(json!({
            "type": "object",
            "title": format!("{}PatchModel", self.name),
            "description": format!("Patch model for {}", self.name),
            "properties": properties,
            "additionalProperties": false
        }))
    }
}
