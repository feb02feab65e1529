//! Entity instances.
//!
//! An [`Entity`] is a record produced by application code: the name of its
//! entity type, its plain attributes, and the relationship slots that have
//! been filled so far. Relationship slots start unset and are written in
//! place by the inlining engine.

use crate::error::ModelError;
use crate::model::EntityDef;
use crate::pagination::PageResult;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// An instance of a registered entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    kind: String,
    attributes: Map<String, Value>,
    relations: BTreeMap<String, EntityValue>,
}

impl Entity {
    /// Create an empty instance of the given entity type.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Map::new(),
            relations: BTreeMap::new(),
        }
    }

    /// Build an instance from a JSON object of attributes.
    pub fn from_json(kind: impl Into<String>, value: Value) -> Result<Self, ModelError> {
        let kind = kind.into();
        match value {
            Value::Object(attributes) => Ok(Self {
                kind,
                attributes,
                relations: BTreeMap::new(),
            }),
            _ => Err(ModelError::NotAnObject { entity: kind }),
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Name of the entity type.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// The `id` attribute, if present.
    pub fn id(&self) -> Option<&Value> {
        self.attributes.get("id")
    }

    /// Value of a relationship slot, `None` while unset.
    pub fn relation(&self, name: &str) -> Option<&EntityValue> {
        self.relations.get(name)
    }

    /// Write a relationship slot, replacing any previous value.
    pub fn set_relation(&mut self, name: impl Into<String>, value: EntityValue) {
        self.relations.insert(name.into(), value);
    }

    /// Whether a relationship slot has been written.
    pub fn is_set(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Apply a patch of mutable fields.
    ///
    /// Keys must name mutable fields of `def`; `null` values are treated as
    /// "not provided" and leave the attribute untouched.
    pub fn apply_patch(&mut self, def: &EntityDef, patch: &Map<String, Value>) -> Result<(), ModelError> {
        for (name, value) in patch {
            let field = def.get_field(name).ok_or_else(|| ModelError::UnknownField {
                entity: def.name.clone(),
                field: name.clone(),
            })?;

            if !field.mutable {
                return Err(ModelError::ImmutableField {
                    entity: def.name.clone(),
                    field: name.clone(),
                });
            }

            if value.is_null() {
                continue;
            }

            if !field.field_type.accepts(value) {
                return Err(ModelError::InvalidFieldValue {
                    entity: def.name.clone(),
                    field: name.clone(),
                    expected: field.field_type.to_string(),
                });
            }
        }

        for (name, value) in patch {
            if !value.is_null() {
                self.attributes.insert(name.clone(), value.clone());
            }
        }

        Ok(())
    }

    /// JSON representation: attributes followed by the relationship slots
    /// that have been written.
    pub fn to_json(&self) -> Value {
        let mut out = self.attributes.clone();
        for (name, value) in &self.relations {
            out.insert(name.clone(), value.to_json());
        }
        Value::Object(out)
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// A value returned by a resolver or a tool handler.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityValue {
    /// A single entity instance.
    Entity(Entity),
    /// A sequence; elements are processed independently and keep their order.
    List(Vec<EntityValue>),
    /// One page of a sequence; items are processed like a list.
    Page(PageResult),
    /// Anything else, passed through untouched. Text is always a `Json` value.
    Json(Value),
}

impl EntityValue {
    /// The JSON `null` value, e.g. for an empty to-one relationship.
    pub fn null() -> Self {
        EntityValue::Json(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, EntityValue::Json(Value::Null))
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            EntityValue::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[EntityValue]> {
        match self {
            EntityValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_page(&self) -> Option<&PageResult> {
        match self {
            EntityValue::Page(page) => Some(page),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            EntityValue::Entity(e) => e.to_json(),
            EntityValue::List(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            EntityValue::Page(page) => page.to_json(),
            EntityValue::Json(v) => v.clone(),
        }
    }
}

impl From<Entity> for EntityValue {
    fn from(entity: Entity) -> Self {
        EntityValue::Entity(entity)
    }
}

impl From<Option<Entity>> for EntityValue {
    fn from(entity: Option<Entity>) -> Self {
        entity.map(EntityValue::Entity).unwrap_or_else(EntityValue::null)
    }
}

impl From<Vec<Entity>> for EntityValue {
    fn from(entities: Vec<Entity>) -> Self {
        EntityValue::List(entities.into_iter().map(EntityValue::Entity).collect())
    }
}

impl From<PageResult> for EntityValue {
    fn from(page: PageResult) -> Self {
        EntityValue::Page(page)
    }
}

impl From<Value> for EntityValue {
    fn from(value: Value) -> Self {
        EntityValue::Json(value)
    }
}

impl Serialize for EntityValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
