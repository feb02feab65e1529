//! Relationship resolvers.
//!
//! A resolver is an async function bound to one relationship of one entity.
//! It receives a [`ResolverContext`] describing the source entity and returns
//! the related value(s). Resolvers are held per relationship in an
//! insertion-ordered [`ResolverSet`]; the inlining engine always uses the
//! first one registered.

use crate::error::EnrichError;
use async_trait::async_trait;
use enrich_core::{Entity, EntityValue};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Identifying values passed to a resolver.
///
/// Built either from an entity instance (during inlining) or from the
/// arguments of a resolver tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverContext {
    entity: String,
    attributes: Map<String, Value>,
}

impl ResolverContext {
    /// Context for resolving a relationship of `entity`.
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            entity: entity.kind().to_string(),
            attributes: entity.attributes().clone(),
        }
    }

    /// Context built from tool call arguments for a relationship of `entity`.
    pub fn from_arguments(entity: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            entity: entity.into(),
            attributes: arguments,
        }
    }

    /// Name of the source entity type.
    pub fn entity_name(&self) -> &str {
        &self.entity
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Conventional id parameter of the source entity, e.g. `user_id`.
    pub fn id_param(&self) -> String {
        format!("{}_id", self.entity.to_lowercase())
    }

    /// Look up an argument by name.
    ///
    /// Matches an attribute of the same name first, then maps the
    /// `{entity}_id` convention onto the source's `id`.
    pub fn arg(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.attributes.get(name) {
            return Some(value);
        }
        if name == self.id_param() {
            return self.attributes.get("id");
        }
        None
    }

    /// Identifier of the source entity, from `id` or `{entity}_id`.
    pub fn parent_id(&self) -> Option<&Value> {
        self.attributes
            .get("id")
            .or_else(|| self.attributes.get(&self.id_param()))
    }

    /// Look up and deserialize a required argument.
    pub fn require<T: DeserializeOwned>(&self, name: &str) -> Result<T, EnrichError> {
        let value = self
            .arg(name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| EnrichError::MissingArgument {
                entity: self.entity.clone(),
                name: name.to_string(),
            })?;

        serde_json::from_value(value.clone()).map_err(|e| EnrichError::InvalidResolverArgument {
            entity: self.entity.clone(),
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}

/// An async function producing the value of a relationship.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, ctx: ResolverContext) -> anyhow::Result<EntityValue>;
}

#[async_trait]
impl<F, Fut> Resolver for F
where
    F: Fn(ResolverContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<EntityValue>> + Send + 'static,
{
    async fn resolve(&self, ctx: ResolverContext) -> anyhow::Result<EntityValue> {
        (self)(ctx).await
    }
}

/// Insertion-ordered resolvers of a single relationship.
#[derive(Clone, Default)]
pub struct ResolverSet {
    entries: Vec<(String, Arc<dyn Resolver>)>,
}

impl ResolverSet {
    /// Store a resolver under `name`. An existing entry with the same name is
    /// replaced in place and keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, resolver: Arc<dyn Resolver>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = resolver,
            None => self.entries.push((name, resolver)),
        }
    }

    /// The resolver used for inlining.
    pub fn first(&self) -> Option<&Arc<dyn Resolver>> {
        self.entries.first().map(|(_, r)| r)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Resolver>> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolvers for every relationship, keyed by entity and field name.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    slots: HashMap<(String, String), ResolverSet>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a resolver to `entity.field` under `name`.
    pub fn bind(
        &mut self,
        entity: &str,
        field: &str,
        name: impl Into<String>,
        resolver: Arc<dyn Resolver>,
    ) {
        self.slots
            .entry((entity.to_string(), field.to_string()))
            .or_default()
            .insert(name, resolver);
    }

    /// Resolvers bound to `entity.field`.
    pub fn get(&self, entity: &str, field: &str) -> Option<&ResolverSet> {
        self.slots.get(&(entity.to_string(), field.to_string()))
    }

    /// The resolver the inlining engine uses for `entity.field`.
    pub fn first(&self, entity: &str, field: &str) -> Option<Arc<dyn Resolver>> {
        self.get(entity, field).and_then(|set| set.first().cloned())
    }

    /// A relationship is resolved iff at least one resolver is bound.
    pub fn is_resolved(&self, entity: &str, field: &str) -> bool {
        self.get(entity, field).is_some_and(|set| !set.is_empty())
    }
}
