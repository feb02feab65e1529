//! Automatic registration from a model file.
//!
//! [`include_models`] registers every entity of a [`ModelFile`] together with
//! a default set of tools backed by a [`MemoryStore`]:
//!
//! - `list_{entity}s` returns one [`PageResult`] of rows with the total count
//! - `get_{entity}` fetches one row by `{entity}_id`
//! - `update_{entity}` applies a patch of mutable fields
//!
//! Relationships that declare a `join` get a resolver; the rest are left for
//! application code to bind. To-many joins are paged too, without a total:
//! one extra row is read to tell whether a next page exists.

use crate::app::EnrichApp;
use crate::error::EnrichError;
use crate::resolver::{Resolver, ResolverContext};
use crate::tools::{ParamDef, ToolSpec};
use enrich_core::config::{EntitySpec, JoinSpec, RelationshipSpec};
use enrich_core::{Entity, EntityDef, EntityValue, FieldType, ModelFile, PageResult};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Row = Map<String, Value>;

const DEFAULT_PAGE_SIZE: usize = 20;

/// In-memory tables of JSON rows, keyed by entity name.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from `{ "Entity": [ {row}, ... ], ... }`.
    pub fn from_json(data: Value) -> Result<Self, EnrichError> {
        let Value::Object(tables) = data else {
            return Err(EnrichError::InvalidData(
                "expected an object keyed by entity name".to_string(),
            ));
        };

        let mut out = HashMap::new();
        for (entity, rows) in tables {
            let Value::Array(rows) = rows else {
                return Err(EnrichError::InvalidData(format!(
                    "rows of '{}' must be an array",
                    entity
                )));
            };
            let rows = rows
                .into_iter()
                .enumerate()
                .map(|(i, row)| match row {
                    Value::Object(row) => Ok(row),
                    _ => Err(EnrichError::InvalidData(format!(
                        "row {} of '{}' is not an object",
                        i, entity
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            out.insert(entity, rows);
        }

        Ok(Self {
            tables: RwLock::new(out),
        })
    }

    pub async fn insert(&self, entity: &str, row: Row) {
        self.tables
            .write()
            .await
            .entry(entity.to_string())
            .or_default()
            .push(row);
    }

    /// Number of rows stored for `entity`.
    pub async fn count(&self, entity: &str) -> usize {
        self.tables.read().await.get(entity).map_or(0, |rows| rows.len())
    }

    /// One page of rows. Pages start at 1.
    pub async fn page(&self, entity: &str, page: usize, page_size: usize) -> Vec<Row> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(entity) else {
            return Vec::new();
        };
        let offset = page.saturating_sub(1).saturating_mul(page_size);
        rows.iter().skip(offset).take(page_size).cloned().collect()
    }

    /// Rows whose `column` equals `value`, in storage order.
    pub async fn find_by(&self, entity: &str, column: &str, value: &Value) -> Vec<Row> {
        let tables = self.tables.read().await;
        tables
            .get(entity)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.get(column) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The row whose `id` equals `id`.
    pub async fn get(&self, entity: &str, id: &Value) -> Option<Row> {
        self.find_by(entity, "id", id).await.into_iter().next()
    }

    /// Replace the attributes of the row whose `id` equals `id`.
    pub async fn replace(&self, entity: &str, id: &Value, row: Row) -> bool {
        let mut tables = self.tables.write().await;
        let slot = tables
            .get_mut(entity)
            .and_then(|rows| rows.iter_mut().find(|r| r.get("id") == Some(id)));
        match slot {
            Some(slot) => {
                *slot = row;
                true
            }
            None => false,
        }
    }
}

fn to_entity(kind: &str, row: Row) -> Result<Entity, EnrichError> {
    Ok(Entity::from_json(kind, Value::Object(row))?)
}

/// Register the entities of `model` on `app`, with default tools and join
/// resolvers reading from `store`.
pub fn include_models(
    app: &mut EnrichApp,
    model: &ModelFile,
    store: Arc<MemoryStore>,
) -> Result<(), EnrichError> {
    let mut defs = Vec::with_capacity(model.entities.len());
    for spec in &model.entities {
        let def = spec.to_def()?;
        app.entity(def.clone())?;
        defs.push(def);
    }

    for (spec, def) in model.entities.iter().zip(&defs) {
        register_list(app, def, store.clone())?;
        register_get(app, def, store.clone())?;
        register_update(app, def, store.clone())?;
        register_joins(app, spec, store.clone())?;
    }

    tracing::info!(
        entities = defs.len(),
        tools = app.tools().len(),
        "Included model entities"
    );
    Ok(())
}

fn paging_param(name: &str, description: &str, default: usize) -> ParamDef {
    let mut param = ParamDef::new(name, FieldType::Integer)
        .describe(description)
        .example(default)
        .optional();
    param.schema = json!({ "type": "integer", "minimum": 1 });
    param
}

fn register_list(app: &mut EnrichApp, def: &EntityDef, store: Arc<MemoryStore>) -> Result<(), EnrichError> {
    let spec = ToolSpec::new(format!("list_{}s", def.lower_name()))
        .description(format!("List {} records", def.name))
        .param(paging_param("page", "Page number, starting at 1", 1))
        .param(paging_param("page_size", "Records per page", DEFAULT_PAGE_SIZE));

    let kind = def.name.clone();
    app.retrieve(spec, move |args: Value| {
        let store = store.clone();
        let kind = kind.clone();
        async move { list_rows(&store, &kind, &args).await }
    })
}

/// `page` and `page_size` from the arguments, defaulting to the first page.
fn paging<'a>(arg: impl Fn(&str) -> Option<&'a Value>) -> anyhow::Result<(usize, usize)> {
    let read = |name: &str, default: usize| -> anyhow::Result<usize> {
        match arg(name) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => match value.as_u64() {
                Some(n) if n >= 1 => Ok(n as usize),
                _ => anyhow::bail!("page and page_size must be >= 1"),
            },
        }
    };
    Ok((read("page", 1)?, read("page_size", DEFAULT_PAGE_SIZE)?))
}

async fn list_rows(store: &MemoryStore, kind: &str, args: &Value) -> anyhow::Result<EntityValue> {
    let (page, page_size) = paging(|name| args.get(name))?;
    let total = store.count(kind).await;

    let items = store
        .page(kind, page, page_size)
        .await
        .into_iter()
        .map(|row| to_entity(kind, row).map(EntityValue::Entity))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PageResult::with_total(items, page, page_size, total).into())
}

fn register_get(app: &mut EnrichApp, def: &EntityDef, store: Arc<MemoryStore>) -> Result<(), EnrichError> {
    let id_param = def.id_param();
    let spec = ToolSpec::new(format!("get_{}", def.lower_name()))
        .description(format!("Get a single {} by ID", def.name))
        .param(ParamDef::new(&id_param, def.id_type()));

    let kind = def.name.clone();
    app.retrieve(spec, move |args: Value| {
        let store = store.clone();
        let kind = kind.clone();
        let id = args[id_param.as_str()].clone();
        async move { get_row(&store, &kind, &id).await }
    })
}

async fn get_row(store: &MemoryStore, kind: &str, id: &Value) -> anyhow::Result<EntityValue> {
    match store.get(kind, id).await {
        Some(row) => Ok(EntityValue::Entity(to_entity(kind, row)?)),
        None => Ok(EntityValue::null()),
    }
}

fn register_update(app: &mut EnrichApp, def: &EntityDef, store: Arc<MemoryStore>) -> Result<(), EnrichError> {
    let Some(patch) = ParamDef::patch(def) else {
        return Ok(());
    };
    let id_param = def.id_param();
    let spec = ToolSpec::new(format!("update_{}", def.lower_name()))
        .description(format!("Update mutable fields of a {}", def.name))
        .param(ParamDef::new(&id_param, def.id_type()))
        .param(patch);

    let def = def.clone();
    app.update(spec, move |args: Value| {
        let store = store.clone();
        let def = def.clone();
        let id = args[id_param.as_str()].clone();
        let patch = args["patch"].as_object().cloned().unwrap_or_default();
        async move { update_row(&store, &def, &id, &patch).await }
    })
}

async fn update_row(
    store: &MemoryStore,
    def: &EntityDef,
    id: &Value,
    patch: &Row,
) -> anyhow::Result<EntityValue> {
    let row = store
        .get(&def.name, id)
        .await
        .ok_or_else(|| anyhow::anyhow!("{} {} not found", def.name, id))?;

    let mut entity = to_entity(&def.name, row)?;
    entity.apply_patch(def, patch)?;
    store
        .replace(&def.name, id, entity.attributes().clone())
        .await;
    Ok(EntityValue::Entity(entity))
}

fn register_joins(app: &mut EnrichApp, spec: &EntitySpec, store: Arc<MemoryStore>) -> Result<(), EnrichError> {
    for rel in &spec.relationships {
        let Some(join) = rel.join.clone() else {
            tracing::debug!(
                entity = %spec.name,
                relationship = %rel.name,
                "No join declared; resolver must be bound in code"
            );
            continue;
        };
        bind_join(app, &spec.name, rel, join, store.clone())?;
    }
    Ok(())
}

fn bind_join(
    app: &mut EnrichApp,
    source: &str,
    rel: &RelationshipSpec,
    join: JoinSpec,
    store: Arc<MemoryStore>,
) -> Result<(), EnrichError> {
    let join = Arc::new(Join {
        source: source.to_string(),
        target: rel.target.clone(),
        many: rel.many,
        spec: join,
    });

    let params = if rel.many {
        vec![
            paging_param("page", "Page number, starting at 1", 1),
            paging_param("page_size", "Records per page", DEFAULT_PAGE_SIZE),
        ]
    } else {
        Vec::new()
    };
    let resolver: Arc<dyn Resolver> = Arc::new(move |ctx: ResolverContext| {
        let store = store.clone();
        let join = join.clone();
        async move { join.resolve(&store, &ctx).await }
    });

    let name = format!("get_{}_{}", source.to_lowercase(), rel.name);
    app.bind_resolver_with(source, &rel.name, name, resolver, params)
}

/// A relationship resolved by matching columns.
struct Join {
    source: String,
    target: String,
    many: bool,
    spec: JoinSpec,
}

impl Join {
    async fn resolve(&self, store: &MemoryStore, ctx: &ResolverContext) -> anyhow::Result<EntityValue> {
        if self.many {
            return self.resolve_page(store, ctx).await;
        }

        let key = join_key(store, &self.source, &self.spec, ctx).await?;
        if key.is_null() {
            return Ok(EntityValue::null());
        }
        let rows = store.find_by(&self.target, &self.spec.remote, &key).await;
        match rows.into_iter().next() {
            Some(row) => Ok(EntityValue::Entity(to_entity(&self.target, row)?)),
            None => Ok(EntityValue::null()),
        }
    }

    async fn resolve_page(&self, store: &MemoryStore, ctx: &ResolverContext) -> anyhow::Result<EntityValue> {
        let (page, page_size) = paging(|name| ctx.arg(name))?;
        let key = join_key(store, &self.source, &self.spec, ctx).await?;
        if key.is_null() {
            return Ok(PageResult::new(Vec::new(), page, page_size, false, None).into());
        }

        let offset = (page - 1).saturating_mul(page_size);
        let mut rows: Vec<Row> = store
            .find_by(&self.target, &self.spec.remote, &key)
            .await
            .into_iter()
            .skip(offset)
            .take(page_size.saturating_add(1))
            .collect();
        let has_next = rows.len() > page_size;
        rows.truncate(page_size);

        let items = rows
            .into_iter()
            .map(|row| to_entity(&self.target, row).map(EntityValue::Entity))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PageResult::new(items, page, page_size, has_next, None).into())
    }
}

/// Value of the join's `local` attribute for the source entity.
///
/// Taken from the context when present. Otherwise the source row is looked
/// up by its id (as passed to a resolver tool).
async fn join_key(
    store: &MemoryStore,
    source: &str,
    join: &JoinSpec,
    ctx: &ResolverContext,
) -> Result<Value, EnrichError> {
    if let Some(value) = ctx.arg(&join.local) {
        return Ok(value.clone());
    }

    let parent_id = ctx.parent_id().ok_or_else(|| EnrichError::MissingArgument {
        entity: source.to_string(),
        name: ctx.id_param(),
    })?;

    if join.local == "id" {
        return Ok(parent_id.clone());
    }

    Ok(store
        .get(source, parent_id)
        .await
        .and_then(|row| row.get(&join.local).cloned())
        .unwrap_or(Value::Null))
}
