//! Relationship inlining.
//!
//! Walks the relationship graph of an entity instance, calls the first
//! resolver bound to each relationship and writes the result onto the
//! instance in place. Depth is the only bound on the walk: a cycle between
//! two entity types is cut off once `max_depth` is reached.
//!
//! Resolver errors are returned unchanged. Relationships assigned before the
//! failure stay assigned.

use crate::app::EnrichApp;
use crate::error::EnrichError;
use crate::resolver::ResolverContext;
use enrich_core::{Entity, EntityValue, InliningConfig};
use futures::FutureExt;
use futures::future::BoxFuture;

/// Options controlling a single inlining call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineOptions {
    /// Relationships this many levels below the root are left unset.
    pub max_depth: usize,
    /// Skip relationships that are not flagged `inline`.
    pub only_inline: bool,
}

impl Default for InlineOptions {
    fn default() -> Self {
        Self {
            max_depth: 1,
            only_inline: false,
        }
    }
}

impl From<InliningConfig> for InlineOptions {
    fn from(config: InliningConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            only_inline: config.only_inline,
        }
    }
}

/// Resolve and embed the relationships of `entity`.
pub async fn inline_relationships(
    app: &EnrichApp,
    entity: &mut Entity,
    options: InlineOptions,
) -> anyhow::Result<()> {
    inline_at(app, entity, options, 0).await
}

/// Owned variant of [`inline_relationships`].
pub async fn inline_owned(
    app: &EnrichApp,
    mut entity: Entity,
    options: InlineOptions,
) -> anyhow::Result<Entity> {
    inline_relationships(app, &mut entity, options).await?;
    Ok(entity)
}

/// Inline every entity found in a tool result. Lists are processed element
/// by element; plain JSON passes through.
pub async fn inline_value(
    app: &EnrichApp,
    value: EntityValue,
    options: InlineOptions,
) -> anyhow::Result<EntityValue> {
    process_result(app, value, options, 0).await
}

fn inline_at<'a>(
    app: &'a EnrichApp,
    entity: &'a mut Entity,
    options: InlineOptions,
    depth: usize,
) -> BoxFuture<'a, anyhow::Result<()>> {
    async move {
        if depth >= options.max_depth {
            return Ok(());
        }

        let def = app
            .entity_def(entity.kind())
            .ok_or_else(|| EnrichError::UnknownEntity(entity.kind().to_string()))?;

        for rel in &def.relationships {
            if options.only_inline && !rel.inline {
                continue;
            }
            let Some(resolver) = app.resolvers().first(&def.name, &rel.name) else {
                continue;
            };

            tracing::debug!(
                entity = %def.name,
                relationship = %rel.name,
                depth,
                "Resolving relationship"
            );

            let ctx = ResolverContext::from_entity(entity);
            let value = resolver.resolve(ctx).await?;
            let value = process_result(app, value, options, depth + 1).await?;
            entity.set_relation(rel.name.clone(), value);
        }

        Ok(())
    }
    .boxed()
}

fn process_result(
    app: &EnrichApp,
    value: EntityValue,
    options: InlineOptions,
    depth: usize,
) -> BoxFuture<'_, anyhow::Result<EntityValue>> {
    async move {
        match value {
            EntityValue::Entity(mut child) => {
                inline_at(app, &mut child, options, depth).await?;
                Ok(EntityValue::Entity(child))
            }
            EntityValue::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(process_result(app, item, options, depth).await?);
                }
                Ok(EntityValue::List(out))
            }
            EntityValue::Page(mut page) => {
                let items = std::mem::take(&mut page.items);
                for item in items {
                    page.items.push(process_result(app, item, options, depth).await?);
                }
                Ok(EntityValue::Page(page))
            }
            other => Ok(other),
        }
    }
    .boxed()
}
