//! The application registry.
//!
//! An [`EnrichApp`] owns the registered entity declarations, the resolvers
//! bound to their relationships and the tools exposed to agents. It is built
//! mutably, checked once with [`EnrichApp::finalize`] and then shared
//! read-only (typically as `Arc<EnrichApp>`) by the server.

use crate::datamodel::{DataModelSummary, ModelDescription, USAGE_HINT};
use crate::error::EnrichError;
use crate::inlining::{InlineOptions, inline_value};
use crate::resolver::{Resolver, ResolverContext, ResolverRegistry};
use crate::tools::{
    ParamDef, ToolEntry, ToolHandler, ToolKind, ToolRegistry, ToolSpec, ToolTarget,
    normalize_tool_name, tool_definition,
};
use crate::protocol::ToolDefinition;
use enrich_core::{EntityDef, EntityValue};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Registry of entities, resolvers and tools.
pub struct EnrichApp {
    title: String,
    instructions: String,
    entities: Vec<EntityDef>,
    index: HashMap<String, usize>,
    resolvers: ResolverRegistry,
    tools: ToolRegistry,
    finalized: bool,
}

impl fmt::Debug for EnrichApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrichApp")
            .field("title", &self.title)
            .field(
                "entities",
                &self.entities.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            )
            .field("tools", &self.tools.names())
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl EnrichApp {
    /// Create an app. The data model exploration tool is registered
    /// immediately.
    pub fn new(title: impl Into<String>, instructions: impl Into<String>) -> Self {
        let mut app = Self {
            title: title.into(),
            instructions: instructions.into(),
            entities: Vec::new(),
            index: HashMap::new(),
            resolvers: ResolverRegistry::new(),
            tools: ToolRegistry::new(),
            finalized: false,
        };
        app.register_data_model_tool();
        app
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Name of the built-in data model tool, e.g. `explore_shop_data_model`.
    pub fn data_model_tool_name(&self) -> String {
        format!("explore_{}_data_model", normalize_tool_name(&self.title))
    }

    fn register_data_model_tool(&mut self) {
        let description = format!(
            "IMPORTANT: Call this tool at the start of an agent session before using other \
             tools on the {} server. {} This provides a comprehensive overview of the API \
             structure, including all entities, their fields, relationships, and semantic \
             meanings. You don't need to call it again if its response is already in context.",
            self.title, self.instructions
        );
        let description = self.prefixed_description(ToolKind::Retriever, &description);
        self.tools.register(ToolEntry::without_params(
            self.data_model_tool_name(),
            description,
            ToolKind::Retriever,
            ToolTarget::DataModel,
        ));
    }

    /// Standard usage prefix shared by every tool description.
    fn prefixed_description(&self, kind: ToolKind, description: &str) -> String {
        format!(
            "This is a {} for the {} server. Use it after calling {}. {}",
            kind,
            self.title,
            self.data_model_tool_name(),
            description
        )
        .trim()
        .to_string()
    }

    // ----- entities -----

    /// Register an entity declaration.
    ///
    /// Fails when a description is missing, a field name repeats or an
    /// entity with the same name exists.
    pub fn entity(&mut self, def: EntityDef) -> Result<(), EnrichError> {
        def.validate()?;
        if self.index.contains_key(&def.name) {
            return Err(EnrichError::DuplicateEntity(def.name));
        }

        tracing::debug!(
            entity = %def.name,
            fields = def.fields.len(),
            relationships = def.relationships.len(),
            "Registered entity"
        );

        self.index.insert(def.name.clone(), self.entities.len());
        self.entities.push(def);
        Ok(())
    }

    /// Registered entity declarations, in registration order.
    pub fn entities(&self) -> &[EntityDef] {
        &self.entities
    }

    pub fn entity_def(&self, name: &str) -> Option<&EntityDef> {
        self.index.get(name).map(|&i| &self.entities[i])
    }

    // ----- resolvers -----

    /// Bind a resolver to `entity.field` under the default name
    /// `get_{entity}_{field}`.
    pub fn resolver<F, Fut>(&mut self, entity: &str, field: &str, f: F) -> Result<(), EnrichError>
    where
        F: Fn(ResolverContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<EntityValue>> + Send + 'static,
    {
        let name = format!("get_{}_{}", entity.to_lowercase(), field);
        self.bind_resolver(entity, field, name, Arc::new(f))
    }

    /// Bind a resolver to `entity.field` under an explicit name.
    pub fn named_resolver<F, Fut>(
        &mut self,
        entity: &str,
        field: &str,
        name: impl Into<String>,
        f: F,
    ) -> Result<(), EnrichError>
    where
        F: Fn(ResolverContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<EntityValue>> + Send + 'static,
    {
        self.bind_resolver(entity, field, name, Arc::new(f))
    }

    /// Bind a resolver object to `entity.field`.
    ///
    /// The resolver is also exposed as a tool of kind `resolver` taking the
    /// entity's id parameter. Re-binding a name on the same relationship
    /// replaces the earlier resolver and keeps its position; a name already
    /// used by any other tool is rejected.
    pub fn bind_resolver(
        &mut self,
        entity: &str,
        field: &str,
        name: impl Into<String>,
        resolver: Arc<dyn Resolver>,
    ) -> Result<(), EnrichError> {
        self.bind_resolver_with(entity, field, name, resolver, Vec::new())
    }

    /// [`bind_resolver`](Self::bind_resolver) with extra tool parameters
    /// after the id, such as paging controls.
    pub fn bind_resolver_with(
        &mut self,
        entity: &str,
        field: &str,
        name: impl Into<String>,
        resolver: Arc<dyn Resolver>,
        params: Vec<ParamDef>,
    ) -> Result<(), EnrichError> {
        let name = name.into();
        let def = self
            .entity_def(entity)
            .ok_or_else(|| EnrichError::UnknownEntity(entity.to_string()))?;
        let rel = def
            .get_relationship(field)
            .ok_or_else(|| EnrichError::UnknownRelationship {
                entity: entity.to_string(),
                field: field.to_string(),
            })?;

        let id = ParamDef::new(def.id_param(), def.id_type())
            .describe(format!("Identifier of the {}", def.name));
        let spec = params.into_iter().fold(
            ToolSpec::new(name.clone())
                .description(rel.description.clone())
                .param(id),
            ToolSpec::param,
        );
        let target = ToolTarget::Resolver {
            entity: def.name.clone(),
            field: rel.name.clone(),
            name: name.clone(),
        };

        self.register(ToolKind::Resolver, spec, target)?;
        self.resolvers.bind(entity, field, name.clone(), resolver);

        tracing::debug!(entity, field, resolver = %name, "Bound resolver");
        Ok(())
    }

    /// Whether at least one resolver is bound to `entity.field`.
    pub fn is_resolved(&self, entity: &str, field: &str) -> bool {
        self.resolvers.is_resolved(entity, field)
    }

    pub fn resolvers(&self) -> &ResolverRegistry {
        &self.resolvers
    }

    // ----- tools -----

    /// Register a retriever tool.
    pub fn retrieve<F, Fut>(&mut self, spec: ToolSpec, f: F) -> Result<(), EnrichError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<EntityValue>> + Send + 'static,
    {
        self.tool(ToolKind::Retriever, spec, Arc::new(f))
    }

    /// Register a creator tool.
    pub fn create<F, Fut>(&mut self, spec: ToolSpec, f: F) -> Result<(), EnrichError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<EntityValue>> + Send + 'static,
    {
        self.tool(ToolKind::Creator, spec, Arc::new(f))
    }

    /// Register an updater tool.
    pub fn update<F, Fut>(&mut self, spec: ToolSpec, f: F) -> Result<(), EnrichError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<EntityValue>> + Send + 'static,
    {
        self.tool(ToolKind::Updater, spec, Arc::new(f))
    }

    /// Register a deleter tool.
    pub fn delete<F, Fut>(&mut self, spec: ToolSpec, f: F) -> Result<(), EnrichError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<EntityValue>> + Send + 'static,
    {
        self.tool(ToolKind::Deleter, spec, Arc::new(f))
    }

    /// Register a tool with a handler object.
    pub fn tool(
        &mut self,
        kind: ToolKind,
        spec: ToolSpec,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), EnrichError> {
        self.register(kind, spec, ToolTarget::Handler(handler))
    }

    fn register(
        &mut self,
        kind: ToolKind,
        spec: ToolSpec,
        target: ToolTarget,
    ) -> Result<(), EnrichError> {
        let description = spec
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| EnrichError::MissingToolDescription {
                name: spec.name.clone(),
            })?;

        if let Some(existing) = self.tools.get(&spec.name) {
            if !existing.target.rebinds(&target) {
                return Err(EnrichError::DuplicateTool {
                    name: spec.name.clone(),
                });
            }
        }

        let prefixed = self.prefixed_description(kind, description);
        let definition = tool_definition(kind, &spec, spec.with_hints(&prefixed));
        let entry = ToolEntry::new(definition, kind, target)?;

        tracing::debug!(tool = %spec.name, kind = %kind, "Registered tool");
        self.tools.register(entry);
        Ok(())
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Tool definitions in registration order.
    pub fn list_tools(&self) -> Vec<&ToolDefinition> {
        self.tools.list()
    }

    /// Validate `arguments` against the tool's input schema and run it.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> anyhow::Result<EntityValue> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| EnrichError::ToolNotFound {
                name: name.to_string(),
            })?;

        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        entry.validate_arguments(&arguments)?;

        match &entry.target {
            ToolTarget::Handler(handler) => handler.call(arguments).await,
            ToolTarget::Resolver {
                entity,
                field,
                name,
            } => {
                let resolver = self
                    .resolvers
                    .get(entity, field)
                    .and_then(|set| set.get(name))
                    .cloned()
                    .ok_or_else(|| EnrichError::ToolNotFound { name: name.clone() })?;
                let args = match arguments {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                resolver
                    .resolve(ResolverContext::from_arguments(entity.clone(), args))
                    .await
            }
            ToolTarget::DataModel => {
                let summary = serde_json::to_value(self.data_model_summary())?;
                Ok(EntityValue::Json(summary))
            }
        }
    }

    /// Run a tool and inline the relationships of retriever results.
    pub async fn call_tool_inlined(
        &self,
        name: &str,
        arguments: Value,
        options: InlineOptions,
    ) -> anyhow::Result<EntityValue> {
        let value = self.call_tool(name, arguments).await?;
        match self.tools.get(name).map(|e| e.kind) {
            Some(ToolKind::Retriever) => inline_value(self, value, options).await,
            _ => Ok(value),
        }
    }

    // ----- startup checks -----

    /// Fail with every relationship that has no resolver, as
    /// `"Entity.field"`, in registration and declaration order.
    pub fn check_resolvers(&self) -> Result<(), EnrichError> {
        let unresolved: Vec<String> = self
            .entities
            .iter()
            .flat_map(|def| {
                def.relationships
                    .iter()
                    .filter(|rel| !self.resolvers.is_resolved(&def.name, &rel.name))
                    .map(|rel| format!("{}.{}", def.name, rel.name))
            })
            .collect();

        if unresolved.is_empty() {
            Ok(())
        } else {
            Err(EnrichError::UnresolvedRelationships(unresolved))
        }
    }

    fn check_targets(&self) -> Result<(), EnrichError> {
        for def in &self.entities {
            for rel in &def.relationships {
                if !self.index.contains_key(&rel.target.entity) {
                    return Err(EnrichError::UnknownRelationshipTarget {
                        entity: def.name.clone(),
                        field: rel.name.clone(),
                        target: rel.target.entity.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Run the startup checks. The server refuses to start an app that has
    /// not been finalized.
    pub fn finalize(&mut self) -> Result<(), EnrichError> {
        self.check_targets()?;
        self.check_resolvers()?;
        self.finalized = true;

        tracing::info!(
            title = %self.title,
            entities = self.entities.len(),
            tools = self.tools.len(),
            "Application finalized"
        );
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    // ----- description -----

    pub fn describe_model_struct(&self) -> ModelDescription {
        ModelDescription::new(&self.title, &self.instructions, &self.entities)
    }

    /// Markdown description of the whole model.
    pub fn describe_model(&self) -> String {
        self.describe_model_struct().to_string()
    }

    pub fn data_model_summary(&self) -> DataModelSummary {
        DataModelSummary {
            title: self.title.clone(),
            description: self.instructions.clone(),
            entity_count: self.entities.len(),
            entities: self.entities.iter().map(|e| e.name.clone()).collect(),
            model: self.describe_model(),
            usage_hint: USAGE_HINT.to_string(),
        }
    }
}
