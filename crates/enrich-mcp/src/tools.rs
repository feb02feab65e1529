//! Tool registry for MCP tools.
//!
//! Tools are registered by kind (retriever, creator, updater, deleter,
//! resolver). Each tool keeps its public [`ToolDefinition`], the compiled
//! validator for its input schema, and the target that handles a call.

use crate::error::EnrichError;
use crate::protocol::{ToolAnnotations, ToolDefinition};
use async_trait::async_trait;
use enrich_core::{EntityDef, EntityValue, FieldType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, LazyLock};

/// Kinds of MCP tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Retriever,
    Creator,
    Updater,
    Deleter,
    Resolver,
}

impl ToolKind {
    fn annotations(self) -> ToolAnnotations {
        match self {
            ToolKind::Retriever | ToolKind::Resolver => ToolAnnotations {
                read_only: Some(true),
                ..Default::default()
            },
            ToolKind::Creator => ToolAnnotations {
                read_only: Some(false),
                destructive: Some(false),
                ..Default::default()
            },
            ToolKind::Updater => ToolAnnotations {
                read_only: Some(false),
                destructive: Some(false),
                idempotent: Some(true),
            },
            ToolKind::Deleter => ToolAnnotations {
                read_only: Some(false),
                destructive: Some(true),
                idempotent: Some(true),
            },
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolKind::Retriever => "retriever",
            ToolKind::Creator => "creator",
            ToolKind::Updater => "updater",
            ToolKind::Deleter => "deleter",
            ToolKind::Resolver => "resolver",
        };
        write!(f, "{}", s)
    }
}

/// Handler for a registered tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> anyhow::Result<EntityValue>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<EntityValue>> + Send + 'static,
{
    async fn call(&self, arguments: Value) -> anyhow::Result<EntityValue> {
        (self)(arguments).await
    }
}

/// What runs when a tool is called.
#[derive(Clone)]
pub enum ToolTarget {
    /// An application-supplied handler.
    Handler(Arc<dyn ToolHandler>),
    /// A named resolver of a relationship.
    Resolver {
        entity: String,
        field: String,
        name: String,
    },
    /// The built-in data model summary.
    DataModel,
}

impl ToolTarget {
    /// Whether registering `other` over this target re-binds the same
    /// resolver of the same relationship.
    pub fn rebinds(&self, other: &ToolTarget) -> bool {
        match (self, other) {
            (
                ToolTarget::Resolver {
                    entity,
                    field,
                    name,
                },
                ToolTarget::Resolver {
                    entity: other_entity,
                    field: other_field,
                    name: other_name,
                },
            ) => entity == other_entity && field == other_field && name == other_name,
            _ => false,
        }
    }
}

/// A declared tool parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    pub name: String,
    pub schema: Value,
    /// Type shown in parameter hints.
    pub type_label: String,
    pub description: Option<String>,
    pub examples: Vec<Value>,
    pub metadata: Vec<(String, String)>,
    pub required: bool,
}

impl ParamDef {
    /// A required parameter of the given field type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            schema: field_type.json_schema(),
            type_label: field_type.to_string(),
            description: None,
            examples: Vec::new(),
            metadata: Vec::new(),
            required: true,
        }
    }

    /// The `patch` parameter of an update tool, built from the mutable
    /// fields of `def`. `None` when the entity has no mutable fields.
    pub fn patch(def: &EntityDef) -> Option<Self> {
        def.patch_schema().map(|schema| Self {
            name: "patch".to_string(),
            schema,
            type_label: format!("{}PatchModel", def.name),
            description: Some(format!("Fields of {} to change", def.name)),
            examples: Vec::new(),
            metadata: Vec::new(),
            required: true,
        })
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn example(mut self, example: impl Into<Value>) -> Self {
        self.examples.push(example.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    fn property_schema(&self) -> Value {
        let mut schema = self.schema.clone();
        if let Value::Object(ref mut obj) = schema {
            if let Some(desc) = &self.description {
                obj.entry("description").or_insert_with(|| json!(desc));
            }
            if !self.examples.is_empty() {
                obj.insert("examples".to_string(), Value::Array(self.examples.clone()));
            }
        }
        schema
    }

    /// One-line hint, e.g. `user_id - int; The user; examples: 1, 2`.
    fn hint(&self) -> Option<String> {
        if self.description.is_none() && self.examples.is_empty() && self.metadata.is_empty() {
            return None;
        }

        let mut parts = vec![self.type_label.clone()];
        if let Some(desc) = &self.description {
            parts.push(desc.clone());
        }
        if !self.examples.is_empty() {
            let joined: Vec<String> = self
                .examples
                .iter()
                .map(|e| match e {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            parts.push(format!("examples: {}", joined.join(", ")));
        }
        if !self.metadata.is_empty() {
            let meta: Vec<String> = self
                .metadata
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect();
            parts.push(meta.join(", "));
        }

        Some(format!("{} - {}", self.name, parts.join("; ")))
    }
}

/// Name, description and parameters of a tool being registered.
#[derive(Debug, Clone, Default)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub params: Vec<ParamDef>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            params: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn param(mut self, param: ParamDef) -> Self {
        self.params.push(param);
        self
    }

    /// JSON Schema object for the tool's arguments.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            properties.insert(param.name.clone(), param.property_schema());
            if param.required {
                required.push(json!(param.name));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }

    /// Append parameter hints to a description.
    pub fn with_hints(&self, description: &str) -> String {
        let hints: Vec<String> = self.params.iter().filter_map(|p| p.hint()).collect();
        if hints.is_empty() {
            return description.to_string();
        }
        let lines: Vec<String> = hints.iter().map(|h| format!("- {}", h)).collect();
        format!(
            "{}\n\nParameter hints:\n{}",
            description.trim_end(),
            lines.join("\n")
        )
    }
}

/// A registered tool.
#[derive(Clone)]
pub struct ToolEntry {
    pub definition: ToolDefinition,
    pub kind: ToolKind,
    pub target: ToolTarget,
    validator: Option<Arc<jsonschema::Validator>>,
}

impl ToolEntry {
    /// Build an entry, compiling the input schema for argument validation.
    pub fn new(
        definition: ToolDefinition,
        kind: ToolKind,
        target: ToolTarget,
    ) -> Result<Self, EnrichError> {
        let validator = jsonschema::draft202012::options()
            .build(&definition.input_schema)
            .map_err(|e| EnrichError::InvalidToolSchema {
                name: definition.name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            definition,
            kind,
            target,
            validator: Some(Arc::new(validator)),
        })
    }

    /// Build an entry for a tool without parameters.
    pub fn without_params(name: impl Into<String>, description: String, kind: ToolKind, target: ToolTarget) -> Self {
        Self {
            definition: ToolDefinition {
                name: name.into(),
                description: Some(description),
                input_schema: json!({ "type": "object", "properties": {} }),
                annotations: Some(kind.annotations()),
            },
            kind,
            target,
            validator: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Validate call arguments against the input schema.
    pub fn validate_arguments(&self, arguments: &Value) -> Result<(), EnrichError> {
        let Some(validator) = &self.validator else {
            return Ok(());
        };

        let errors: Vec<String> = validator
            .iter_errors(arguments)
            .take(10)
            .map(|e| e.to_string())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EnrichError::InvalidArguments {
                tool: self.definition.name.clone(),
                reason: errors.join("; "),
            })
        }
    }
}

/// Build the public definition of a tool.
pub fn tool_definition(kind: ToolKind, spec: &ToolSpec, description: String) -> ToolDefinition {
    ToolDefinition {
        name: spec.name.clone(),
        description: Some(description),
        input_schema: spec.input_schema(),
        annotations: Some(kind.annotations()),
    }
}

static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9]+").unwrap_or_else(|e| panic!("invalid tool name pattern: {}", e))
});

/// Normalize free text (e.g. an app title) into a tool-name fragment.
pub fn normalize_tool_name(text: &str) -> String {
    NON_ALNUM
        .replace_all(&text.to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

/// Registry of available MCP tools, in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolEntry>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A tool with the same name is replaced and keeps its
    /// position.
    pub fn register(&mut self, entry: ToolEntry) {
        let name = entry.name().to_string();
        if self.tools.insert(name.clone(), entry).is_none() {
            self.order.push(name);
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.get(name)
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tool definitions.
    pub fn list(&self) -> Vec<&ToolDefinition> {
        self.order
            .iter()
            .filter_map(|n| self.tools.get(n))
            .map(|e| &e.definition)
            .collect()
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get tool names.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }
}
