//! # enrich-mcp
//!
//! Relationship resolution, inlining and the MCP server for Enrich.
//!
//! This crate turns a set of described entities into tools for AI agents:
//!
//! - **Resolver Registry**: async resolvers bound to relationships by entity and field
//! - **Completeness Check**: startup refuses to serve while any relationship is unresolved
//! - **Inlining**: depth-bounded expansion of related entities into results
//! - **Tools**: retriever, creator, updater, deleter and resolver tools with JSON schemas
//! - **Multiple Transports**: stdio and HTTP
//!
//! ## Architecture
//!
//! ```text
//! AI Agent
//!       │
//!       │ MCP protocol (list tools / call tool)
//!       ▼
//! ┌──────────────────────┐
//! │  Enrich MCP Server   │
//! │  1. Validate args    │  ← jsonschema
//! │  2. Run tool handler │  ← application code / MemoryStore
//! │  3. Inline relations │  ← resolvers, max_depth
//! │  4. Return JSON      │
//! └──────────────────────┘
//! ```
//!
//! ## Tool Naming
//!
//! | Tool Pattern | Registered By | Description |
//! |--------------|---------------|-------------|
//! | `explore_<title>_data_model` | Every app | Markdown description of the model |
//! | `get_<entity>_<field>` | `EnrichApp::resolver` | Resolve one relationship |
//! | `list_<entity>s(page, page_size)` | `include_models` | Page through records |
//! | `get_<entity>(<entity>_id)` | `include_models` | Fetch single record |
//! | `update_<entity>(<entity>_id, patch)` | `include_models` | Change mutable fields |
//!
//! ## Example Usage
//!
//! ```ignore
//! use enrich_core::{Entity, EntityDef, EntityValue, FieldDef, FieldType, RelationshipDef};
//! use enrich_mcp::{EnrichApp, InlineOptions, ResolverContext, inline_relationships};
//!
//! let mut app = EnrichApp::new("Shop", "Customers and their orders");
//! app.entity(
//!     EntityDef::new("User", "A customer")
//!         .field(FieldDef::new("id", FieldType::Integer, "Identifier"))
//!         .relationship(RelationshipDef::many("orders", "Order", "Orders placed")),
//! )?;
//! app.entity(EntityDef::new("Order", "A purchase"))?;
//! app.resolver("User", "orders", |ctx: ResolverContext| async move {
//!     let user_id: i64 = ctx.require("user_id")?;
//!     Ok(EntityValue::from(vec![Entity::new("Order").with("user_id", user_id)]))
//! })?;
//! app.finalize()?;
//!
//! let mut user = Entity::new("User").with("id", 1);
//! inline_relationships(&app, &mut user, InlineOptions::default()).await?;
//! ```

pub mod app;
pub mod auto;
pub mod datamodel;
pub mod error;
pub mod http_transport;
pub mod inlining;
pub mod protocol;
pub mod resolver;
pub mod server;
pub mod tools;

// Re-export main types
pub use app::EnrichApp;
pub use auto::{MemoryStore, include_models};
pub use datamodel::{DataModelSummary, ModelDescription};
pub use error::{EnrichError, McpError};
pub use inlining::{InlineOptions, inline_owned, inline_relationships, inline_value};
pub use protocol::{
    CallToolParams, JsonRpcRequest, JsonRpcResponse, ToolAnnotations, ToolContent, ToolDefinition,
};
pub use resolver::{Resolver, ResolverContext, ResolverRegistry, ResolverSet};
pub use server::McpServer;
pub use tools::{ParamDef, ToolHandler, ToolKind, ToolRegistry, ToolSpec};
