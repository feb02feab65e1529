//! Shared test infrastructure for Enrich end-to-end tests.
//!
//! This module provides:
//! - The shop fixture (model file and rows)
//! - Small graph apps with recording resolvers
//! - Helper functions for test assertions

use enrich_core::{
    Entity, EntityDef, EntityValue, FieldDef, FieldType, McpConfig, ModelFile, RelationshipDef,
};
use enrich_mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use enrich_mcp::{EnrichApp, McpServer, MemoryStore, ResolverContext, include_models};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

// =============================================================================
// SHOP FIXTURE
// =============================================================================

pub const SHOP_MODEL: &str = r#"
entities:
  - name: User
    description: A customer of the shop
    fields:
      - { name: id, type: int, description: Unique identifier }
      - { name: name, type: str, description: Display name, mutable: true }
      - { name: tier, type: literal, values: [free, pro], description: Subscription tier, mutable: true }
    relationships:
      - name: orders
        target: Order
        many: true
        inline: true
        description: Orders placed by the user
        join: { local: id, remote: user_id }
  - name: Order
    description: A purchase made by a user
    fields:
      - { name: id, type: int, description: Unique identifier }
      - { name: user_id, type: int, description: Identifier of the buyer }
      - { name: total, type: float, description: Order total in EUR }
      - { name: status, type: literal, values: [pending, shipped], description: Fulfilment status, mutable: true }
    relationships:
      - name: user
        target: User
        description: The user who placed the order
        join: { local: user_id, remote: id }
"#;

pub fn shop_data() -> Value {
    json!({
        "User": [
            { "id": 1, "name": "Ada", "tier": "pro" },
            { "id": 2, "name": "Alan", "tier": "free" },
            { "id": 3, "name": "Grace", "tier": "free" }
        ],
        "Order": [
            { "id": 10, "user_id": 1, "total": 25.0, "status": "shipped" },
            { "id": 11, "user_id": 2, "total": 8.5, "status": "pending" },
            { "id": 12, "user_id": 1, "total": 99.9, "status": "pending" }
        ]
    })
}

// =============================================================================
// TEST CONTEXT
// =============================================================================

/// Fixtures shared by every test module.
pub struct TestContext {
    pub shop_model: ModelFile,
}

impl TestContext {
    pub fn setup() -> Result<Self, String> {
        let shop_model = ModelFile::from_yaml(SHOP_MODEL).map_err(|e| e.to_string())?;
        Ok(Self { shop_model })
    }

    /// A finalized shop app backed by a fresh store.
    pub fn shop_app(&self) -> EnrichApp {
        let mut app = EnrichApp::new("Shop", "Customers and their orders.");
        let store = Arc::new(MemoryStore::from_json(shop_data()).expect("shop data"));
        include_models(&mut app, &self.shop_model, store).expect("include shop models");
        app.finalize().expect("finalize shop app");
        app
    }

    /// An MCP server for the shop app.
    pub fn shop_server(&self) -> McpServer {
        McpServer::new(Arc::new(self.shop_app()), McpConfig::default())
    }
}

// =============================================================================
// GRAPH APPS
// =============================================================================

/// Names of resolvers in the order they ran.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, name: &str) {
        self.0.lock().unwrap().push(name.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// `User` with an `items` list of `Item`, each item pointing back at its
/// `owner`. Resolvers record their calls.
pub fn user_items_app(log: &CallLog) -> EnrichApp {
    let mut app = EnrichApp::new("Inventory", "");
    app.entity(
        EntityDef::new("User", "A user")
            .field(FieldDef::new("id", FieldType::Integer, "Identifier"))
            .relationship(RelationshipDef::many("items", "Item", "Items owned by the user")),
    )
    .unwrap();
    app.entity(
        EntityDef::new("Item", "An owned item")
            .field(FieldDef::new("id", FieldType::Integer, "Identifier"))
            .field(FieldDef::new("owner_id", FieldType::Integer, "Owner"))
            .relationship(RelationshipDef::one("owner", "User", "Owner of the item")),
    )
    .unwrap();

    let l = log.clone();
    app.resolver("User", "items", move |ctx: ResolverContext| {
        let log = l.clone();
        async move {
            log.record("User.items");
            let user_id: i64 = ctx.require("user_id")?;
            let items = (1..=3)
                .map(|n| {
                    Entity::new("Item")
                        .with("id", user_id * 100 + n)
                        .with("owner_id", user_id)
                })
                .collect::<Vec<_>>();
            Ok::<_, anyhow::Error>(EntityValue::from(items))
        }
    })
    .unwrap();

    let l = log.clone();
    app.resolver("Item", "owner", move |ctx: ResolverContext| {
        let log = l.clone();
        async move {
            log.record("Item.owner");
            let owner_id: i64 = ctx.require("owner_id")?;
            Ok::<_, anyhow::Error>(EntityValue::from(Entity::new("User").with("id", owner_id)))
        }
    })
    .unwrap();

    app.finalize().unwrap();
    app
}

/// `A.b -> B` and `B.a -> A`, a two-entity cycle.
pub fn cyclic_app(log: &CallLog) -> EnrichApp {
    let mut app = EnrichApp::new("Cycle", "");
    app.entity(
        EntityDef::new("A", "Left side")
            .field(FieldDef::new("id", FieldType::Integer, "Identifier"))
            .relationship(RelationshipDef::one("b", "B", "Partner").inline()),
    )
    .unwrap();
    app.entity(
        EntityDef::new("B", "Right side")
            .field(FieldDef::new("id", FieldType::Integer, "Identifier"))
            .relationship(RelationshipDef::one("a", "A", "Partner").inline()),
    )
    .unwrap();

    let l = log.clone();
    app.resolver("A", "b", move |_ctx: ResolverContext| {
        let log = l.clone();
        async move {
            log.record("A.b");
            Ok::<_, anyhow::Error>(EntityValue::from(Entity::new("B").with("id", 2)))
        }
    })
    .unwrap();

    let l = log.clone();
    app.resolver("B", "a", move |_ctx: ResolverContext| {
        let log = l.clone();
        async move {
            log.record("B.a");
            Ok::<_, anyhow::Error>(EntityValue::from(Entity::new("A").with("id", 1)))
        }
    })
    .unwrap();

    app.finalize().unwrap();
    app
}

// =============================================================================
// ASSERTION HELPERS
// =============================================================================

/// Build a `tools/call` request.
pub fn call_request(id: i64, tool: &str, arguments: Value) -> JsonRpcRequest {
    JsonRpcRequest::new(
        id,
        "tools/call",
        Some(json!({ "name": tool, "arguments": arguments })),
    )
}

/// Parse the JSON payload of a successful tool call.
pub fn tool_json(response: &JsonRpcResponse) -> Value {
    assert!(
        response.error.is_none(),
        "unexpected JSON-RPC error: {:?}",
        response.error
    );
    let result = response.result.as_ref().expect("result");
    assert_eq!(result["isError"], false, "tool failed: {}", result);
    let text = result["content"][0]["text"].as_str().expect("text content");
    serde_json::from_str(text).expect("tool result is JSON")
}
