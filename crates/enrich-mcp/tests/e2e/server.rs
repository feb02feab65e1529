//! MCP server tests for Enrich.
//!
//! Tests tool discovery, tool calls with inlining and the HTTP transport.

use super::common::*;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use enrich_core::{Entity, EntityDef, EntityValue, FieldDef, FieldType, McpConfig, RelationshipDef};
use enrich_mcp::http_transport::{HttpTransportState, create_router};
use enrich_mcp::protocol::{JsonRpcRequest, JsonRpcResponse, codes};
use enrich_mcp::{EnrichApp, McpServer, ResolverContext, ToolSpec};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;

// =============================================================================
// DISCOVERY
// =============================================================================

pub async fn test_list_tools(ctx: &TestContext) {
    println!("  🧪 test_list_tools");

    let server = ctx.shop_server();
    let response = server
        .handle_request(JsonRpcRequest::new(1, "tools/list", None))
        .await;

    let tools = response.result.unwrap()["tools"].clone();
    let names: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();

    assert_eq!(names[0], "explore_shop_data_model");
    for expected in [
        "list_users",
        "get_user",
        "update_user",
        "get_user_orders",
        "list_orders",
        "get_order",
        "update_order",
        "get_order_user",
    ] {
        assert!(names.contains(&expected), "missing tool {}", expected);
    }

    let get_user = tools
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "get_user")
        .unwrap();
    assert_eq!(get_user["inputSchema"]["required"], json!(["user_id"]));
    assert_eq!(get_user["annotations"]["readOnlyHint"], true);
    assert!(
        get_user["description"]
            .as_str()
            .unwrap()
            .starts_with("This is a retriever for the Shop server.")
    );

    println!("     ✓ Shop tools listed with schemas and annotations");
}

// =============================================================================
// TOOL CALLS
// =============================================================================

pub async fn test_retrieve_inlines_flagged_relationships(ctx: &TestContext) {
    println!("  🧪 test_retrieve_inlines_flagged_relationships");

    let server = ctx.shop_server();
    let response = server
        .handle_request(call_request(2, "get_user", json!({ "user_id": 1 })))
        .await;
    let user = tool_json(&response);

    assert_eq!(user["name"], "Ada");
    assert_eq!(user["orders"]["page"], 1);
    assert_eq!(user["orders"]["has_next"], false);
    let order_ids: Vec<&Value> = user["orders"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| &o["id"])
        .collect();
    assert_eq!(order_ids, vec![&json!(10), &json!(12)]);
    assert!(user["orders"]["items"][0].get("user").is_none());

    println!("     ✓ get_user returned the user with orders inlined one level");
}

pub async fn test_resolver_tool_is_not_inlined(ctx: &TestContext) {
    println!("  🧪 test_resolver_tool_is_not_inlined");

    let server = ctx.shop_server();
    let response = server
        .handle_request(call_request(3, "get_order_user", json!({ "order_id": 11 })))
        .await;
    let user = tool_json(&response);

    assert_eq!(user["id"], 2);
    assert!(user.get("orders").is_none());

    println!("     ✓ Resolver tool returned the raw related entity");
}

pub async fn test_invalid_arguments(ctx: &TestContext) {
    println!("  🧪 test_invalid_arguments");

    let server = ctx.shop_server();
    let response = server
        .handle_request(call_request(4, "get_user", json!({ "user_id": "one" })))
        .await;

    assert_eq!(response.error.unwrap().code, codes::INVALID_PARAMS);

    println!("     ✓ Schema violation reported as invalid params");
}

pub async fn test_handler_failure_is_tool_error(ctx: &TestContext) {
    println!("  🧪 test_handler_failure_is_tool_error");

    let server = ctx.shop_server();
    let response = server
        .handle_request(call_request(
            5,
            "update_user",
            json!({ "user_id": 99, "patch": { "name": "Nobody" } }),
        ))
        .await;

    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    assert!(
        result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("User 99 not found")
    );

    println!("     ✓ Handler error surfaced as isError content");
}

fn notes_server() -> McpServer {
    let mut app = EnrichApp::new("Notes", "");
    app.entity(
        EntityDef::new("Note", "A note")
            .field(FieldDef::new("id", FieldType::Integer, "Identifier"))
            .field(FieldDef::new("author_id", FieldType::String, "Author reference"))
            .relationship(RelationshipDef::one("author", "Author", "Who wrote it").inline()),
    )
    .unwrap();
    app.entity(EntityDef::new("Author", "A writer")).unwrap();
    app.resolver("Note", "author", |ctx: ResolverContext| async move {
        let author_id: i64 = ctx.require("author_id")?;
        Ok::<_, anyhow::Error>(EntityValue::from(Entity::new("Author").with("id", author_id)))
    })
    .unwrap();
    app.retrieve(ToolSpec::new("get_note").description("Get a note"), |_args: Value| async move {
        Ok::<_, anyhow::Error>(EntityValue::from(
            Entity::new("Note").with("id", 1).with("author_id", "abc"),
        ))
    })
    .unwrap();
    app.finalize().unwrap();
    McpServer::new(Arc::new(app), McpConfig::default())
}

pub async fn test_bad_resolver_argument_is_tool_error() {
    println!("  🧪 test_bad_resolver_argument_is_tool_error");

    let response = notes_server()
        .handle_request(call_request(8, "get_note", json!({})))
        .await;

    assert!(response.error.is_none());
    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    assert!(
        result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("got an invalid 'author_id'")
    );

    println!("     ✓ Unparseable author_id surfaced as isError, not -32602");
}

pub async fn test_data_model_tool(ctx: &TestContext) {
    println!("  🧪 test_data_model_tool");

    let server = ctx.shop_server();
    let response = server
        .handle_request(call_request(6, "explore_shop_data_model", json!({})))
        .await;
    let summary = tool_json(&response);

    assert_eq!(summary["title"], "Shop");
    assert_eq!(summary["entity_count"], 2);
    let model = summary["model"].as_str().unwrap();
    assert!(model.contains("- **orders** → list[Order]: Orders placed by the user"));
    assert!(model.contains("- **tier** (Literal['free', 'pro'], mutable): Subscription tier"));

    println!("     ✓ Data model summary describes entities and relationships");
}

// =============================================================================
// HTTP TRANSPORT
// =============================================================================

pub async fn test_http_round_trip(ctx: &TestContext) {
    println!("  🧪 test_http_round_trip");

    let server = ctx.shop_server();
    let (tx, mut rx) = mpsc::channel::<(JsonRpcRequest, mpsc::Sender<JsonRpcResponse>)>(8);
    tokio::spawn(async move {
        while let Some((request, response_tx)) = rx.recv().await {
            let response = server.handle_request(request).await;
            let _ = response_tx.send(response).await;
        }
    });

    let router = create_router(Arc::new(HttpTransportState::new(tx, "Shop")));
    let body = json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "tools/call",
        "params": { "name": "list_users", "arguments": { "page": 2, "page_size": 2 } }
    });
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let rpc: JsonRpcResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(rpc.id, Some(json!(7)));
    let users = tool_json(&rpc);
    assert_eq!(
        users,
        json!({
            "items": [{
                "id": 3,
                "name": "Grace",
                "tier": "free",
                "orders": {
                    "items": [],
                    "page": 1,
                    "page_size": 20,
                    "has_next": false,
                    "total_items": null,
                    "total_pages": null
                }
            }],
            "page": 2,
            "page_size": 2,
            "has_next": false,
            "total_items": 3,
            "total_pages": 2
        })
    );

    println!("     ✓ POST /mcp reached the server and returned page 2");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n📦 Server Tests");
    test_list_tools(ctx).await;
    test_retrieve_inlines_flagged_relationships(ctx).await;
    test_resolver_tool_is_not_inlined(ctx).await;
    test_invalid_arguments(ctx).await;
    test_handler_failure_is_tool_error(ctx).await;
    test_bad_resolver_argument_is_tool_error().await;
    test_data_model_tool(ctx).await;
    test_http_round_trip(ctx).await;
}
