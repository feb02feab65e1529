//! Auto-registration tests for Enrich.
//!
//! Tests entities and tools registered from a model file over the
//! in-memory store.

use super::common::*;
use enrich_core::{Entity, ModelFile};
use enrich_mcp::{
    EnrichApp, EnrichError, InlineOptions, MemoryStore, ResolverContext, include_models, inline_owned,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;

pub async fn test_join_resolvers_follow_foreign_keys(ctx: &TestContext) {
    println!("  🧪 test_join_resolvers_follow_foreign_keys");

    let app = ctx.shop_app();
    let order = Entity::new("Order").with("id", 11).with("user_id", 2);
    let options = InlineOptions {
        max_depth: 1,
        only_inline: false,
    };

    let order = inline_owned(&app, order, options).await.unwrap();
    let user = order.relation("user").unwrap().as_entity().unwrap();
    assert_eq!(user.attribute("name"), Some(&json!("Alan")));

    println!("     ✓ Order.user resolved through user_id");
}

pub async fn test_missing_row_resolves_to_null(ctx: &TestContext) {
    println!("  🧪 test_missing_row_resolves_to_null");

    let app = ctx.shop_app();
    let value = app
        .call_tool("get_user", json!({ "user_id": 42 }))
        .await
        .unwrap();
    assert!(value.is_null());

    let orders = app
        .call_tool("get_user_orders", json!({ "user_id": 3 }))
        .await
        .unwrap();
    let page = orders.as_page().unwrap();
    assert!(page.items.is_empty());
    assert!(!page.has_next);

    println!("     ✓ Unknown ids give null and empty pages");
}

pub async fn test_list_pages_report_has_next(ctx: &TestContext) {
    println!("  🧪 test_list_pages_report_has_next");

    let app = ctx.shop_app();
    let first = app
        .call_tool("list_users", json!({ "page": 1, "page_size": 2 }))
        .await
        .unwrap()
        .to_json();
    assert_eq!(first["items"].as_array().unwrap().len(), 2);
    assert_eq!(first["has_next"], true);
    assert_eq!(first["total_items"], 3);
    assert_eq!(first["total_pages"], 2);

    let beyond = app
        .call_tool("list_users", json!({ "page": 9, "page_size": 2 }))
        .await
        .unwrap()
        .to_json();
    assert_eq!(beyond["items"], json!([]));
    assert_eq!(beyond["has_next"], false);
    assert_eq!(beyond["page"], 9);

    println!("     ✓ list_users paged with totals; past the end gave an empty page");
}

pub async fn test_join_tool_pages_orders(ctx: &TestContext) {
    println!("  🧪 test_join_tool_pages_orders");

    let app = ctx.shop_app();
    let first = app
        .call_tool("get_user_orders", json!({ "user_id": 1, "page_size": 1 }))
        .await
        .unwrap()
        .to_json();
    assert_eq!(first["items"][0]["id"], 10);
    assert_eq!(first["has_next"], true);
    assert_eq!(first["total_items"], Value::Null);

    let second = app
        .call_tool("get_user_orders", json!({ "user_id": 1, "page": 2, "page_size": 1 }))
        .await
        .unwrap()
        .to_json();
    assert_eq!(second["items"][0]["id"], 12);
    assert_eq!(second["has_next"], false);

    let err = app
        .call_tool("get_user_orders", json!({ "user_id": 1, "page": 0 }))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EnrichError>(),
        Some(EnrichError::InvalidArguments { .. })
    ));

    println!("     ✓ get_user_orders paged through orders and refused page 0");
}

pub async fn test_join_without_source_id_is_missing_argument(ctx: &TestContext) {
    println!("  🧪 test_join_without_source_id_is_missing_argument");

    let app = ctx.shop_app();
    let err = app.call_tool("get_user_orders", json!({})).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EnrichError>(),
        Some(EnrichError::InvalidArguments { .. })
    ));

    let resolver = app.resolvers().first("User", "orders").unwrap();
    let err = resolver
        .resolve(ResolverContext::from_arguments("User", Map::new()))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EnrichError>(),
        Some(EnrichError::MissingArgument { .. })
    ));

    println!("     ✓ Schema refused the call; the join named the missing user_id");
}

pub async fn test_update_applies_patch(ctx: &TestContext) {
    println!("  🧪 test_update_applies_patch");

    let app = ctx.shop_app();
    let updated = app
        .call_tool(
            "update_user",
            json!({ "user_id": 2, "patch": { "tier": "pro", "name": null } }),
        )
        .await
        .unwrap();
    assert_eq!(updated.to_json(), json!({ "id": 2, "name": "Alan", "tier": "pro" }));

    let fetched = app
        .call_tool("get_user", json!({ "user_id": 2 }))
        .await
        .unwrap();
    assert_eq!(fetched.to_json()["tier"], "pro");

    println!("     ✓ Patch stored; null left the name untouched");
}

pub async fn test_update_rejects_immutable_field(ctx: &TestContext) {
    println!("  🧪 test_update_rejects_immutable_field");

    let app = ctx.shop_app();
    let err = app
        .call_tool("update_user", json!({ "user_id": 2, "patch": { "id": 5 } }))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EnrichError>(),
        Some(EnrichError::InvalidArguments { .. })
    ));

    let err = app
        .call_tool("update_user", json!({ "user_id": 2, "patch": { "tier": "gold" } }))
        .await
        .unwrap_err();
    assert!(err.downcast_ref::<EnrichError>().is_some());

    println!("     ✓ Patch schema rejected immutable fields and bad literals");
}

pub async fn test_relationship_without_join_stays_unresolved() {
    println!("  🧪 test_relationship_without_join_stays_unresolved");

    let model = ModelFile::from_yaml(
        r#"
entities:
  - name: Author
    description: A writer
    fields:
      - { name: id, type: int, description: Identifier }
    relationships:
      - { name: books, target: Book, many: true, description: Books written }
  - name: Book
    description: A book
    fields:
      - { name: id, type: int, description: Identifier }
"#,
    )
    .unwrap();

    let mut app = EnrichApp::new("Library", "");
    include_models(&mut app, &model, Arc::new(MemoryStore::new())).unwrap();
    let err = app.finalize().unwrap_err();
    assert!(err.to_string().contains("Author.books"));

    println!("     ✓ Finalize names the relationship that needs a resolver");
}

pub async fn test_model_without_descriptions_is_rejected() {
    println!("  🧪 test_model_without_descriptions_is_rejected");

    let model = ModelFile::from_yaml(
        r#"
entities:
  - name: Ghost
    fields:
      - { name: id, type: int, description: Identifier }
"#,
    )
    .unwrap();

    let mut app = EnrichApp::new("Haunted", "");
    let err = include_models(&mut app, &model, Arc::new(MemoryStore::new())).unwrap_err();
    assert!(matches!(err, EnrichError::Model(_)));
    assert!(app.entities().is_empty());

    println!("     ✓ Entity without description refused at registration");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n📦 Auto-registration Tests");
    test_join_resolvers_follow_foreign_keys(ctx).await;
    test_missing_row_resolves_to_null(ctx).await;
    test_list_pages_report_has_next(ctx).await;
    test_join_tool_pages_orders(ctx).await;
    test_join_without_source_id_is_missing_argument(ctx).await;
    test_update_applies_patch(ctx).await;
    test_update_rejects_immutable_field(ctx).await;
    test_relationship_without_join_stays_unresolved().await;
    test_model_without_descriptions_is_rejected().await;
}
