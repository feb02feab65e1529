//! Inlining tests for Enrich.
//!
//! Tests depth bounds, cycles, `only_inline`, ordering and failure behavior.

use super::common::*;
use enrich_core::{Entity, EntityDef, EntityValue, FieldDef, FieldType, RelationshipDef};
use enrich_mcp::{EnrichApp, InlineOptions, ResolverContext, inline_owned, inline_relationships};
use serde_json::json;
use std::fmt;

// =============================================================================
// DEPTH
// =============================================================================

pub async fn test_depth_zero_leaves_entity_untouched() {
    println!("  🧪 test_depth_zero_leaves_entity_untouched");

    let log = CallLog::default();
    let app = user_items_app(&log);
    let mut user = Entity::new("User").with("id", 1);
    let options = InlineOptions {
        max_depth: 0,
        only_inline: false,
    };

    inline_relationships(&app, &mut user, options).await.unwrap();

    assert!(!user.is_set("items"));
    assert!(log.calls().is_empty());

    println!("     ✓ No resolver ran and no slot was written");
}

pub async fn test_depth_one_sets_direct_relationships_only() {
    println!("  🧪 test_depth_one_sets_direct_relationships_only");

    let log = CallLog::default();
    let app = user_items_app(&log);
    let user = Entity::new("User").with("id", 1);

    let user = inline_owned(&app, user, InlineOptions::default()).await.unwrap();

    let items = user.relation("items").unwrap().as_list().unwrap();
    assert_eq!(items.len(), 3);
    for item in items {
        assert!(!item.as_entity().unwrap().is_set("owner"));
    }
    assert_eq!(log.calls(), vec!["User.items"]);

    println!("     ✓ Only the root's relationships were resolved");
}

pub async fn test_user_items_scenario() {
    println!("  🧪 test_user_items_scenario");

    let log = CallLog::default();
    let app = user_items_app(&log);
    let mut user = Entity::new("User").with("id", 1);
    let options = InlineOptions {
        max_depth: 2,
        only_inline: false,
    };

    inline_relationships(&app, &mut user, options).await.unwrap();

    assert_eq!(
        user.to_json(),
        json!({
            "id": 1,
            "items": [
                { "id": 101, "owner_id": 1, "owner": { "id": 1 } },
                { "id": 102, "owner_id": 1, "owner": { "id": 1 } },
                { "id": 103, "owner_id": 1, "owner": { "id": 1 } }
            ]
        })
    );
    assert_eq!(
        log.calls(),
        vec!["User.items", "Item.owner", "Item.owner", "Item.owner"]
    );

    println!("     ✓ Items resolved from user_id and owners resolved one level down");
}

pub async fn test_cycle_is_bounded_by_depth() {
    println!("  🧪 test_cycle_is_bounded_by_depth");

    let log = CallLog::default();
    let app = cyclic_app(&log);
    let mut a = Entity::new("A").with("id", 1);
    let options = InlineOptions {
        max_depth: 2,
        only_inline: true,
    };

    inline_relationships(&app, &mut a, options).await.unwrap();

    let b = a.relation("b").unwrap().as_entity().unwrap();
    let a2 = b.relation("a").unwrap().as_entity().unwrap();
    assert_eq!(a2.id(), Some(&json!(1)));
    assert!(!a2.is_set("b"));
    assert_eq!(log.calls(), vec!["A.b", "B.a"]);

    println!("     ✓ Cycle stopped at max_depth");
}

// =============================================================================
// SELECTION AND ORDER
// =============================================================================

pub async fn test_only_inline_skips_unflagged_relationships() {
    println!("  🧪 test_only_inline_skips_unflagged_relationships");

    let log = CallLog::default();
    let app = user_items_app(&log);
    let mut user = Entity::new("User").with("id", 1);
    let options = InlineOptions {
        max_depth: 3,
        only_inline: true,
    };

    inline_relationships(&app, &mut user, options).await.unwrap();

    assert!(!user.is_set("items"));
    assert!(log.calls().is_empty());

    println!("     ✓ Relationships without the inline flag were skipped");
}

pub async fn test_only_inline_skips_unflagged_child_relationships() {
    println!("  🧪 test_only_inline_skips_unflagged_child_relationships");

    let log = CallLog::default();
    let mut app = EnrichApp::new("Library", "");
    app.entity(
        EntityDef::new("Author", "A writer")
            .field(FieldDef::new("id", FieldType::Integer, "Identifier"))
            .relationship(RelationshipDef::one("latest", "Book", "Latest book").inline()),
    )
    .unwrap();
    app.entity(
        EntityDef::new("Book", "A book")
            .field(FieldDef::new("id", FieldType::Integer, "Identifier"))
            .relationship(RelationshipDef::many("reviews", "Review", "Reviews of the book")),
    )
    .unwrap();
    app.entity(EntityDef::new("Review", "A review")).unwrap();

    let latest = log.clone();
    app.resolver("Author", "latest", move |_ctx: ResolverContext| {
        let log = latest.clone();
        async move {
            log.record("Author.latest");
            Ok::<_, anyhow::Error>(EntityValue::from(Entity::new("Book").with("id", 5)))
        }
    })
    .unwrap();
    let reviews = log.clone();
    app.resolver("Book", "reviews", move |_ctx: ResolverContext| {
        let log = reviews.clone();
        async move {
            log.record("Book.reviews");
            Ok::<_, anyhow::Error>(EntityValue::List(Vec::new()))
        }
    })
    .unwrap();
    app.finalize().unwrap();

    let options = InlineOptions {
        max_depth: 2,
        only_inline: true,
    };
    let author = inline_owned(&app, Entity::new("Author").with("id", 1), options)
        .await
        .unwrap();

    let book = author.relation("latest").unwrap().as_entity().unwrap();
    assert_eq!(book.id(), Some(&json!(5)));
    assert!(!book.is_set("reviews"));
    assert_eq!(log.calls(), vec!["Author.latest".to_string()]);

    println!("     ✓ Book.reviews has a resolver but stayed unset below the root");
}

pub async fn test_list_order_is_preserved() {
    println!("  🧪 test_list_order_is_preserved");

    let log = CallLog::default();
    let app = user_items_app(&log);
    let user = inline_owned(&app, Entity::new("User").with("id", 7), InlineOptions::default())
        .await
        .unwrap();

    let ids: Vec<_> = user
        .relation("items")
        .unwrap()
        .as_list()
        .unwrap()
        .iter()
        .map(|item| item.as_entity().unwrap().id().cloned().unwrap())
        .collect();
    assert_eq!(ids, vec![json!(701), json!(702), json!(703)]);

    println!("     ✓ Sequence results kept resolver order");
}

pub async fn test_text_result_passes_through() {
    println!("  🧪 test_text_result_passes_through");

    let mut app = EnrichApp::new("Notes", "");
    app.entity(
        EntityDef::new("Note", "A note")
            .field(FieldDef::new("id", FieldType::Integer, "Identifier"))
            .relationship(RelationshipDef::one("summary", "Note", "Short summary")),
    )
    .unwrap();
    app.resolver("Note", "summary", |_ctx: ResolverContext| async move {
        Ok::<_, anyhow::Error>(EntityValue::Json(json!("abc")))
    })
    .unwrap();
    app.finalize().unwrap();

    let note = inline_owned(&app, Entity::new("Note").with("id", 1), InlineOptions::default())
        .await
        .unwrap();
    assert_eq!(note.relation("summary"), Some(&EntityValue::Json(json!("abc"))));

    println!("     ✓ Text was assigned as-is, not treated as a sequence");
}

// =============================================================================
// FAILURES
// =============================================================================

#[derive(Debug)]
struct StoreDown;

impl fmt::Display for StoreDown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store is down")
    }
}

impl std::error::Error for StoreDown {}

pub async fn test_failure_keeps_earlier_siblings() {
    println!("  🧪 test_failure_keeps_earlier_siblings");

    let mut app = EnrichApp::new("Failing", "");
    app.entity(
        EntityDef::new("User", "A user")
            .field(FieldDef::new("id", FieldType::Integer, "Identifier"))
            .relationship(RelationshipDef::one("profile", "Profile", "Profile"))
            .relationship(RelationshipDef::many("orders", "Profile", "Orders"))
            .relationship(RelationshipDef::many("tags", "Profile", "Tags")),
    )
    .unwrap();
    app.entity(EntityDef::new("Profile", "A profile")).unwrap();
    app.resolver("User", "profile", |_ctx: ResolverContext| async move {
        Ok::<_, anyhow::Error>(EntityValue::from(Entity::new("Profile")))
    })
    .unwrap();
    app.resolver("User", "orders", |_ctx: ResolverContext| async move {
        Err::<EntityValue, _>(anyhow::Error::new(StoreDown))
    })
    .unwrap();
    app.resolver("User", "tags", |_ctx: ResolverContext| async move {
        Ok::<_, anyhow::Error>(EntityValue::List(Vec::new()))
    })
    .unwrap();
    app.finalize().unwrap();

    let mut user = Entity::new("User").with("id", 1);
    let err = inline_relationships(&app, &mut user, InlineOptions::default())
        .await
        .unwrap_err();

    assert!(err.downcast_ref::<StoreDown>().is_some());
    assert_eq!(err.to_string(), "store is down");
    assert!(user.is_set("profile"));
    assert!(!user.is_set("orders"));
    assert!(!user.is_set("tags"));

    println!("     ✓ Error propagated unchanged; earlier slot stayed assigned");
}

// =============================================================================
// RUNNER
// =============================================================================

pub async fn run_all_tests() {
    println!("\n📦 Inlining Tests");
    test_depth_zero_leaves_entity_untouched().await;
    test_depth_one_sets_direct_relationships_only().await;
    test_user_items_scenario().await;
    test_cycle_is_bounded_by_depth().await;
    test_only_inline_skips_unflagged_relationships().await;
    test_only_inline_skips_unflagged_child_relationships().await;
    test_list_order_is_preserved().await;
    test_text_result_passes_through().await;
    test_failure_keeps_earlier_siblings().await;
}
