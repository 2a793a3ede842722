//! Cart and catalog endpoints over real HTTP.
//!
//! Each test serves the storefront from memory stores on a loopback port and
//! talks to it through the client crate's `CartApi`.

#![allow(clippy::indexing_slicing)]

use std::str::FromStr;

use reqwest::StatusCode;
use rust_decimal::Decimal;

use shopcart_client::{ApiError, ProductListQuery, RemoteCart};
use shopcart_core::api::ErrorCode;
use shopcart_core::catalog::{SortField, SortOrder};
use shopcart_core::{Price, Quantity, UserId};
use shopcart_integration_tests::{TestStorefront, product};

fn user(name: &str) -> UserId {
    UserId::parse(name).expect("valid user id")
}

fn qty(n: u32) -> Quantity {
    Quantity::new(n).expect("non-zero quantity")
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal")
}

fn rejection_code(error: &ApiError) -> Option<ErrorCode> {
    match error {
        ApiError::Rejected { code, .. } => *code,
        _ => None,
    }
}

// ============================================================================
// Cart Round Trip
// ============================================================================

#[tokio::test]
async fn test_add_then_read_back() {
    let headphones = product("Wireless Headphones", "99.99", 50);
    let storefront = TestStorefront::start(vec![headphones.clone()]).await;
    let api = storefront.api();
    let alice = user("alice");

    let empty = api.get_cart(&alice).await.expect("read empty cart");
    assert!(empty.cart_id.is_none());
    assert!(empty.items.is_empty());
    assert_eq!(empty.total_amount, Decimal::ZERO);

    let added = api
        .add_item(&alice, headphones.id, qty(2))
        .await
        .expect("add item");
    assert!(added.cart_id.is_some());
    assert_eq!(added.items.len(), 1);
    assert_eq!(added.items[0].name, "Wireless Headphones");
    assert_eq!(added.total_amount, dec("199.98"));
    assert_eq!(added.total_items, 2);

    let read = api.get_cart(&alice).await.expect("read cart");
    assert_eq!(read, added);
}

#[tokio::test]
async fn test_users_have_separate_carts() {
    let mug = product("Coffee Mug", "12.50", 20);
    let storefront = TestStorefront::start(vec![mug.clone()]).await;
    let api = storefront.api();

    api.add_item(&user("alice"), mug.id, qty(3))
        .await
        .expect("add for alice");

    let bob = api.get_cart(&user("bob")).await.expect("read bob");
    assert!(bob.items.is_empty());
    assert_eq!(bob.user_id, user("bob"));
}

#[tokio::test]
async fn test_merge_keeps_first_price() {
    let mut lamp = product("Desk Lamp", "40.00", 10);
    let storefront = TestStorefront::start(vec![lamp.clone()]).await;
    let api = storefront.api();
    let alice = user("alice");

    api.add_item(&alice, lamp.id, qty(1)).await.expect("first add");

    lamp.price = Price::new(dec("55.00")).expect("valid price");
    storefront.catalog.upsert(lamp.clone());

    let merged = api
        .add_item(&alice, lamp.id, qty(1))
        .await
        .expect("second add");
    assert_eq!(merged.items.len(), 1);
    assert_eq!(merged.items[0].quantity, qty(2));
    assert_eq!(merged.items[0].price.amount(), dec("40.00"));
    assert_eq!(merged.total_amount, dec("80.00"));
}

#[tokio::test]
async fn test_update_remove_and_clear() {
    let mug = product("Coffee Mug", "12.50", 20);
    let lamp = product("Desk Lamp", "40.00", 10);
    let storefront = TestStorefront::start(vec![mug.clone(), lamp.clone()]).await;
    let api = storefront.api();
    let alice = user("alice");

    api.add_item(&alice, mug.id, qty(1)).await.expect("add mug");
    let cart = api.add_item(&alice, lamp.id, qty(1)).await.expect("add lamp");
    let mug_line = cart
        .items
        .iter()
        .find(|item| item.product_id == mug.id)
        .expect("mug line")
        .id;
    let lamp_line = cart
        .items
        .iter()
        .find(|item| item.product_id == lamp.id)
        .expect("lamp line")
        .id;

    let updated = api
        .update_item(&alice, mug_line, qty(4))
        .await
        .expect("update mug");
    assert_eq!(updated.total_amount, dec("90.00"));
    assert_eq!(updated.total_items, 5);

    let removed = api.remove_item(&alice, lamp_line).await.expect("remove lamp");
    assert_eq!(removed.items.len(), 1);
    assert_eq!(removed.total_amount, dec("50.00"));

    let cleared = api.clear_cart(&alice).await.expect("clear");
    assert!(cleared.items.is_empty());
    assert_eq!(cleared.cart_id, updated.cart_id);
    assert_eq!(cleared.total_items, 0);
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_stock_is_checked_against_merged_quantity() {
    let lamp = product("Desk Lamp", "40.00", 5);
    let storefront = TestStorefront::start(vec![lamp.clone()]).await;
    let api = storefront.api();
    let alice = user("alice");

    api.add_item(&alice, lamp.id, qty(3)).await.expect("first add");

    let err = api
        .add_item(&alice, lamp.id, qty(3))
        .await
        .expect_err("merged quantity exceeds stock");
    assert!(!err.is_transport_failure());
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(rejection_code(&err), Some(ErrorCode::StockError));

    let cart = api.get_cart(&alice).await.expect("read cart");
    assert_eq!(cart.items[0].quantity, qty(3));
}

#[tokio::test]
async fn test_update_beyond_stock_is_rejected() {
    let lamp = product("Desk Lamp", "40.00", 5);
    let storefront = TestStorefront::start(vec![lamp.clone()]).await;
    let api = storefront.api();
    let alice = user("alice");

    let cart = api.add_item(&alice, lamp.id, qty(1)).await.expect("add");
    let err = api
        .update_item(&alice, cart.items[0].id, qty(6))
        .await
        .expect_err("over stock");
    assert_eq!(rejection_code(&err), Some(ErrorCode::StockError));
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let storefront = TestStorefront::start(Vec::new()).await;
    let api = storefront.api();
    let ghost = product("Ghost", "1.00", 1);

    let err = api
        .add_item(&user("alice"), ghost.id, qty(1))
        .await
        .expect_err("unknown product");
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(rejection_code(&err), Some(ErrorCode::NotFound));

    let err = api.product(ghost.id).await.expect_err("unknown product");
    assert_eq!(rejection_code(&err), Some(ErrorCode::NotFound));
}

#[tokio::test]
async fn test_clear_without_cart_is_not_found() {
    let storefront = TestStorefront::start(Vec::new()).await;
    let err = storefront
        .api()
        .clear_cart(&user("nobody"))
        .await
        .expect_err("no cart");
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(err.to_string(), "Cart not found");
}

#[tokio::test]
async fn test_store_outage_is_a_server_failure() {
    let storefront = TestStorefront::start(Vec::new()).await;
    storefront.carts.set_offline(true);

    let err = storefront
        .api()
        .get_cart(&user("alice"))
        .await
        .expect_err("store offline");
    assert!(matches!(err, ApiError::Server { .. }));
    assert!(err.is_transport_failure());
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_adds_are_not_lost() {
    let mug = product("Coffee Mug", "12.50", 100);
    let storefront = TestStorefront::start(vec![mug.clone()]).await;
    let api = storefront.api();
    let alice = user("alice");
    let mug_id = mug.id;

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let api = api.clone();
            let alice = alice.clone();
            tokio::spawn(async move { api.add_item(&alice, mug_id, qty(1)).await })
        })
        .collect();
    for task in tasks {
        task.await.expect("task panicked").expect("add item");
    }

    let cart = api.get_cart(&alice).await.expect("read cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, qty(20));
    assert_eq!(cart.total_amount, dec("250.00"));
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_product_listing_and_detail() {
    let products = vec![
        product("Wireless Headphones", "99.99", 50),
        product("Coffee Mug", "12.50", 20),
        product("Desk Lamp", "40.00", 5),
    ];
    let storefront = TestStorefront::start(products.clone()).await;
    let api = storefront.api();

    let page = api
        .list_products(&ProductListQuery {
            limit: Some(2),
            sort: Some(SortField::Price),
            order: Some(SortOrder::Asc),
            ..ProductListQuery::default()
        })
        .await
        .expect("list products");
    let names: Vec<&str> = page.products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Coffee Mug", "Desk Lamp"]);
    assert_eq!(page.pagination.total_products, 3);
    assert_eq!(page.pagination.total_pages, 2);
    assert!(page.pagination.has_next);

    let search = api
        .list_products(&ProductListQuery {
            search: Some("MUG".to_string()),
            ..ProductListQuery::default()
        })
        .await
        .expect("search products");
    assert_eq!(search.products.len(), 1);

    let lamp = api.product(products[2].id).await.expect("product detail");
    assert_eq!(lamp.name, "Desk Lamp");
    assert_eq!(lamp.stock, 5);
}

#[tokio::test]
async fn test_invalid_listing_query_is_rejected() {
    let storefront = TestStorefront::start(Vec::new()).await;
    let err = storefront
        .api()
        .list_products(&ProductListQuery {
            page: Some(0),
            ..ProductListQuery::default()
        })
        .await
        .expect_err("page 0");
    assert_eq!(rejection_code(&err), Some(ErrorCode::ValidationError));
    assert_eq!(storefront.catalog.calls(), 0);
}
