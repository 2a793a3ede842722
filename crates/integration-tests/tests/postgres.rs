//! `PostgreSQL` adapters against a real database.
//!
//! These tests require a running `PostgreSQL` database named by
//! `TEST_DATABASE_URL`. Migrations are applied on connect.
//!
//! Run with: `cargo test -p shopcart-integration-tests -- --ignored`

#![allow(clippy::indexing_slicing)]

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;

use shopcart_core::catalog::{PageRequest, ProductFilter, ProductSort};
use shopcart_core::{Price, ProductId, Quantity, UserId};
use shopcart_integration_tests::product;
use shopcart_storefront::db::{self, PgCartStore, PgCatalog};
use shopcart_storefront::services::{CartService, CartServiceError};
use shopcart_storefront::store::CatalogStore;

async fn pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let pool = db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

fn service(pool: &PgPool) -> CartService {
    CartService::new(
        Arc::new(PgCartStore::new(pool.clone())),
        Arc::new(PgCatalog::new(pool.clone())),
    )
}

/// A user id no other test run shares.
fn fresh_user() -> UserId {
    UserId::parse(&format!("it_{}", ProductId::generate())).expect("valid user id")
}

fn qty(n: u32) -> Quantity {
    Quantity::new(n).expect("non-zero quantity")
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal")
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_product_round_trip() {
    let pool = pool().await;
    let catalog = PgCatalog::new(pool.clone());
    let mut lamp = product("Integration Lamp", "40.00", 10);
    lamp.rating = Some(Decimal::new(45, 1).try_into().expect("valid rating"));
    catalog.insert(&lamp).await.expect("insert product");

    let found = catalog
        .find_product(lamp.id)
        .await
        .expect("find product")
        .expect("product exists");
    assert_eq!(found.name, lamp.name);
    assert_eq!(found.price, lamp.price);
    assert_eq!(found.rating, lamp.rating);

    let filter = ProductFilter::new(None, Some("integration lamp".to_string()));
    let count = catalog.count_products(&filter).await.expect("count");
    assert!(count >= 1);
    let page = catalog
        .find_products(
            &filter,
            ProductSort::default(),
            PageRequest::new(None, None).expect("default page"),
        )
        .await
        .expect("find products");
    assert!(page.iter().any(|p| p.id == lamp.id));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_cart_persists_across_services() {
    let pool = pool().await;
    let mug = product("Integration Mug", "12.50", 20);
    PgCatalog::new(pool.clone())
        .insert(&mug)
        .await
        .expect("insert product");
    let user = fresh_user();

    let first = service(&pool);
    first.add_item(&user, mug.id, qty(2)).await.expect("add");
    let cart = first.add_item(&user, mug.id, qty(1)).await.expect("merge");
    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.total_amount(), dec("37.50"));

    let reread = service(&pool).get_cart(&user).await.expect("read");
    assert_eq!(reread.id(), cart.id());
    assert_eq!(reread.items()[0].quantity, qty(3));
    assert_eq!(reread.items()[0].unit_price, mug.price);
    assert_eq!(reread.total_items(), 3);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_price_stays_locked_after_catalog_change() {
    let pool = pool().await;
    let catalog = PgCatalog::new(pool.clone());
    let mut lamp = product("Integration Price Lamp", "40.00", 10);
    catalog.insert(&lamp).await.expect("insert product");
    let user = fresh_user();
    let carts = service(&pool);

    carts.add_item(&user, lamp.id, qty(1)).await.expect("add");

    lamp.price = Price::new(dec("55.00")).expect("valid price");
    sqlx::query("UPDATE storefront.product SET price = $1 WHERE id = $2")
        .bind(lamp.price.amount())
        .bind(lamp.id)
        .execute(&pool)
        .await
        .expect("reprice product");

    let cart = carts.add_item(&user, lamp.id, qty(1)).await.expect("merge");
    assert_eq!(cart.items()[0].unit_price.amount(), dec("40.00"));
    assert_eq!(cart.total_amount(), dec("80.00"));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_clear_keeps_cart_record() {
    let pool = pool().await;
    let mug = product("Integration Clear Mug", "12.50", 20);
    PgCatalog::new(pool.clone())
        .insert(&mug)
        .await
        .expect("insert product");
    let user = fresh_user();
    let carts = service(&pool);

    let missing = carts.clear_cart(&user).await;
    assert!(matches!(missing, Err(CartServiceError::CartNotFound(_))));

    let cart = carts.add_item(&user, mug.id, qty(2)).await.expect("add");
    let cleared = carts.clear_cart(&user).await.expect("clear");
    assert_eq!(cleared.id(), cart.id());
    assert!(cleared.is_empty());

    let reread = carts.get_cart(&user).await.expect("read");
    assert_eq!(reread.id(), cart.id());
    assert_eq!(reread.total_amount(), Decimal::ZERO);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_concurrent_adds_are_not_lost() {
    let pool = pool().await;
    let mug = product("Integration Busy Mug", "12.50", 100);
    PgCatalog::new(pool.clone())
        .insert(&mug)
        .await
        .expect("insert product");
    let user = fresh_user();
    let carts = Arc::new(service(&pool));

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let carts = Arc::clone(&carts);
            let user = user.clone();
            let product_id = mug.id;
            tokio::spawn(async move { carts.add_item(&user, product_id, qty(1)).await })
        })
        .collect();
    for task in tasks {
        task.await.expect("task panicked").expect("add");
    }

    let cart = carts.get_cart(&user).await.expect("read");
    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].quantity, qty(10));
}
