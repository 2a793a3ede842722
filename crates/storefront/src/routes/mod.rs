//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                   - Liveness check
//! GET    /health/ready             - Readiness check (pings the cart store)
//!
//! # Products
//! GET    /api/products             - Product listing (page, limit, category, search, sort, order)
//! GET    /api/products/{id}        - Product detail
//!
//! # Cart (user id from ?userId= or the body, defaulting to "guest")
//! GET    /api/cart                 - Current cart (empty if none)
//! POST   /api/cart                 - Add item
//! POST   /api/cart/items           - Add item
//! PUT    /api/cart/items/{id}      - Update line quantity
//! DELETE /api/cart/items/{id}      - Remove line
//! DELETE /api/cart/{id}            - Remove line
//! DELETE /api/cart                 - Clear cart
//! ```

pub mod cart;
pub mod extract;
pub mod health;
pub mod products;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::error::AppError;
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{id}", put(cart::update).delete(cart::remove))
        .route("/{id}", delete(cart::remove))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/products", product_routes())
        .nest("/api/cart", cart_routes())
        .fallback(not_found)
}

/// Fallback for unknown routes.
async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
