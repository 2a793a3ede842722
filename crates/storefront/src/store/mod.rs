//! Storage ports for the catalog and carts.
//!
//! Services talk to storage only through these traits. The `PostgreSQL`
//! adapters live in [`crate::db`]; [`memory`] holds in-process adapters used
//! by tests and local development.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use shopcart_core::catalog::{PageRequest, ProductFilter, ProductSort};
use shopcart_core::{Cart, Product, ProductId, UserId};

/// Errors raised by storage adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or the query failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be turned back into domain values.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Read access to the product catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Products matching `filter`, ordered by `sort`, limited to one page.
    async fn find_products(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> Result<Vec<Product>, StoreError>;

    /// Number of products matching `filter`.
    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError>;

    /// A single product, or `None` if it is not in the catalog.
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Every product among `ids` that exists. Missing ids are skipped.
    async fn find_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError>;
}

/// Persistence for carts, one per user.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The cart owned by `user_id`, if one was ever saved.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Cart>, StoreError>;

    /// Insert or replace the cart for its user.
    ///
    /// Returns the stored cart with its id and timestamps set.
    async fn save(&self, cart: &Cart) -> Result<Cart, StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
