//! Catalog queries with a short-lived product cache.
//!
//! Product detail and cart display lookups go through a `moka` cache (1-minute
//! TTL). Stock checks for cart mutations never use this cache; the cart
//! service reads the store directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use shopcart_core::api::ProductDisplay;
use shopcart_core::catalog::{PageRequest, Pagination, ProductFilter, ProductPage, ProductSort};
use shopcart_core::{Product, ProductId};

use crate::store::{CatalogStore, StoreError};

const CACHE_CAPACITY: u64 = 1000;
const CACHE_TTL: Duration = Duration::from_secs(60);

/// Read-side catalog service.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    cache: Cache<ProductId, Product>,
}

impl CatalogService {
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Self { store, cache }
    }

    /// One page of products with pagination metadata.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the catalog cannot be read.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> Result<ProductPage, StoreError> {
        let products = self.store.find_products(filter, sort, page).await?;
        let total = self.store.count_products(filter).await?;

        Ok(ProductPage {
            products,
            pagination: Pagination::new(page, total),
        })
    }

    /// A single product, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the catalog cannot be read.
    #[instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        if let Some(product) = self.cache.get(&id).await {
            debug!("Cache hit for product");
            return Ok(Some(product));
        }

        let product = self.store.find_product(id).await?;
        if let Some(product) = &product {
            self.cache.insert(id, product.clone()).await;
        }
        Ok(product)
    }

    /// Display fields for `ids`. Products missing from the catalog are
    /// absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if uncached products cannot be read.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn displays(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductDisplay>, StoreError> {
        let mut displays = HashMap::with_capacity(ids.len());
        let mut missing = Vec::new();

        for id in ids {
            match self.cache.get(id).await {
                Some(product) => {
                    displays.insert(*id, ProductDisplay::from(&product));
                }
                None => missing.push(*id),
            }
        }

        if !missing.is_empty() {
            for product in self.store.find_products_by_ids(&missing).await? {
                displays.insert(product.id, ProductDisplay::from(&product));
                self.cache.insert(product.id, product).await;
            }
        }

        Ok(displays)
    }

    /// Drop a cached product.
    #[cfg(test)]
    pub(crate) async fn invalidate(&self, id: ProductId) {
        self.cache.invalidate(&id).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use shopcart_core::Price;

    use super::*;
    use crate::store::memory::MemoryCatalog;

    fn product(name: &str) -> Product {
        Product {
            id: ProductId::generate(),
            name: name.to_string(),
            description: String::new(),
            price: Price::new(Decimal::from_str("10.00").unwrap()).unwrap(),
            category: "Electronics".to_string(),
            image: format!("https://img.example/{name}.jpg"),
            images: Vec::new(),
            stock: 5,
            rating: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_product_is_cached() {
        let watch = product("watch");
        let store = Arc::new(MemoryCatalog::with_products(vec![watch.clone()]));
        let service = CatalogService::new(store.clone());

        assert_eq!(service.product(watch.id).await.unwrap(), Some(watch.clone()));
        assert_eq!(service.product(watch.id).await.unwrap(), Some(watch.clone()));
        assert_eq!(store.calls(), 1);

        service.invalidate(watch.id).await;
        service.product(watch.id).await.unwrap();
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test]
    async fn test_displays_skip_missing_products() {
        let watch = product("watch");
        let store = Arc::new(MemoryCatalog::with_products(vec![watch.clone()]));
        let service = CatalogService::new(store);

        let gone = ProductId::generate();
        let displays = service.displays(&[watch.id, gone]).await.unwrap();
        assert_eq!(displays.len(), 1);
        assert_eq!(displays[&watch.id].name, "watch");
        assert!(!displays.contains_key(&gone));
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let store = Arc::new(MemoryCatalog::with_products(vec![
            product("a"),
            product("b"),
            product("c"),
        ]));
        let service = CatalogService::new(store);

        let page = service
            .list(
                &ProductFilter::default(),
                ProductSort::default(),
                PageRequest::new(Some(2), Some(2)).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(page.products.len(), 1);
        assert_eq!(page.pagination.total_products, 3);
        assert_eq!(page.pagination.total_pages, 2);
        assert!(page.pagination.has_prev);
        assert!(!page.pagination.has_next);
    }
}
