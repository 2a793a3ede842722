//! In-process store adapters.
//!
//! Both adapters count calls so tests can assert that a request was rejected
//! before touching storage, and both can be switched offline to exercise
//! store-unavailable handling.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use shopcart_core::catalog::{PageRequest, ProductFilter, ProductSort, SortField, SortOrder};
use shopcart_core::{Cart, CartId, Product, ProductId, UserId};

use super::{CartStore, CatalogStore, StoreError};

/// Shared bookkeeping for the memory adapters.
#[derive(Debug, Default)]
struct Availability {
    calls: AtomicUsize,
    offline: AtomicBool,
}

impl Availability {
    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

/// Catalog held in memory.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: RwLock<Vec<Product>>,
    availability: Availability,
}

impl MemoryCatalog {
    /// Create a catalog holding `products`.
    #[must_use]
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(products),
            availability: Availability::default(),
        }
    }

    /// Add or replace a product.
    pub fn upsert(&self, product: Product) {
        let mut products = self
            .products
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = products.iter_mut().find(|p| p.id == product.id) {
            *existing = product;
        } else {
            products.push(product);
        }
    }

    /// Remove a product, as if it were deleted from the catalog.
    pub fn remove(&self, id: ProductId) {
        self.products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|p| p.id != id);
    }

    /// Number of store calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.availability.calls.load(AtomicOrdering::SeqCst)
    }

    /// Make every following call fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.availability
            .offline
            .store(offline, AtomicOrdering::SeqCst);
    }

    fn matching(&self, filter: &ProductFilter) -> Vec<Product> {
        self.products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect()
    }
}

fn compare(a: &Product, b: &Product, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Price => a.price.amount().cmp(&b.price.amount()),
        SortField::Name => a.name.cmp(&b.name),
        SortField::Rating => a.rating.cmp(&b.rating),
        SortField::Stock => a.stock.cmp(&b.stock),
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn find_products(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> Result<Vec<Product>, StoreError> {
        self.availability.enter()?;

        let mut products = self.matching(filter);
        products.sort_by(|a, b| {
            let ordering = compare(a, b, sort.field).then_with(|| a.id.cmp(&b.id));
            match sort.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        Ok(products.into_iter().skip(skip).take(take).collect())
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        self.availability.enter()?;
        Ok(u64::try_from(self.matching(filter).len()).unwrap_or(u64::MAX))
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.availability.enter()?;
        Ok(self
            .products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn find_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        self.availability.enter()?;
        Ok(self
            .products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

/// Carts held in memory, keyed by user.
#[derive(Debug, Default)]
pub struct MemoryCartStore {
    carts: RwLock<HashMap<UserId, Cart>>,
    availability: Availability,
}

impl MemoryCartStore {
    /// Number of store calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.availability.calls.load(AtomicOrdering::SeqCst)
    }

    /// Make every following call fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.availability
            .offline
            .store(offline, AtomicOrdering::SeqCst);
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Cart>, StoreError> {
        self.availability.enter()?;
        Ok(self
            .carts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned())
    }

    async fn save(&self, cart: &Cart) -> Result<Cart, StoreError> {
        self.availability.enter()?;

        let now = Utc::now();
        let mut carts = self.carts.write().unwrap_or_else(PoisonError::into_inner);
        let (id, created_at) = carts
            .get(cart.user_id())
            .and_then(|existing| existing.id().zip(existing.created_at()))
            .unwrap_or_else(|| (cart.id().unwrap_or_else(CartId::generate), now));

        let stored = cart.clone().persisted(id, created_at, now);
        carts.insert(cart.user_id().clone(), stored.clone());
        Ok(stored)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.availability.enter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use shopcart_core::{LineItemId, Price, ProductOffer, Quantity};

    use super::*;

    fn product(name: &str, price: &str, category: &str) -> Product {
        Product {
            id: ProductId::generate(),
            name: name.to_string(),
            description: String::new(),
            price: Price::new(Decimal::from_str(price).unwrap()).unwrap(),
            category: category.to_string(),
            image: String::new(),
            images: Vec::new(),
            stock: 10,
            rating: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_catalog_sort_filter_and_page() {
        let catalog = MemoryCatalog::with_products(vec![
            product("Laptop Stand", "49.99", "Accessories"),
            product("Smart Watch", "199.99", "Electronics"),
            product("USB-C Hub", "39.99", "Electronics"),
        ]);

        let filter = ProductFilter::new(Some("Electronics".to_string()), None);
        let sort = ProductSort {
            field: SortField::Price,
            order: SortOrder::Asc,
        };
        let page = PageRequest::new(Some(1), Some(1)).unwrap();

        let products = catalog.find_products(&filter, sort, page).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "USB-C Hub");
        assert_eq!(catalog.count_products(&filter).await.unwrap(), 2);
        assert_eq!(catalog.calls(), 2);
    }

    #[tokio::test]
    async fn test_catalog_offline() {
        let catalog = MemoryCatalog::default();
        catalog.set_offline(true);
        assert!(matches!(
            catalog.find_product(ProductId::generate()).await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_cart_save_keeps_identity() {
        let store = MemoryCartStore::default();
        let user = UserId::parse("user_1").unwrap();
        let item = product("Smart Watch", "199.99", "Electronics");

        let mut cart = Cart::empty(user.clone());
        cart.add_item(
            &ProductOffer::from(&item),
            Quantity::ONE,
            LineItemId::generate_stored,
        )
        .unwrap();

        let first = store.save(&cart).await.unwrap();
        let second = store.save(&Cart::empty(user.clone())).await.unwrap();

        assert!(first.id().is_some());
        assert_eq!(first.id(), second.id());
        assert_eq!(first.created_at(), second.created_at());
        assert!(store.find_by_user(&user).await.unwrap().unwrap().is_empty());
    }
}
