//! Local shadow copy of the cart.
//!
//! The shadow mirrors the last cart the storefront returned and takes over
//! when the storefront is unreachable. Offline mutations follow the same cart
//! rules as the server, except that stock is unknown and never checked. New
//! offline lines get `local-` ids.
//!
//! The snapshot is persisted after every change and reloaded on start. The
//! next successful authoritative read replaces it wholesale; offline edits
//! are never replayed to the server.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use shopcart_core::api::{CartView, ProductDisplay};
use shopcart_core::{
    Cart, CartError, LineItemId, Price, Product, ProductId, ProductOffer, Quantity, StockLevel,
    UserId,
};

use crate::storage::KeyValueStore;

/// Storage key of the shadow snapshot.
pub const SHADOW_KEY: &str = "cart";

/// What the client knows about a product without asking the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownProduct {
    pub id: ProductId,
    pub name: String,
    pub image: String,
    pub price: Price,
}

impl KnownProduct {
    #[must_use]
    pub fn display(&self) -> ProductDisplay {
        ProductDisplay {
            name: self.name.clone(),
            image: self.image.clone(),
        }
    }

    /// Offer used for offline adds; stock is unknown.
    const fn offer(&self) -> ProductOffer {
        ProductOffer {
            product_id: self.id,
            unit_price: self.price,
            stock: StockLevel::Unknown,
        }
    }
}

impl From<&Product> for KnownProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            image: product.image.clone(),
            price: product.price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    cart: Cart,
    #[serde(default)]
    products: Vec<KnownProduct>,
}

/// The client-side cart mirror.
pub struct ShadowCache {
    storage: Arc<dyn KeyValueStore>,
    cart: Cart,
    products: HashMap<ProductId, KnownProduct>,
}

impl std::fmt::Debug for ShadowCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowCache")
            .field("cart", &self.cart)
            .field("products", &self.products.len())
            .finish_non_exhaustive()
    }
}

impl ShadowCache {
    /// Load the persisted shadow for `user_id`.
    ///
    /// Unreadable or corrupt data is logged and treated as an empty cart, as
    /// is a snapshot that belongs to another user.
    pub fn load(storage: Arc<dyn KeyValueStore>, user_id: &UserId) -> Self {
        let snapshot = match storage.get(SHADOW_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Snapshot>(&raw) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(error = %e, "Shadow cart is corrupt, starting empty");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read shadow cart, starting empty");
                None
            }
        };

        let (cart, products) = match snapshot {
            Some(Snapshot { cart, products }) => {
                let products = products.into_iter().map(|p| (p.id, p)).collect();
                if cart.user_id() == user_id {
                    (cart, products)
                } else {
                    info!(owner = %cart.user_id(), "Shadow cart belongs to another user, starting empty");
                    (Cart::empty(user_id.clone()), products)
                }
            }
            None => (Cart::empty(user_id.clone()), HashMap::new()),
        };

        Self {
            storage,
            cart,
            products,
        }
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    #[must_use]
    pub fn known_product(&self, id: ProductId) -> Option<&KnownProduct> {
        self.products.get(&id)
    }

    /// Returns true if the shadow holds lines created offline.
    #[must_use]
    pub fn has_local_edits(&self) -> bool {
        self.cart.items().iter().any(|item| item.id.is_local())
    }

    /// Render the shadow the way the API renders a cart.
    #[must_use]
    pub fn view(&self) -> CartView {
        let displays: HashMap<ProductId, ProductDisplay> = self
            .products
            .values()
            .map(|product| (product.id, product.display()))
            .collect();
        CartView::from_cart(&self.cart, &displays)
    }

    /// Record product details for later offline adds and rendering.
    pub fn remember(&mut self, product: KnownProduct) {
        if self.products.get(&product.id) != Some(&product) {
            self.products.insert(product.id, product);
            self.persist();
        }
    }

    /// Replace the shadow with an authoritative cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if the view breaks the one-line-per-product
    /// invariant; the shadow is left untouched.
    pub fn overwrite(&mut self, view: &CartView) -> Result<(), CartError> {
        let (cart, displays) = view.clone().into_cart()?;

        if self.has_local_edits() && !self.cart.same_contents(&cart) {
            warn!(
                discarded_lines = self.cart.items().len(),
                "Reconnected: offline cart edits replaced by the stored cart"
            );
        }

        for item in &view.items {
            let display = displays
                .get(&item.product_id)
                .cloned()
                .unwrap_or_else(ProductDisplay::fallback);
            self.products.insert(
                item.product_id,
                KnownProduct {
                    id: item.product_id,
                    name: display.name,
                    image: display.image,
                    price: item.price,
                },
            );
        }

        self.cart = cart;
        self.persist();
        Ok(())
    }

    /// Add `quantity` of `product`, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityOverflow`] if the merged quantity
    /// overflows.
    pub fn add(
        &mut self,
        product: &KnownProduct,
        quantity: Quantity,
    ) -> Result<LineItemId, CartError> {
        self.products.insert(product.id, product.clone());
        let line_id = self
            .cart
            .add_item(&product.offer(), quantity, LineItemId::generate_local)?;
        debug!(%line_id, product_id = %product.id, "Added item to shadow cart");

        self.persist();
        Ok(line_id)
    }

    /// Overwrite the quantity of a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if the line does not exist.
    pub fn set_quantity(&mut self, line_id: LineItemId, quantity: Quantity) -> Result<(), CartError> {
        self.cart
            .set_quantity(line_id, quantity, StockLevel::Unknown)?;
        self.persist();
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if the line does not exist.
    pub fn remove(&mut self, line_id: LineItemId) -> Result<(), CartError> {
        self.cart.remove_item(line_id)?;
        self.persist();
        Ok(())
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.cart.clear();
        self.persist();
    }

    /// Write the snapshot. Failures are logged; the in-memory shadow stays
    /// usable for the rest of the session.
    fn persist(&self) {
        let snapshot = Snapshot {
            cart: self.cart.clone(),
            products: self.products.values().cloned().collect(),
        };

        let result = serde_json::to_string(&snapshot)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.storage
                    .set(SHADOW_KEY, &raw)
                    .map_err(|e| e.to_string())
            });
        if let Err(error) = result {
            warn!(%error, "Failed to persist shadow cart");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use crate::storage::MemoryStorage;

    use super::*;

    fn known(name: &str, price: &str) -> KnownProduct {
        KnownProduct {
            id: ProductId::generate(),
            name: name.to_string(),
            image: format!("https://img.example/{name}.jpg"),
            price: Price::new(Decimal::from_str(price).unwrap()).unwrap(),
        }
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn user() -> UserId {
        UserId::parse("user_1").unwrap()
    }

    #[test]
    fn test_offline_add_merges_without_stock_check() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::default());
        let mut shadow = ShadowCache::load(storage, &user());
        let watch = known("Smart Watch", "199.99");

        let first = shadow.add(&watch, qty(2)).unwrap();
        let second = shadow.add(&watch, qty(3)).unwrap();
        shadow.add(&watch, qty(10_000)).unwrap();

        assert_eq!(first, second);
        assert!(first.is_local());
        assert_eq!(shadow.cart().items().len(), 1);
        assert_eq!(shadow.cart().total_items(), 10_005);
        assert!(shadow.has_local_edits());
    }

    #[test]
    fn test_mutations_follow_cart_rules() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::default());
        let mut shadow = ShadowCache::load(storage, &user());
        let hub = known("USB-C Hub", "39.99");

        let line = shadow.add(&hub, qty(1)).unwrap();
        shadow.set_quantity(line, qty(3)).unwrap();
        assert_eq!(shadow.view().total_amount, Decimal::from_str("119.97").unwrap());

        shadow.remove(line).unwrap();
        assert!(matches!(
            shadow.remove(line),
            Err(CartError::ItemNotFound(_))
        ));
        assert!(matches!(
            shadow.set_quantity(line, qty(1)),
            Err(CartError::ItemNotFound(_))
        ));
        assert!(shadow.cart().is_empty());
        assert_eq!(shadow.view().total_amount, Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::default());
        let hub = known("USB-C Hub", "39.99");
        {
            let mut shadow = ShadowCache::load(storage.clone(), &user());
            shadow.add(&hub, qty(2)).unwrap();
        }

        let shadow = ShadowCache::load(storage, &user());
        let view = shadow.view();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].name, "USB-C Hub");
        assert_eq!(view.total_items, 2);
        assert_eq!(shadow.known_product(hub.id), Some(&hub));
    }

    #[test]
    fn test_corrupt_snapshot_is_empty() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::default());
        storage.set(SHADOW_KEY, "{\"cart\": 42}").unwrap();

        let shadow = ShadowCache::load(storage, &user());
        assert!(shadow.cart().is_empty());
        assert_eq!(shadow.cart().user_id(), &user());
    }

    #[test]
    fn test_snapshot_of_other_user_is_ignored() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::default());
        let hub = known("USB-C Hub", "39.99");
        ShadowCache::load(storage.clone(), &user())
            .add(&hub, qty(1))
            .unwrap();

        let other = UserId::parse("user_2").unwrap();
        let shadow = ShadowCache::load(storage, &other);
        assert!(shadow.cart().is_empty());
        assert!(shadow.known_product(hub.id).is_some());
    }

    #[test]
    fn test_overwrite_replaces_offline_edits() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::default());
        let mut shadow = ShadowCache::load(storage, &user());
        let hub = known("USB-C Hub", "39.99");
        let watch = known("Smart Watch", "199.99");
        shadow.add(&hub, qty(4)).unwrap();

        let mut server = Cart::empty(user());
        server
            .add_item(
                &ProductOffer {
                    product_id: watch.id,
                    unit_price: watch.price,
                    stock: StockLevel::Known(5),
                },
                qty(1),
                LineItemId::generate_stored,
            )
            .unwrap();
        let displays = HashMap::from([(watch.id, watch.display())]);
        let view = CartView::from_cart(&server, &displays);

        shadow.overwrite(&view).unwrap();

        assert!(!shadow.has_local_edits());
        assert!(shadow.cart().same_contents(&server));
        assert_eq!(shadow.view(), view);
        assert_eq!(shadow.known_product(watch.id).unwrap().name, "Smart Watch");
    }
}
