//! Cart state and the rules every cart mutation follows.
//!
//! The same rules run on the server (against live catalog stock) and in the
//! client's shadow cart (where stock is unknown). They guarantee:
//!
//! - at most one line per product; repeated adds merge quantities
//! - every quantity is at least one
//! - a failed mutation leaves the cart unchanged
//! - `total_amount` and `total_items` are a full fold over the current lines,
//!   recomputed after every mutation and on every load, never kept as a
//!   running counter
//!
//! When a product that is already in the cart is added again, the unit price
//! captured by the first add is kept (prices are locked at add time).

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{CartId, LineItemId, Price, ProductId, Quantity, UserId};

/// Errors produced by cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// No line with this id exists in the cart.
    #[error("item {0} not found in cart")]
    ItemNotFound(LineItemId),

    /// The product does not have enough units for the requested quantity.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u64,
        available: u32,
    },

    /// Merging quantities would exceed the representable range.
    #[error("quantity for product {0} is too large")]
    QuantityOverflow(ProductId),

    /// Stored cart data holds two lines for one product.
    #[error("cart holds more than one line for product {0}")]
    DuplicateProduct(ProductId),

    /// Stored cart data reuses a line id.
    #[error("cart holds more than one line with id {0}")]
    DuplicateLine(LineItemId),
}

/// Stock known for a product at mutation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    /// Live stock read from the catalog.
    Known(u32),
    /// No reliable catalog view (offline shadow cart); stock is not checked.
    Unknown,
}

impl StockLevel {
    fn check(self, product_id: ProductId, requested: u64) -> Result<(), CartError> {
        match self {
            Self::Known(available) if u64::from(available) < requested => {
                Err(CartError::InsufficientStock {
                    product_id,
                    requested,
                    available,
                })
            }
            Self::Known(_) | Self::Unknown => Ok(()),
        }
    }
}

/// What a cart needs to know about a product to add it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductOffer {
    pub product_id: ProductId,
    pub unit_price: Price,
    pub stock: StockLevel,
}

impl From<&Product> for ProductOffer {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            unit_price: product.price,
            stock: StockLevel::Known(product.stock),
        }
    }
}

/// One product-quantity-price triple within a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub id: LineItemId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    /// Unit price captured when the line was created.
    #[serde(rename = "price")]
    pub unit_price: Price,
}

impl CartLineItem {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.line_total(self.quantity)
    }
}

/// Totals derived from a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    /// Σ unit price × quantity.
    pub amount: Decimal,
    /// Σ quantity.
    pub items: u64,
}

impl CartTotals {
    /// Fold totals over `items`.
    #[must_use]
    pub fn of(items: &[CartLineItem]) -> Self {
        items.iter().fold(Self::default(), |totals, item| Self {
            amount: totals.amount.saturating_add(item.line_total()),
            items: totals.items.saturating_add(u64::from(item.quantity.get())),
        })
    }
}

/// The cart owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CartDocument", into = "CartDocument")]
pub struct Cart {
    id: Option<CartId>,
    user_id: UserId,
    items: Vec<CartLineItem>,
    totals: CartTotals,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// An empty, not yet persisted cart.
    #[must_use]
    pub const fn empty(user_id: UserId) -> Self {
        Self {
            id: None,
            user_id,
            items: Vec::new(),
            totals: CartTotals {
                amount: Decimal::ZERO,
                items: 0,
            },
            created_at: None,
            updated_at: None,
        }
    }

    /// Build a cart from stored lines, recomputing totals.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::DuplicateProduct`] or [`CartError::DuplicateLine`]
    /// if the lines break the one-line-per-product invariant.
    pub fn from_lines(user_id: UserId, items: Vec<CartLineItem>) -> Result<Self, CartError> {
        let mut products = HashSet::with_capacity(items.len());
        let mut lines = HashSet::with_capacity(items.len());
        for item in &items {
            if !products.insert(item.product_id) {
                return Err(CartError::DuplicateProduct(item.product_id));
            }
            if !lines.insert(item.id) {
                return Err(CartError::DuplicateLine(item.id));
            }
        }

        let mut cart = Self::empty(user_id);
        cart.items = items;
        cart.recompute_totals();
        Ok(cart)
    }

    /// Attach store metadata to a cart.
    #[must_use]
    pub fn persisted(
        mut self,
        id: CartId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        self.id = Some(id);
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
        self
    }

    /// Attach a store id without timestamps (carts rebuilt from API views).
    #[must_use]
    pub fn with_id(mut self, id: Option<CartId>) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub const fn id(&self) -> Option<CartId> {
        self.id
    }

    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    #[must_use]
    pub const fn totals(&self) -> CartTotals {
        self.totals
    }

    #[must_use]
    pub const fn total_amount(&self) -> Decimal {
        self.totals.amount
    }

    #[must_use]
    pub const fn total_items(&self) -> u64 {
        self.totals.items
    }

    #[must_use]
    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    #[must_use]
    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find a line by id.
    #[must_use]
    pub fn line(&self, id: LineItemId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Find the line holding `product_id`.
    #[must_use]
    pub fn line_for_product(&self, product_id: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    /// Quantity of `product_id` in the cart (zero if absent).
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.line_for_product(product_id)
            .map_or(0, |item| item.quantity.get())
    }

    /// Add `quantity` units of a product.
    ///
    /// If the product already has a line, its quantity becomes
    /// `existing + quantity` and its captured price is kept. Otherwise a new
    /// line is appended with an id from `new_line_id` and the offered price.
    /// Returns the id of the affected line.
    ///
    /// # Errors
    ///
    /// - [`CartError::InsufficientStock`] if known stock is below the
    ///   resulting quantity
    /// - [`CartError::QuantityOverflow`] if the merged quantity overflows
    pub fn add_item(
        &mut self,
        offer: &ProductOffer,
        quantity: Quantity,
        new_line_id: impl FnOnce() -> LineItemId,
    ) -> Result<LineItemId, CartError> {
        let id = if let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.product_id == offer.product_id)
        {
            let merged = existing
                .quantity
                .checked_add(quantity)
                .ok_or(CartError::QuantityOverflow(offer.product_id))?;
            offer
                .stock
                .check(offer.product_id, u64::from(merged.get()))?;
            existing.quantity = merged;
            existing.id
        } else {
            offer
                .stock
                .check(offer.product_id, u64::from(quantity.get()))?;
            let item = CartLineItem {
                id: new_line_id(),
                product_id: offer.product_id,
                quantity,
                unit_price: offer.unit_price,
            };
            self.items.push(item);
            item.id
        };

        self.recompute_totals();
        Ok(id)
    }

    /// Overwrite the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// - [`CartError::ItemNotFound`] if no line has this id
    /// - [`CartError::InsufficientStock`] if known stock is below `quantity`
    pub fn set_quantity(
        &mut self,
        id: LineItemId,
        quantity: Quantity,
        stock: StockLevel,
    ) -> Result<(), CartError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(CartError::ItemNotFound(id))?;
        stock.check(item.product_id, u64::from(quantity.get()))?;
        item.quantity = quantity;

        self.recompute_totals();
        Ok(())
    }

    /// Remove a line, returning it. An empty cart afterwards is valid.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if no line has this id.
    pub fn remove_item(&mut self, id: LineItemId) -> Result<CartLineItem, CartError> {
        let position = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(CartError::ItemNotFound(id))?;
        let removed = self.items.remove(position);

        self.recompute_totals();
        Ok(removed)
    }

    /// Remove every line. The cart itself (id, owner) is kept.
    pub fn clear(&mut self) {
        self.items.clear();
        self.recompute_totals();
    }

    /// Returns true if both carts hold the same products at the same
    /// quantities and prices, ignoring line ids and metadata.
    #[must_use]
    pub fn same_contents(&self, other: &Self) -> bool {
        self.contents() == other.contents()
    }

    /// Lines keyed by product, without ids.
    #[must_use]
    pub fn contents(&self) -> BTreeMap<ProductId, (Quantity, Price)> {
        self.items
            .iter()
            .map(|item| (item.product_id, (item.quantity, item.unit_price)))
            .collect()
    }

    fn recompute_totals(&mut self) {
        self.totals = CartTotals::of(&self.items);
    }
}

/// Serialized form of a [`Cart`].
///
/// Totals are written for readers but ignored on input; they are always
/// recomputed from `items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartDocument {
    #[serde(default)]
    id: Option<CartId>,
    user_id: UserId,
    #[serde(default)]
    items: Vec<CartLineItem>,
    #[serde(default)]
    total_amount: Decimal,
    #[serde(default)]
    total_items: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<CartDocument> for Cart {
    type Error = CartError;

    fn try_from(doc: CartDocument) -> Result<Self, Self::Error> {
        let mut cart = Self::from_lines(doc.user_id, doc.items)?;
        cart.id = doc.id;
        cart.created_at = doc.created_at;
        cart.updated_at = doc.updated_at;
        Ok(cart)
    }
}

impl From<Cart> for CartDocument {
    fn from(cart: Cart) -> Self {
        Self {
            id: cart.id,
            user_id: cart.user_id,
            items: cart.items,
            total_amount: cart.totals.amount,
            total_items: cart.totals.items,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn offer(price: &str, stock: u32) -> ProductOffer {
        ProductOffer {
            product_id: ProductId::generate(),
            unit_price: Price::new(dec(price)).unwrap(),
            stock: StockLevel::Known(stock),
        }
    }

    fn guest_cart() -> Cart {
        Cart::empty(UserId::guest())
    }

    #[test]
    fn test_totals_are_a_pure_fold() {
        let mut cart = guest_cart();
        cart.add_item(&offer("10.50", 10), qty(2), LineItemId::generate_stored)
            .unwrap();
        cart.add_item(&offer("0.25", 10), qty(4), LineItemId::generate_stored)
            .unwrap();

        let first = CartTotals::of(cart.items());
        let second = CartTotals::of(cart.items());
        assert_eq!(first, second);
        assert_eq!(first, cart.totals());
        assert_eq!(cart.total_amount(), dec("22.00"));
        assert_eq!(cart.total_items(), 6);
    }

    #[test]
    fn test_repeated_add_merges_into_one_line() {
        let product = offer("5.00", 10);
        let mut cart = guest_cart();

        let first = cart
            .add_item(&product, qty(2), LineItemId::generate_stored)
            .unwrap();
        let second = cart
            .add_item(&product, qty(3), LineItemId::generate_stored)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.quantity_of(product.product_id), 5);
        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.total_amount(), dec("25.00"));
    }

    #[test]
    fn test_merge_keeps_captured_price() {
        let mut product = offer("5.00", 10);
        let mut cart = guest_cart();
        cart.add_item(&product, qty(1), LineItemId::generate_stored)
            .unwrap();

        product.unit_price = Price::new(dec("7.00")).unwrap();
        cart.add_item(&product, qty(1), LineItemId::generate_stored)
            .unwrap();

        let line = cart.line_for_product(product.product_id).unwrap();
        assert_eq!(line.unit_price.amount(), dec("5.00"));
        assert_eq!(cart.total_amount(), dec("10.00"));
    }

    #[test]
    fn test_stock_gate_on_new_line_leaves_cart_unchanged() {
        let product = offer("1.00", 5);
        let mut cart = guest_cart();
        let before = cart.clone();

        let err = cart
            .add_item(&product, qty(6), LineItemId::generate_stored)
            .unwrap_err();

        assert_eq!(
            err,
            CartError::InsufficientStock {
                product_id: product.product_id,
                requested: 6,
                available: 5,
            }
        );
        assert_eq!(cart, before);
    }

    #[test]
    fn test_stock_gate_counts_existing_quantity() {
        let product = offer("1.00", 5);
        let mut cart = guest_cart();
        cart.add_item(&product, qty(3), LineItemId::generate_stored)
            .unwrap();
        let before = cart.clone();

        let err = cart
            .add_item(&product, qty(3), LineItemId::generate_stored)
            .unwrap_err();

        assert!(matches!(
            err,
            CartError::InsufficientStock { requested: 6, .. }
        ));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_unknown_stock_is_not_checked() {
        let mut product = offer("1.00", 0);
        product.stock = StockLevel::Unknown;
        let mut cart = guest_cart();

        cart.add_item(&product, qty(100), LineItemId::generate_local)
            .unwrap();
        assert_eq!(cart.total_items(), 100);
        assert!(cart.items().iter().all(|item| item.id.is_local()));
    }

    #[test]
    fn test_merge_overflow_is_an_error() {
        let mut product = offer("1.00", 0);
        product.stock = StockLevel::Unknown;
        let mut cart = guest_cart();
        cart.add_item(&product, qty(u32::MAX), LineItemId::generate_local)
            .unwrap();

        assert_eq!(
            cart.add_item(&product, qty(1), LineItemId::generate_local),
            Err(CartError::QuantityOverflow(product.product_id))
        );
    }

    #[test]
    fn test_set_quantity() {
        let product = offer("2.00", 5);
        let mut cart = guest_cart();
        let line = cart
            .add_item(&product, qty(1), LineItemId::generate_stored)
            .unwrap();

        cart.set_quantity(line, qty(4), StockLevel::Known(5)).unwrap();
        assert_eq!(cart.total_items(), 4);
        assert_eq!(cart.total_amount(), dec("8.00"));

        assert!(matches!(
            cart.set_quantity(line, qty(6), StockLevel::Known(5)),
            Err(CartError::InsufficientStock { .. })
        ));
        assert_eq!(cart.total_items(), 4);

        let missing = LineItemId::generate_stored();
        assert_eq!(
            cart.set_quantity(missing, qty(1), StockLevel::Unknown),
            Err(CartError::ItemNotFound(missing))
        );
    }

    #[test]
    fn test_remove_to_empty() {
        let mut cart = guest_cart();
        let line = cart
            .add_item(&offer("3.00", 5), qty(2), LineItemId::generate_stored)
            .unwrap();

        let removed = cart.remove_item(line).unwrap();
        assert_eq!(removed.id, line);
        assert!(cart.is_empty());
        assert_eq!(cart.total_amount(), Decimal::ZERO);
        assert_eq!(cart.total_items(), 0);

        assert_eq!(cart.remove_item(line), Err(CartError::ItemNotFound(line)));
    }

    #[test]
    fn test_clear_keeps_identity() {
        let id = CartId::generate();
        let now = Utc::now();
        let mut cart = guest_cart().persisted(id, now, now);
        cart.add_item(&offer("3.00", 5), qty(2), LineItemId::generate_stored)
            .unwrap();

        cart.clear();
        assert_eq!(cart.id(), Some(id));
        assert!(cart.is_empty());
        assert_eq!(cart.totals(), CartTotals::default());
    }

    #[test]
    fn test_deserialization_ignores_stored_totals() {
        let product = ProductId::generate();
        let line = LineItemId::generate_stored();
        let json = format!(
            r#"{{
                "userId": "user_1",
                "items": [{{"id": "{line}", "productId": "{product}", "quantity": 3, "price": "1.50"}}],
                "totalAmount": "999",
                "totalItems": 42
            }}"#
        );

        let cart: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(cart.total_amount(), dec("4.50"));
        assert_eq!(cart.total_items(), 3);
    }

    #[test]
    fn test_deserialization_rejects_duplicate_products() {
        let product = ProductId::generate();
        let json = format!(
            r#"{{
                "userId": "user_1",
                "items": [
                    {{"id": "{}", "productId": "{product}", "quantity": 1, "price": "1"}},
                    {{"id": "{}", "productId": "{product}", "quantity": 1, "price": "1"}}
                ]
            }}"#,
            LineItemId::generate_stored(),
            LineItemId::generate_stored()
        );

        assert!(serde_json::from_str::<Cart>(&json).is_err());
    }

    #[test]
    fn test_serialization_writes_totals() {
        let mut cart = guest_cart();
        cart.add_item(&offer("2.50", 5), qty(2), LineItemId::generate_stored)
            .unwrap();

        let value = serde_json::to_value(&cart).unwrap();
        assert_eq!(value["totalAmount"], "5.00");
        assert_eq!(value["totalItems"], 2);
        assert_eq!(value["userId"], "guest");
    }

    #[test]
    fn test_same_contents_ignores_line_ids() {
        let product = offer("2.50", 5);
        let mut server = guest_cart();
        let mut shadow = guest_cart();
        server
            .add_item(&product, qty(2), LineItemId::generate_stored)
            .unwrap();
        shadow
            .add_item(&product, qty(2), LineItemId::generate_local)
            .unwrap();

        assert!(server.same_contents(&shadow));
        shadow.clear();
        assert!(!server.same_contents(&shadow));
    }
}
