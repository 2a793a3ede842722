//! Cart reconciliation engine.
//!
//! Applies cart intents to the stored cart: looks up the product, checks live
//! stock, runs the [`Cart`] rules and persists the result. Each mutation for
//! a user runs under that user's lock, so concurrent requests for one cart
//! are applied one after another instead of overwriting each other.
//!
//! A failed mutation never reaches the store; the stored cart is unchanged.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use shopcart_core::{
    Cart, CartError, LineItemId, ProductId, ProductOffer, Quantity, StockLevel, UserId,
};

use super::locks::UserLocks;
use crate::store::{CartStore, CatalogStore, StoreError};

/// Errors returned by [`CartService`].
#[derive(Debug, Error)]
pub enum CartServiceError {
    /// The referenced product is not in the catalog.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The user has no stored cart.
    #[error("cart not found for user {0}")]
    CartNotFound(UserId),

    /// A cart rule rejected the mutation.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Applies cart intents against the catalog and cart stores.
pub struct CartService {
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogStore>,
    locks: UserLocks,
}

impl CartService {
    #[must_use]
    pub fn new(carts: Arc<dyn CartStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            carts,
            catalog,
            locks: UserLocks::new(),
        }
    }

    /// The user's cart, or an unsaved empty cart if none exists.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Store` if the cart store is unavailable.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: &UserId) -> Result<Cart, CartServiceError> {
        Ok(self
            .carts
            .find_by_user(user_id)
            .await?
            .unwrap_or_else(|| Cart::empty(user_id.clone())))
    }

    /// Add `quantity` units of a product, creating the cart if needed.
    ///
    /// An existing line for the product is merged and keeps its price.
    ///
    /// # Errors
    ///
    /// - `ProductNotFound` if the product is not in the catalog
    /// - `Cart(InsufficientStock)` if stock cannot cover the resulting quantity
    /// - `Store` if storage fails
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add_item(
        &self,
        user_id: &UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, CartServiceError> {
        let _guard = self.locks.acquire(user_id).await;

        let product = self
            .catalog
            .find_product(product_id)
            .await?
            .ok_or(CartServiceError::ProductNotFound(product_id))?;

        let mut cart = self.get_cart(user_id).await?;
        let line_id = cart.add_item(
            &ProductOffer::from(&product),
            quantity,
            LineItemId::generate_stored,
        )?;

        let cart = self.carts.save(&cart).await?;
        info!(
            line_id = %line_id,
            quantity = cart.quantity_of(product_id),
            total_items = cart.total_items(),
            "Item added to cart"
        );
        Ok(cart)
    }

    /// Overwrite the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// - `CartNotFound` if the user has no cart
    /// - `Cart(ItemNotFound)` if the line does not exist
    /// - `ProductNotFound` if the line's product left the catalog
    /// - `Cart(InsufficientStock)` if stock cannot cover `quantity`
    /// - `Store` if storage fails
    #[instrument(skip(self), fields(user_id = %user_id, line_id = %line_id))]
    pub async fn update_item_quantity(
        &self,
        user_id: &UserId,
        line_id: LineItemId,
        quantity: Quantity,
    ) -> Result<Cart, CartServiceError> {
        let _guard = self.locks.acquire(user_id).await;

        let mut cart = self.existing_cart(user_id).await?;
        let product_id = cart
            .line(line_id)
            .ok_or(CartError::ItemNotFound(line_id))?
            .product_id;

        let product = self
            .catalog
            .find_product(product_id)
            .await?
            .ok_or(CartServiceError::ProductNotFound(product_id))?;

        cart.set_quantity(line_id, quantity, StockLevel::Known(product.stock))?;

        let cart = self.carts.save(&cart).await?;
        info!(quantity = %quantity, total_items = cart.total_items(), "Cart item updated");
        Ok(cart)
    }

    /// Remove a line. Removing the last line leaves an empty cart.
    ///
    /// # Errors
    ///
    /// - `CartNotFound` if the user has no cart
    /// - `Cart(ItemNotFound)` if the line does not exist
    /// - `Store` if storage fails
    #[instrument(skip(self), fields(user_id = %user_id, line_id = %line_id))]
    pub async fn remove_item(
        &self,
        user_id: &UserId,
        line_id: LineItemId,
    ) -> Result<Cart, CartServiceError> {
        let _guard = self.locks.acquire(user_id).await;

        let mut cart = self.existing_cart(user_id).await?;
        let removed = cart.remove_item(line_id)?;

        let cart = self.carts.save(&cart).await?;
        info!(
            product_id = %removed.product_id,
            total_items = cart.total_items(),
            "Item removed from cart"
        );
        Ok(cart)
    }

    /// Remove every line. The cart record is kept.
    ///
    /// # Errors
    ///
    /// - `CartNotFound` if the user has no cart
    /// - `Store` if storage fails
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear_cart(&self, user_id: &UserId) -> Result<Cart, CartServiceError> {
        let _guard = self.locks.acquire(user_id).await;

        let mut cart = self.existing_cart(user_id).await?;
        cart.clear();

        let cart = self.carts.save(&cart).await?;
        info!("Cart cleared");
        Ok(cart)
    }

    /// Check that the cart store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be reached.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.carts.ping().await
    }

    async fn existing_cart(&self, user_id: &UserId) -> Result<Cart, CartServiceError> {
        self.carts
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| CartServiceError::CartNotFound(user_id.clone()))
    }
}
