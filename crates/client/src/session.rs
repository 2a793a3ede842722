//! Cart session: the presentation-side view of one user's cart.
//!
//! Every intent goes to the storefront first. A successful answer carries the
//! full authoritative cart, which replaces both the shown cart and the
//! shadow. When the storefront cannot be reached the same intent is applied
//! to the shadow instead and the shadow becomes the shown cart until the next
//! successful read. Any failed call counts: an unreachable service, a timeout
//! and a refused request all fall back the same way, and the failure message
//! is kept for display.

use std::sync::Arc;

use thiserror::Error;
use tracing::{instrument, warn};

use shopcart_core::api::CartView;
use shopcart_core::{CartError, LineItemId, Product, ProductId, Quantity, QuantityError, UserId};

use crate::api::{ApiError, RemoteCart};
use crate::identity;
use crate::shadow::{KnownProduct, ShadowCache};
use crate::storage::{KeyValueStore, StorageError};

/// Where the currently shown cart came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartSource {
    /// The last read reached the storefront.
    Remote,
    /// The storefront was unreachable; the shadow copy is shown.
    Shadow,
}

/// Errors returned by cart session intents.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The intent broke a cart rule while applied offline.
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("invalid quantity: {0}")]
    Quantity(#[from] QuantityError),

    /// A line created offline no longer exists after reconnecting.
    #[error("cart line {0} was created offline and was discarded on reconnect")]
    UnknownLocalLine(LineItemId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One user's cart as seen by a client.
pub struct CartSession {
    remote: Arc<dyn RemoteCart>,
    user_id: UserId,
    shadow: ShadowCache,
    view: CartView,
    source: CartSource,
    last_error: Option<String>,
}

impl std::fmt::Debug for CartSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSession")
            .field("user_id", &self.user_id)
            .field("source", &self.source)
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

impl CartSession {
    /// Open a session for the persisted user id, creating one on first use.
    ///
    /// The shown cart starts as the shadow; call [`CartSession::load`] to
    /// fetch the stored cart.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the user id cannot be read or
    /// stored.
    pub fn open(
        remote: Arc<dyn RemoteCart>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Result<Self, SessionError> {
        let user_id = identity::load_or_create(storage.as_ref())?;
        Ok(Self::for_user(remote, storage, user_id))
    }

    /// Open a session for an explicit user id.
    #[must_use]
    pub fn for_user(
        remote: Arc<dyn RemoteCart>,
        storage: Arc<dyn KeyValueStore>,
        user_id: UserId,
    ) -> Self {
        let shadow = ShadowCache::load(storage, &user_id);
        let view = shadow.view();

        Self {
            remote,
            user_id,
            shadow,
            view,
            source: CartSource::Shadow,
            last_error: None,
        }
    }

    /// Fetch the stored cart, falling back to the shadow on failure.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if an authoritative cart cannot be
    /// persisted to the shadow.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn load(&mut self) -> Result<&CartView, SessionError> {
        match self.remote.get_cart(&self.user_id).await {
            Ok(view) => self.accept(view)?,
            Err(e) => self.fall_back(&e),
        }
        Ok(&self.view)
    }

    /// Add `quantity` of `product`.
    ///
    /// The product is remembered for later offline adds once the intent has
    /// landed in either cart.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cart`] if the offline add breaks a cart rule.
    #[instrument(skip(self, product), fields(user_id = %self.user_id, product_id = %product.id))]
    pub async fn add(
        &mut self,
        product: &KnownProduct,
        quantity: Quantity,
    ) -> Result<&CartView, SessionError> {
        match self
            .remote
            .add_item(&self.user_id, product.id, quantity)
            .await
        {
            Ok(view) => {
                self.shadow.remember(product.clone());
                self.accept(view)?;
            }
            Err(e) => {
                self.fall_back(&e);
                self.shadow.add(product, quantity)?;
                self.view = self.shadow.view();
            }
        }
        Ok(&self.view)
    }

    /// Set the quantity of a line. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cart`] if the line is not in the shadow when
    /// the intent falls back, [`SessionError::UnknownLocalLine`] for an
    /// offline line discarded on reconnect.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn update_quantity(
        &mut self,
        line_id: LineItemId,
        quantity: i64,
    ) -> Result<&CartView, SessionError> {
        if quantity <= 0 {
            return self.remove(line_id).await;
        }
        let quantity = Quantity::from_signed(quantity)?;

        if line_id.is_local() {
            self.require_offline(line_id).await?;
            self.shadow.set_quantity(line_id, quantity)?;
            self.view = self.shadow.view();
            return Ok(&self.view);
        }

        match self
            .remote
            .update_item(&self.user_id, line_id, quantity)
            .await
        {
            Ok(view) => self.accept(view)?,
            Err(e) => {
                self.fall_back(&e);
                self.shadow.set_quantity(line_id, quantity)?;
                self.view = self.shadow.view();
            }
        }
        Ok(&self.view)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cart`] if the line is not in the shadow when
    /// the intent falls back, [`SessionError::UnknownLocalLine`] for an
    /// offline line discarded on reconnect.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn remove(&mut self, line_id: LineItemId) -> Result<&CartView, SessionError> {
        if line_id.is_local() {
            self.require_offline(line_id).await?;
            self.shadow.remove(line_id)?;
            self.view = self.shadow.view();
            return Ok(&self.view);
        }

        match self.remote.remove_item(&self.user_id, line_id).await {
            Ok(view) => self.accept(view)?,
            Err(e) => {
                self.fall_back(&e);
                self.shadow.remove(line_id)?;
                self.view = self.shadow.view();
            }
        }
        Ok(&self.view)
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if an authoritative cart cannot be
    /// persisted to the shadow.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn clear(&mut self) -> Result<&CartView, SessionError> {
        match self.remote.clear_cart(&self.user_id).await {
            Ok(view) => self.accept(view)?,
            Err(e) => {
                self.fall_back(&e);
                self.shadow.clear();
                self.view = self.shadow.view();
            }
        }
        Ok(&self.view)
    }

    /// The cart currently shown.
    #[must_use]
    pub const fn cart(&self) -> &CartView {
        &self.view
    }

    #[must_use]
    pub const fn source(&self) -> CartSource {
        self.source
    }

    /// Message of the last failed storefront call, cleared by the next
    /// successful one.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn is_in_cart(&self, product_id: ProductId) -> bool {
        self.view
            .items
            .iter()
            .any(|item| item.product_id == product_id)
    }

    /// Quantity of `product_id` in the shown cart, zero if absent.
    #[must_use]
    pub fn item_quantity(&self, product_id: ProductId) -> u32 {
        self.view
            .items
            .iter()
            .find(|item| item.product_id == product_id)
            .map_or(0, |item| item.quantity.get())
    }

    /// Product details known without asking the catalog.
    #[must_use]
    pub fn known_product(&self, product_id: ProductId) -> Option<&KnownProduct> {
        self.shadow.known_product(product_id)
    }

    /// Keep product details for offline adds.
    pub fn remember(&mut self, product: &Product) {
        self.shadow.remember(KnownProduct::from(product));
    }

    /// Take an authoritative cart.
    fn accept(&mut self, view: CartView) -> Result<(), SessionError> {
        self.shadow.overwrite(&view)?;
        self.view = view;
        self.source = CartSource::Remote;
        self.last_error = None;
        Ok(())
    }

    /// Switch to the shadow after a failed call.
    fn fall_back(&mut self, error: &ApiError) {
        if error.is_transport_failure() {
            warn!(error = %error, "Storefront unreachable, using shadow cart");
        } else {
            warn!(error = %error, status = ?error.status(), "Storefront refused intent, using shadow cart");
        }
        self.last_error = Some(error.to_string());
        self.source = CartSource::Shadow;
        self.view = self.shadow.view();
    }

    /// Local lines only exist while offline. Try to reconnect first; if that
    /// works the line was discarded with the rest of the offline edits.
    async fn require_offline(&mut self, line_id: LineItemId) -> Result<(), SessionError> {
        self.load().await?;
        match self.source {
            CartSource::Shadow => Ok(()),
            CartSource::Remote => Err(SessionError::UnknownLocalLine(line_id)),
        }
    }
}
