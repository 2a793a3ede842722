//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::services::{CartService, CatalogService};
use crate::store::{CartStore, CatalogStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// configuration and the services built over the injected stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    carts: CartService,
    catalog: CatalogService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `carts` - Cart store (`PostgreSQL` in production, memory in tests)
    /// * `catalog` - Catalog store
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        carts: Arc<dyn CartStore>,
        catalog: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                carts: CartService::new(carts, Arc::clone(&catalog)),
                catalog: CatalogService::new(catalog),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the cart reconciliation engine.
    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }
}
