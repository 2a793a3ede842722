//! Integration tests for Shopcart.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (memory stores, real HTTP on a loopback port)
//! cargo test -p shopcart-integration-tests
//!
//! # PostgreSQL tests
//! TEST_DATABASE_URL=postgres://localhost/shopcart_test \
//!     cargo test -p shopcart-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `cart_api` - Cart and catalog endpoints through [`CartApi`]
//! - `offline_continuity` - Client sessions across storefront outages
//! - `postgres` - `PostgreSQL` adapters against a real database

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

use shopcart_client::{CartApi, ClientConfig};
use shopcart_core::{Price, Product, ProductId};
use shopcart_storefront::config::StorefrontConfig;
use shopcart_storefront::state::AppState;
use shopcart_storefront::store::memory::{MemoryCartStore, MemoryCatalog};

/// Build a catalog product.
#[must_use]
pub fn product(name: &str, price: &str, stock: u32) -> Product {
    Product {
        id: ProductId::generate(),
        name: name.to_owned(),
        description: format!("{name} description"),
        price: Price::new(Decimal::from_str(price).expect("valid decimal")).expect("valid price"),
        category: "Electronics".to_owned(),
        image: format!("https://img.example/{name}.jpg"),
        images: Vec::new(),
        stock,
        rating: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Storefront configuration for a loopback test server.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/unused"),
        host: Ipv4Addr::LOCALHOST.into(),
        port: 0,
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        environment: "test".to_string(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// API base URL of a port nothing listens on.
#[must_use]
pub fn unreachable_api_url() -> Url {
    let listener =
        std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind loopback port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    api_url(addr)
}

fn api_url(addr: SocketAddr) -> Url {
    Url::parse(&format!("http://{addr}/api")).expect("valid url")
}

/// Client configuration pointing at `api_url`.
#[must_use]
pub fn client_config(api_url: Url) -> ClientConfig {
    let mut config = ClientConfig::new(api_url);
    config.timeout = Duration::from_secs(5);
    config
}

struct RunningServer {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// A storefront served over HTTP from memory stores.
///
/// The stores outlive the server, so a stopped storefront can be restarted
/// on the same address with its carts intact.
pub struct TestStorefront {
    addr: SocketAddr,
    pub carts: Arc<MemoryCartStore>,
    pub catalog: Arc<MemoryCatalog>,
    server: Option<RunningServer>,
}

impl TestStorefront {
    /// Serve a catalog of `products` on a free loopback port.
    pub async fn start(products: Vec<Product>) -> Self {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind loopback port");
        let addr = listener.local_addr().expect("local addr");

        let mut storefront = Self {
            addr,
            carts: Arc::new(MemoryCartStore::default()),
            catalog: Arc::new(MemoryCatalog::with_products(products)),
            server: None,
        };
        storefront.serve(listener);
        storefront
    }

    fn serve(&mut self, listener: TcpListener) {
        let state = AppState::new(test_config(), self.carts.clone(), self.catalog.clone());
        let app = shopcart_storefront::app(state);
        let (shutdown, signal) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await
                .expect("test server failed");
        });
        self.server = Some(RunningServer { shutdown, handle });
    }

    /// Base URL of the API, e.g. `http://127.0.0.1:41234/api`.
    #[must_use]
    pub fn api_url(&self) -> Url {
        api_url(self.addr)
    }

    /// A fresh API client with its own connection pool.
    #[must_use]
    pub fn api(&self) -> CartApi {
        CartApi::new(&client_config(self.api_url())).expect("build api client")
    }

    /// Stop accepting connections. Stored carts are kept.
    pub async fn stop(&mut self) {
        if let Some(server) = self.server.take() {
            let _ = server.shutdown.send(());
            let mut handle = server.handle;
            if tokio::time::timeout(Duration::from_secs(5), &mut handle)
                .await
                .is_err()
            {
                handle.abort();
            }
        }
    }

    /// Serve again on the same address.
    pub async fn restart(&mut self) {
        self.stop().await;
        let listener = TcpListener::bind(self.addr)
            .await
            .expect("rebind storefront address");
        self.serve(listener);
    }
}

impl Drop for TestStorefront {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            server.handle.abort();
        }
    }
}
