//! Shopcart client library.
//!
//! Talks to the storefront API and keeps a local shadow copy of the user's
//! cart so the cart stays usable while the storefront is unreachable.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shopcart_client::{CartApi, CartSession, ClientConfig, FileStorage};
//!
//! let config = ClientConfig::from_env()?;
//! let api = Arc::new(CartApi::new(&config)?);
//! let storage = Arc::new(FileStorage::new(&config.state_file));
//!
//! let mut session = CartSession::open(api, storage)?;
//! let cart = session.load().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod identity;
pub mod session;
pub mod shadow;
pub mod storage;

pub use api::{ApiError, CartApi, ProductListQuery, RemoteCart};
pub use config::{ClientConfig, ConfigError};
pub use session::{CartSession, CartSource, SessionError};
pub use shadow::{KnownProduct, ShadowCache};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage, StorageError};
