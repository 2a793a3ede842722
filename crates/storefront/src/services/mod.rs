//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - Cart reconciliation engine (stock checks, merge rules, persistence)
//! - `catalog` - Product listing and cached product lookups
//! - `locks` - Per-user serialization of cart mutations

pub mod cart;
pub mod catalog;
pub mod locks;

pub use cart::{CartService, CartServiceError};
pub use catalog::CatalogService;
pub use locks::UserLocks;
