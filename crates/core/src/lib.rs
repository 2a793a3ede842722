//! Shopcart Core - Shared domain library.
//!
//! This crate provides the types and rules used across all Shopcart
//! components:
//! - `storefront` - HTTP API serving the catalog and carts
//! - `client` - API client with an offline shadow cart
//! - `cli` - Command-line tools for migrations, seeding and cart access
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. The cart rules live here so the server and the
//! client's shadow cart apply exactly the same reconciliation.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, quantities and user ids
//! - [`catalog`] - Products and listing queries
//! - [`cart`] - Cart state and mutation rules
//! - [`api`] - Response envelope, cart views and request bodies

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod types;

pub use cart::{Cart, CartError, CartLineItem, CartTotals, ProductOffer, StockLevel};
pub use catalog::{Product, ProductFilter, ProductSort};
pub use types::*;
