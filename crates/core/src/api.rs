//! Wire types shared by the storefront API and its clients.
//!
//! Every response is wrapped in an [`ApiResponse`] envelope. Decimals travel
//! as strings so totals are reproduced exactly on both sides.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartError, CartLineItem};
use crate::catalog::Product;
use crate::types::{CartId, LineItemId, Price, ProductId, Quantity, UserId};

/// Stable machine-readable failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    StockError,
    StoreUnavailable,
    InternalError,
}

impl ErrorCode {
    /// Returns the code as it appears on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::NotFound => "not_found",
            Self::StockError => "stock_error",
            Self::StoreUnavailable => "store_unavailable",
            Self::InternalError => "internal_error",
        }
    }
}

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            error: Some(code),
        }
    }
}

/// Display fields of a product shown next to a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDisplay {
    pub name: String,
    pub image: String,
}

impl ProductDisplay {
    /// Name shown when a product is no longer in the catalog.
    pub const FALLBACK_NAME: &'static str = "Product";

    /// Display used when a product is no longer in the catalog.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            name: Self::FALLBACK_NAME.to_owned(),
            image: String::new(),
        }
    }
}

impl From<&Product> for ProductDisplay {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            image: product.image.clone(),
        }
    }
}

/// A cart line as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: LineItemId,
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    pub price: Price,
    pub quantity: Quantity,
}

/// A cart as returned by the API, populated with product display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_id: Option<CartId>,
    pub user_id: UserId,
    pub items: Vec<CartItemView>,
    pub total_amount: Decimal,
    pub total_items: u64,
}

impl CartView {
    /// Render a cart, looking up display fields per product.
    ///
    /// Products missing from `displays` get [`ProductDisplay::fallback`].
    #[must_use]
    pub fn from_cart(cart: &Cart, displays: &HashMap<ProductId, ProductDisplay>) -> Self {
        let items = cart
            .items()
            .iter()
            .map(|item| {
                let display = displays
                    .get(&item.product_id)
                    .cloned()
                    .unwrap_or_else(ProductDisplay::fallback);
                CartItemView {
                    id: item.id,
                    product_id: item.product_id,
                    name: display.name,
                    image: display.image,
                    price: item.unit_price,
                    quantity: item.quantity,
                }
            })
            .collect();

        Self {
            cart_id: cart.id(),
            user_id: cart.user_id().clone(),
            items,
            total_amount: cart.total_amount(),
            total_items: cart.total_items(),
        }
    }

    /// Rebuild the cart behind this view along with its display fields.
    ///
    /// Totals are recomputed from the lines; the transmitted totals are not
    /// trusted.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if the view holds duplicate products or lines.
    pub fn into_cart(self) -> Result<(Cart, HashMap<ProductId, ProductDisplay>), CartError> {
        let mut displays = HashMap::with_capacity(self.items.len());
        let mut lines = Vec::with_capacity(self.items.len());
        for item in self.items {
            lines.push(CartLineItem {
                id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.price,
            });
            displays.insert(
                item.product_id,
                ProductDisplay {
                    name: item.name,
                    image: item.image,
                },
            );
        }

        let cart = Cart::from_lines(self.user_id, lines)?.with_id(self.cart_id);
        Ok((cart, displays))
    }
}

/// Query string of `GET /api/cart`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Body of `POST /api/cart/items`.
///
/// Fields are kept loose so the server can report exactly which one is
/// missing or malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

/// Body of `PUT /api/cart/items/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

/// Body of the cart `DELETE` endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}
