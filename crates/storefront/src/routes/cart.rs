//! Cart route handlers.
//!
//! Every handler validates its input (user id, product id, line id,
//! quantity) before touching a store, then returns the full resulting cart
//! populated with product names and images.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
};
use tracing::instrument;

use shopcart_core::api::{
    AddItemRequest, ApiResponse, CartQuery, CartView, UpdateItemRequest, UserRequest,
};
use shopcart_core::{Cart, LineItemId, ProductId, Quantity, UserId};

use super::extract::JsonBody;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::state::AppState;

type CartResponse = Result<Json<ApiResponse<CartView>>>;

fn parse_user(raw: Option<&str>) -> Result<UserId> {
    UserId::parse_or_guest(raw).map_err(|e| AppError::Validation(format!("Invalid userId: {e}")))
}

fn parse_line(raw: &str) -> Result<LineItemId> {
    LineItemId::parse_stored(raw).map_err(|_| AppError::Validation("Invalid item id".to_string()))
}

fn parse_quantity(raw: Option<i64>, default: Option<Quantity>) -> Result<Quantity> {
    match (raw, default) {
        (Some(value), _) => Quantity::from_signed(value)
            .map_err(|_| AppError::Validation("Quantity must be at least 1".to_string())),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(AppError::Validation("quantity is required".to_string())),
    }
}

/// Render a cart with product display fields.
///
/// Display lookups are best effort: the cart itself is already stored, so a
/// catalog failure here falls back to placeholder names instead of failing
/// the request.
async fn render(state: &AppState, cart: &Cart) -> CartView {
    let ids: Vec<ProductId> = cart.items().iter().map(|item| item.product_id).collect();
    let displays = match state.catalog().displays(&ids).await {
        Ok(displays) => displays,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load product displays for cart");
            std::collections::HashMap::new()
        }
    };
    CartView::from_cart(cart, &displays)
}

/// Get the user's cart (an empty cart if none exists).
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    query: std::result::Result<Query<CartQuery>, QueryRejection>,
) -> CartResponse {
    let Query(query) = query?;
    let user_id = parse_user(query.user_id.as_deref())?;

    let cart = state.carts().get_cart(&user_id).await?;
    Ok(Json(ApiResponse::ok(render(&state, &cart).await)))
}

/// Add a product to the cart.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<AddItemRequest>,
) -> CartResponse {
    let user_id = parse_user(body.user_id.as_deref())?;
    let product_id = body
        .product_id
        .as_deref()
        .ok_or_else(|| AppError::Validation("productId is required".to_string()))?;
    let product_id = ProductId::parse(product_id)
        .map_err(|_| AppError::Validation("Invalid productId".to_string()))?;
    let quantity = parse_quantity(body.quantity, Some(Quantity::ONE))?;

    let cart = state
        .carts()
        .add_item(&user_id, product_id, quantity)
        .await?;

    add_breadcrumb(
        "cart",
        "Item added to cart",
        &[
            ("product_id", product_id.to_string()),
            ("quantity", quantity.to_string()),
        ],
    );

    Ok(Json(
        ApiResponse::ok(render(&state, &cart).await).with_message("Item added to cart"),
    ))
}

/// Overwrite the quantity of a cart line.
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    id: std::result::Result<Path<String>, PathRejection>,
    JsonBody(body): JsonBody<UpdateItemRequest>,
) -> CartResponse {
    let Path(id) = id?;
    let user_id = parse_user(body.user_id.as_deref())?;
    let line_id = parse_line(&id)?;
    let quantity = parse_quantity(body.quantity, None)?;

    let cart = state
        .carts()
        .update_item_quantity(&user_id, line_id, quantity)
        .await?;

    add_breadcrumb(
        "cart",
        "Cart item updated",
        &[
            ("line_id", line_id.to_string()),
            ("quantity", quantity.to_string()),
        ],
    );

    Ok(Json(
        ApiResponse::ok(render(&state, &cart).await).with_message("Cart item updated"),
    ))
}

/// Remove a line from the cart.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    id: std::result::Result<Path<String>, PathRejection>,
    JsonBody(body): JsonBody<UserRequest>,
) -> CartResponse {
    let Path(id) = id?;
    let user_id = parse_user(body.user_id.as_deref())?;
    let line_id = parse_line(&id)?;

    let cart = state.carts().remove_item(&user_id, line_id).await?;

    add_breadcrumb(
        "cart",
        "Item removed from cart",
        &[("line_id", line_id.to_string())],
    );

    Ok(Json(
        ApiResponse::ok(render(&state, &cart).await).with_message("Item removed from cart"),
    ))
}

/// Remove every line from the cart.
#[instrument(skip(state))]
pub async fn clear(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<UserRequest>,
) -> CartResponse {
    let user_id = parse_user(body.user_id.as_deref())?;

    let cart = state.carts().clear_cart(&user_id).await?;

    add_breadcrumb("cart", "Cart cleared", &[]);

    Ok(Json(
        ApiResponse::ok(render(&state, &cart).await).with_message("Cart cleared"),
    ))
}
