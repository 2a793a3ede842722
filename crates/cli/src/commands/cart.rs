//! Cart access through a client session.
//!
//! Every command opens a [`CartSession`] backed by the local state file, so
//! the persisted user id and the shadow cart carry over between runs. When a
//! cart call fails the commands keep working on the shadow and print why.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::warn;

use shopcart_client::{
    ApiError, CartApi, CartSession, CartSource, ClientConfig, FileStorage, KnownProduct,
};
use shopcart_core::api::CartView;
use shopcart_core::{LineItemId, ProductId, Quantity};

/// Open a session for the persisted user.
fn open_session() -> Result<(CartApi, CartSession), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let api = CartApi::new(&config)?;
    let storage = Arc::new(FileStorage::new(config.state_file));
    let session = CartSession::open(Arc::new(api.clone()), storage)?;
    Ok((api, session))
}

/// Show the cart.
///
/// # Errors
///
/// Returns an error if local state cannot be read or written.
#[allow(clippy::print_stdout)]
pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let (_, mut session) = open_session()?;
    session.load().await?;
    print!("{}", render(&session));
    Ok(())
}

/// Add a product.
///
/// Product details come from the catalog, or from the shadow when the
/// storefront is unreachable and the product was seen before.
///
/// # Errors
///
/// Returns an error for products the catalog does not know, or products
/// never seen while the catalog is unreachable.
#[allow(clippy::print_stdout)]
pub async fn add(product_id: &str, quantity: u32) -> Result<(), Box<dyn std::error::Error>> {
    let product_id: ProductId = product_id.parse()?;
    let quantity = Quantity::new(quantity)?;
    let (api, mut session) = open_session()?;

    let product = match api.product(product_id).await {
        Ok(product) => {
            session.remember(&product);
            KnownProduct::from(&product)
        }
        Err(e) if e.is_transport_failure() => {
            warn!(error = %e, %product_id, "Catalog unreachable, using cached product details");
            resolve_offline(&session, product_id, &e)?
        }
        Err(e) => return Err(e.into()),
    };

    session.add(&product, quantity).await?;
    print!("{}", render(&session));
    Ok(())
}

fn resolve_offline(
    session: &CartSession,
    product_id: ProductId,
    cause: &ApiError,
) -> Result<KnownProduct, Box<dyn std::error::Error>> {
    session.known_product(product_id).cloned().ok_or_else(|| {
        format!("product {product_id} has not been seen before and the storefront is unreachable ({cause})")
            .into()
    })
}

/// Set the quantity of a line. Zero or less removes it.
///
/// # Errors
///
/// Returns an error for lines missing from the shadow when the storefront
/// call fails.
#[allow(clippy::print_stdout)]
pub async fn update(line_id: &str, quantity: i64) -> Result<(), Box<dyn std::error::Error>> {
    let line_id: LineItemId = line_id.parse()?;
    let (_, mut session) = open_session()?;
    session.update_quantity(line_id, quantity).await?;
    print!("{}", render(&session));
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error for lines missing from the shadow when the storefront
/// call fails.
#[allow(clippy::print_stdout)]
pub async fn remove(line_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let line_id: LineItemId = line_id.parse()?;
    let (_, mut session) = open_session()?;
    session.remove(line_id).await?;
    print!("{}", render(&session));
    Ok(())
}

/// Remove every line.
///
/// # Errors
///
/// Returns an error if local state cannot be written.
#[allow(clippy::print_stdout)]
pub async fn clear() -> Result<(), Box<dyn std::error::Error>> {
    let (_, mut session) = open_session()?;
    session.clear().await?;
    print!("{}", render(&session));
    Ok(())
}

fn render(session: &CartSession) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Cart for {}", session.user_id());
    if session.source() == CartSource::Shadow {
        match session.last_error() {
            Some(reason) => {
                let _ = writeln!(out, "(offline copy: {reason})");
            }
            None => out.push_str("(offline copy)\n"),
        }
    }
    render_view(&mut out, session.cart());
    out
}

fn render_view(out: &mut String, view: &CartView) {
    if view.items.is_empty() {
        out.push_str("Your cart is empty.\n");
        return;
    }
    for item in &view.items {
        let _ = writeln!(
            out,
            "{}  {:<28} {:>3} x {:>10} = {:>10}",
            item.id,
            item.name,
            item.quantity,
            item.price,
            item.price.line_total(item.quantity)
        );
    }
    let _ = writeln!(
        out,
        "Total: {} ({} items)",
        view.total_amount, view.total_items
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal::Decimal;
    use shopcart_core::api::CartItemView;
    use shopcart_core::{Cart, Price, UserId};

    use super::*;

    #[test]
    fn test_render_empty() {
        let mut out = String::new();
        let view = CartView::from_cart(&Cart::empty(UserId::guest()), &HashMap::new());
        render_view(&mut out, &view);
        assert_eq!(out, "Your cart is empty.\n");
    }

    #[test]
    fn test_render_lines_and_totals() {
        let price = Price::new(Decimal::new(1999, 2)).unwrap();
        let quantity = Quantity::new(2).unwrap();
        let view = CartView {
            cart_id: None,
            user_id: UserId::guest(),
            items: vec![CartItemView {
                id: LineItemId::generate_local(),
                product_id: ProductId::generate(),
                name: "Coffee Mug".to_string(),
                image: String::new(),
                price,
                quantity,
            }],
            total_amount: Decimal::new(3998, 2),
            total_items: 2,
        };

        let mut out = String::new();
        render_view(&mut out, &view);
        assert!(out.contains("Coffee Mug"));
        assert!(out.contains("2 x"));
        assert!(out.ends_with("Total: 39.98 (2 items)\n"));
    }
}
