//! Browse the catalog through the storefront API.

use std::fmt::Write as _;

use shopcart_client::{CartApi, ClientConfig, ProductListQuery};
use shopcart_core::catalog::ProductPage;
use shopcart_core::{Product, ProductId};

/// List one page of products.
///
/// # Errors
///
/// Returns an error if the client cannot be configured or the storefront
/// rejects the query or is unreachable.
#[allow(clippy::print_stdout)]
pub async fn list(query: &ProductListQuery) -> Result<(), Box<dyn std::error::Error>> {
    let api = CartApi::new(&ClientConfig::from_env()?)?;
    let page = api.list_products(query).await?;
    print!("{}", render_page(&page));
    Ok(())
}

/// Show one product.
///
/// # Errors
///
/// Returns an error if the id is malformed, the product does not exist, or
/// the storefront is unreachable.
#[allow(clippy::print_stdout)]
pub async fn show(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let id: ProductId = id.parse()?;
    let api = CartApi::new(&ClientConfig::from_env()?)?;
    let product = api.product(id).await?;
    print!("{}", render_product(&product));
    Ok(())
}

fn stock_label(stock: u32) -> String {
    match stock {
        0 => "out of stock".to_string(),
        1..=5 => format!("only {stock} left"),
        _ => format!("{stock} in stock"),
    }
}

fn render_page(page: &ProductPage) -> String {
    let mut out = String::new();
    if page.products.is_empty() {
        out.push_str("No products found.\n");
    }
    for product in &page.products {
        let _ = writeln!(
            out,
            "{}  {:<28} {:>10}  {:<14} {}",
            product.id,
            product.name,
            product.price,
            product.category,
            stock_label(product.stock)
        );
    }
    let p = &page.pagination;
    let _ = writeln!(
        out,
        "Page {} of {} ({} products)",
        p.current_page, p.total_pages, p.total_products
    );
    out
}

fn render_product(product: &Product) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", product.name);
    let _ = writeln!(out, "  id:       {}", product.id);
    let _ = writeln!(out, "  price:    {}", product.price);
    let _ = writeln!(out, "  category: {}", product.category);
    let _ = writeln!(out, "  stock:    {}", stock_label(product.stock));
    if let Some(rating) = product.rating {
        let _ = writeln!(out, "  rating:   {}", rating.value());
    }
    if !product.description.is_empty() {
        let _ = writeln!(out, "\n{}", product.description);
    }
    out
}
