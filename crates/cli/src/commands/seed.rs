//! Seed the catalog with products from a YAML file.
//!
//! # File Format
//!
//! ```yaml
//! products:
//!   - name: Smart Watch
//!     description: Fitness tracking and notifications.
//!     price: "199.99"
//!     category: Electronics
//!     image: https://example.com/watch.jpg
//!     images: []          # optional
//!     stock: 30
//!     rating: "4.3"       # optional, 0-5
//! ```

use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use shopcart_core::catalog::Rating;
use shopcart_core::{Price, Product, ProductId};
use shopcart_storefront::db::{self, PgCatalog};

/// Default location of the demo catalog, relative to the workspace root.
pub const DEFAULT_PRODUCTS_FILE: &str = "crates/cli/seed/products.yaml";

/// Seed file contents.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub products: Vec<SeedProduct>,
}

/// One product entry of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category: String,
    pub image: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub stock: u32,
    #[serde(default)]
    pub rating: Option<Rating>,
}

/// Problems found in a seed file before anything is written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeedError {
    #[error("product #{index}: {field} must not be empty")]
    EmptyField { index: usize, field: &'static str },
    #[error("product #{index}: duplicate name '{name}'")]
    DuplicateName { index: usize, name: String },
    #[error("seed file lists no products")]
    NoProducts,
}

impl SeedProduct {
    fn into_product(self) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::generate(),
            name: self.name.trim().to_string(),
            description: self.description,
            price: self.price,
            category: self.category.trim().to_string(),
            image: self.image,
            images: self.images,
            stock: self.stock,
            rating: self.rating,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Check a parsed seed file. Returns every problem found.
#[must_use]
pub fn validate(file: &SeedFile) -> Vec<SeedError> {
    if file.products.is_empty() {
        return vec![SeedError::NoProducts];
    }

    let mut errors = Vec::new();
    let mut names = std::collections::HashSet::new();
    for (index, product) in file.products.iter().enumerate() {
        let index = index + 1;
        if product.name.trim().is_empty() {
            errors.push(SeedError::EmptyField {
                index,
                field: "name",
            });
        } else if !names.insert(product.name.trim().to_lowercase()) {
            errors.push(SeedError::DuplicateName {
                index,
                name: product.name.clone(),
            });
        }
        if product.category.trim().is_empty() {
            errors.push(SeedError::EmptyField {
                index,
                field: "category",
            });
        }
    }
    errors
}

/// Seed products from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML seed file
/// * `clear_existing` - If true, delete every existing product first
///
/// # Errors
///
/// Returns an error if the file cannot be read or is invalid, or if database
/// operations fail.
pub async fn products(file_path: &str, clear_existing: bool) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url()?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let file: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&file);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }
    info!(products = file.products.len(), "Seed file validated");

    let pool = db::create_pool(&database_url).await?;
    let catalog = PgCatalog::new(pool);
    info!("Connected to database");

    if clear_existing {
        let removed = catalog.clear().await?;
        info!(removed, "Cleared existing products");
    }

    let mut inserted = 0_usize;
    for seed in file.products {
        let product = seed.into_product();
        catalog.insert(&product).await?;
        info!(product_id = %product.id, name = %product.name, "Inserted product");
        inserted += 1;
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    Ok(())
}
