//! Catalog queries against `storefront.product`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use shopcart_core::catalog::{
    PageRequest, ProductFilter, ProductSort, Rating, SortField, SortOrder,
};
use shopcart_core::{Price, Product, ProductId};

use super::RepositoryError;
use crate::store::{CatalogStore, StoreError};

const PRODUCT_COLUMNS: &str = "id, name, description, price, category, image, images, stock, \
                               rating, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: Decimal,
    category: String,
    image: String,
    images: Json<Vec<String>>,
    stock: i32,
    rating: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("invalid {what} for product {}: {e}", row.id))
        };

        let price = Price::new(row.price).map_err(|e| corrupt("price", &e))?;
        let stock = u32::try_from(row.stock).map_err(|e| corrupt("stock", &e))?;
        let rating = row
            .rating
            .map(Rating::new)
            .transpose()
            .map_err(|e| corrupt("rating", &e))?;

        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price,
            category: row.category,
            image: row.image,
            images: row.images.0,
            stock,
            rating,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

const fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::CreatedAt => "created_at",
        SortField::Price => "price",
        SortField::Name => "name",
        SortField::Rating => "rating",
        SortField::Stock => "stock",
    }
}

const fn sort_direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "ASC NULLS FIRST",
        SortOrder::Desc => "DESC NULLS LAST",
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    builder.push(" WHERE TRUE");
    if let Some(category) = &filter.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, StoreError> {
    rows.into_iter()
        .map(|row| Product::try_from(row).map_err(StoreError::from))
        .collect()
}

/// `PostgreSQL` implementation of [`CatalogStore`].
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Create a catalog backed by `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn insert(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.product
                (id, name, description, price, category, image, images, stock, rating,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(&product.category)
        .bind(&product.image)
        .bind(Json(&product.images))
        .bind(i32::try_from(product.stock).unwrap_or(i32::MAX))
        .bind(product.rating.map(|rating| rating.value()))
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete every product. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.product")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CatalogStore for PgCatalog {
    #[instrument(skip(self))]
    async fn find_products(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> Result<Vec<Product>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder.push(PRODUCT_COLUMNS).push(" FROM storefront.product");
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY ")
            .push(sort_column(sort.field))
            .push(" ")
            .push(sort_direction(sort.order))
            .push(", id ")
            .push(sort_direction(sort.order))
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let rows = builder
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        into_products(rows)
    }

    #[instrument(skip(self))]
    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM storefront.product");
        push_filter(&mut builder, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.map(|row| Product::try_from(row).map_err(StoreError::from))
            .transpose()
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        into_products(rows)
    }
}
