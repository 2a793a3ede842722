//! Product route handlers.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
};
use serde::Deserialize;
use tracing::instrument;

use shopcart_core::api::ApiResponse;
use shopcart_core::catalog::{PageRequest, ProductFilter, ProductPage, ProductSort};
use shopcart_core::{Product, ProductId};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Query string of the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl ProductQuery {
    fn parse(self) -> Result<(ProductFilter, ProductSort, PageRequest)> {
        let invalid = |e: shopcart_core::catalog::QueryError| AppError::Validation(e.to_string());

        let page = PageRequest::new(self.page, self.limit).map_err(invalid)?;
        let mut sort = ProductSort::default();
        if let Some(field) = self.sort.as_deref() {
            sort.field = field.parse().map_err(invalid)?;
        }
        if let Some(order) = self.order.as_deref() {
            sort.order = order.parse().map_err(invalid)?;
        }

        Ok((ProductFilter::new(self.category, self.search), sort, page))
    }
}

/// List products with filtering, sorting and pagination.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    query: std::result::Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<ProductPage>>> {
    let Query(query) = query?;
    let (filter, sort, page) = query.parse()?;

    let products = state.catalog().list(&filter, sort, page).await?;
    Ok(Json(ApiResponse::ok(products)))
}

/// Show a single product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    id: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<ApiResponse<Product>>> {
    let Path(id) = id?;
    let id = ProductId::parse(&id)
        .map_err(|_| AppError::Validation("Invalid product id".to_string()))?;

    let product = state
        .catalog()
        .product(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(ApiResponse::ok(product)))
}
