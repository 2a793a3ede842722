//! Product catalog model and query parameters.
//!
//! The catalog is read-only from the cart's point of view: carts read a
//! product's price and stock when a line is added or changed and never write
//! back.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category: String,
    /// Primary image URL.
    pub image: String,
    /// Gallery image URLs.
    #[serde(default)]
    pub images: Vec<String>,
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns true if at least `quantity` units are available.
    #[must_use]
    pub const fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("rating must be between 0 and 5 (got {0})")]
pub struct RatingError(Decimal);

/// An average review rating between 0 and 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rating(Decimal);

impl Rating {
    /// Highest possible rating.
    pub const MAX: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

    /// Create a new rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError`] if `value` is outside `0..=5`.
    pub fn new(value: Decimal) -> Result<Self, RatingError> {
        if value < Decimal::ZERO || value > Self::MAX {
            return Err(RatingError(value));
        }
        Ok(Self(value))
    }

    /// Returns the rating value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Rating {
    type Error = RatingError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for Decimal {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// Errors produced while interpreting catalog query parameters.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown sort field: {0}")]
    UnknownSortField(String),
    #[error("sort order must be 'asc' or 'desc' (got {0})")]
    UnknownSortOrder(String),
    #[error("page must be at least 1")]
    InvalidPage,
    #[error("limit must be between 1 and {max}")]
    InvalidLimit { max: u32 },
}

/// Filter applied to product listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Exact category match.
    pub category: Option<String>,
    /// Case-insensitive substring match over name and description.
    pub search: Option<String>,
}

impl ProductFilter {
    /// Build a filter, ignoring blank values.
    #[must_use]
    pub fn new(category: Option<String>, search: Option<String>) -> Self {
        let non_blank = |s: String| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        };
        Self {
            category: category.and_then(non_blank),
            search: search.and_then(non_blank),
        }
    }

    /// Returns true if `product` passes this filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category
            && product.category != *category
        {
            return false;
        }

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            return product.name.to_lowercase().contains(&needle)
                || product.description.to_lowercase().contains(&needle);
        }

        true
    }
}

/// Field a product listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    Price,
    Name,
    Rating,
    Stock,
}

impl SortField {
    /// Returns the field name as it appears in query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::Price => "price",
            Self::Name => "name",
            Self::Rating => "rating",
            Self::Stock => "stock",
        }
    }
}

impl FromStr for SortField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(Self::CreatedAt),
            "price" => Ok(Self::Price),
            "name" => Ok(Self::Name),
            "rating" => Ok(Self::Rating),
            "stock" => Ok(Self::Stock),
            other => Err(QueryError::UnknownSortField(other.to_owned())),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Returns the direction as it appears in query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(QueryError::UnknownSortOrder(other.to_owned())),
        }
    }
}

/// Ordering applied to product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProductSort {
    pub field: SortField,
    pub order: SortOrder,
}

/// One page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 12;
    pub const MAX_LIMIT: u32 = 100;

    /// Validate page and limit, applying defaults for absent values.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidPage`] for page 0 and
    /// [`QueryError::InvalidLimit`] for limits outside `1..=100`.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, QueryError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT);

        if page == 0 {
            return Err(QueryError::InvalidPage);
        }
        if limit == 0 || limit > Self::MAX_LIMIT {
            return Err(QueryError::InvalidLimit {
                max: Self::MAX_LIMIT,
            });
        }

        Ok(Self { page, limit })
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of rows skipped before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        (u64::from(self.page) - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Pagination metadata returned with a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_products: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Compute pagination for `total` matching products.
    #[must_use]
    pub fn new(request: PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(request.limit()));
        Self {
            current_page: request.page(),
            total_pages,
            total_products: total,
            has_next: u64::from(request.page()) < total_pages,
            has_prev: request.page() > 1,
        }
    }
}

/// A page of products with its pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn product(name: &str, price: &str, stock: u32) -> Product {
        Product {
            id: ProductId::generate(),
            name: name.to_owned(),
            description: format!("{name} description"),
            price: Price::new(Decimal::from_str(price).unwrap()).unwrap(),
            category: "Electronics".to_owned(),
            image: format!("https://img.example/{name}.jpg"),
            images: Vec::new(),
            stock,
            rating: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_pagination_math() {
        let request = PageRequest::new(Some(2), Some(5)).unwrap();
        let pagination = Pagination::new(request, 11);
        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_next);
        assert!(pagination.has_prev);

        let last = Pagination::new(PageRequest::new(Some(3), Some(5)).unwrap(), 11);
        assert!(!last.has_next);

        let empty = Pagination::new(PageRequest::default(), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }

    #[test]
    fn test_page_request_validation() {
        assert_eq!(PageRequest::new(Some(0), None), Err(QueryError::InvalidPage));
        assert!(PageRequest::new(None, Some(0)).is_err());
        assert!(PageRequest::new(None, Some(101)).is_err());
        assert_eq!(PageRequest::new(Some(3), Some(10)).unwrap().offset(), 20);
        assert_eq!(PageRequest::new(None, None).unwrap(), PageRequest::default());
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("price".parse::<SortField>().unwrap(), SortField::Price);
        assert!("_id".parse::<SortField>().is_err());
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert!("up".parse::<SortOrder>().is_err());

        for field in [SortField::CreatedAt, SortField::Rating, SortField::Stock] {
            assert_eq!(field.as_str().parse::<SortField>().unwrap(), field);
        }
    }

    #[test]
    fn test_filter_matches_category_and_search() {
        let headphones = product("Wireless Headphones", "99.99", 50);
        let filter = ProductFilter::new(Some("Electronics".into()), Some("headPHONES".into()));
        assert!(filter.matches(&headphones));

        let wrong_category = ProductFilter::new(Some("Accessories".into()), None);
        assert!(!wrong_category.matches(&headphones));

        let by_description = ProductFilter::new(None, Some("description".into()));
        assert!(by_description.matches(&headphones));
    }

    #[test]
    fn test_filter_ignores_blank_values() {
        let filter = ProductFilter::new(Some("  ".into()), Some(String::new()));
        assert_eq!(filter, ProductFilter::default());
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(Decimal::new(45, 1)).is_ok());
        assert!(Rating::new(Decimal::new(51, 1)).is_err());
        assert!(Rating::new(Decimal::new(-1, 0)).is_err());
    }
}
