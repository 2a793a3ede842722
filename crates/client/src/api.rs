//! HTTP client for the storefront API.
//!
//! Responses arrive in the [`ApiResponse`] envelope. Failures are split into
//! two families: transport failures (the service could not answer, answered
//! with a 5xx, or answered with something unreadable) and rejections (a 4xx
//! verdict on the request itself). Cart sessions fall back to the shadow on
//! either; the split decides how a failure is reported.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use shopcart_core::api::{
    AddItemRequest, ApiResponse, CartView, ErrorCode, UpdateItemRequest, UserRequest,
};
use shopcart_core::catalog::{ProductPage, SortField, SortOrder};
use shopcart_core::{LineItemId, Product, ProductId, Quantity, UserId};

use crate::config::ClientConfig;

/// Longest slice of an unreadable error body kept in messages.
const BODY_EXCERPT_LEN: usize = 200;

/// Errors returned by the storefront API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connect error, timeout).
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a 5xx status.
    #[error("server error ({status}): {message}")]
    Server { status: StatusCode, message: String },

    /// The service refused the request (4xx).
    #[error("{message}")]
    Rejected {
        status: StatusCode,
        code: Option<ErrorCode>,
        message: String,
    },

    /// The response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Returns true if the service could not give a verdict on the request.
    #[must_use]
    pub const fn is_transport_failure(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }

    /// HTTP status of the response, if one was received.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport(e) => e.status(),
            Self::Server { status, .. } | Self::Rejected { status, .. } => Some(*status),
            Self::Decode(_) => None,
        }
    }
}

/// Remote cart operations. Every call returns the full resulting cart.
#[async_trait]
pub trait RemoteCart: Send + Sync {
    async fn get_cart(&self, user_id: &UserId) -> Result<CartView, ApiError>;

    async fn add_item(
        &self,
        user_id: &UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartView, ApiError>;

    async fn update_item(
        &self,
        user_id: &UserId,
        line_id: LineItemId,
        quantity: Quantity,
    ) -> Result<CartView, ApiError>;

    async fn remove_item(&self, user_id: &UserId, line_id: LineItemId)
    -> Result<CartView, ApiError>;

    async fn clear_cart(&self, user_id: &UserId) -> Result<CartView, ApiError>;
}

/// Query of a product listing. Unset fields use the server defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<SortField>,
    pub order: Option<SortOrder>,
}

impl ProductListQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(sort) = self.sort {
            pairs.push(("sort", sort.as_str().to_string()));
        }
        if let Some(order) = self.order {
            pairs.push(("order", order.as_str().to_string()));
        }
        pairs
    }
}

/// Client for the storefront API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct CartApi {
    client: reqwest::Client,
    base: Url,
}

impl CartApi {
    /// Create a client for the API at `config.api_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base: config.api_url.clone(),
        })
    }

    /// Base URL the client talks to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// One page of the product listing.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or is rejected.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductListQuery) -> Result<ProductPage, ApiError> {
        let mut url = self.endpoint(&["products"]);
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.pairs() {
                pairs.append_pair(key, &value);
            }
        }
        send(self.client.get(url)).await
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or is rejected (404 when the
    /// product does not exist).
    #[instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let url = self.endpoint(&["products", &id.to_string()]);
        send(self.client.get(url)).await
    }

    /// Build `<base>/<segments...>`, keeping any path the base already has.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn cart_request<B: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> RequestBuilder {
        self.client
            .request(method, self.endpoint(segments))
            .json(body)
    }
}

/// Send a request and unwrap the response envelope.
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
    let response = request.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    if status.is_success() {
        let envelope: ApiResponse<T> = serde_json::from_slice(&bytes)?;
        return envelope.data.ok_or_else(|| {
            ApiError::Decode(<serde_json::Error as serde::de::Error>::custom(
                "response carried no data",
            ))
        });
    }

    let (code, message) = failure_details(&bytes);
    debug!(%status, ?code, %message, "API request failed");

    if status.is_server_error() {
        Err(ApiError::Server { status, message })
    } else {
        Err(ApiError::Rejected {
            status,
            code,
            message,
        })
    }
}

/// Extract the failure code and message from an error response body.
fn failure_details(body: &[u8]) -> (Option<ErrorCode>, String) {
    match serde_json::from_slice::<ApiResponse<serde_json::Value>>(body) {
        Ok(envelope) => (
            envelope.error,
            envelope
                .message
                .unwrap_or_else(|| "Request failed".to_string()),
        ),
        Err(_) => (
            None,
            String::from_utf8_lossy(body)
                .chars()
                .take(BODY_EXCERPT_LEN)
                .collect(),
        ),
    }
}

#[async_trait]
impl RemoteCart for CartApi {
    #[instrument(skip(self))]
    async fn get_cart(&self, user_id: &UserId) -> Result<CartView, ApiError> {
        let mut url = self.endpoint(&["cart"]);
        url.query_pairs_mut().append_pair("userId", user_id.as_str());
        send(self.client.get(url)).await
    }

    #[instrument(skip(self))]
    async fn add_item(
        &self,
        user_id: &UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartView, ApiError> {
        let body = AddItemRequest {
            user_id: Some(user_id.to_string()),
            product_id: Some(product_id.to_string()),
            quantity: Some(i64::from(quantity.get())),
        };
        send(self.cart_request(Method::POST, &["cart", "items"], &body))
            .await
    }

    #[instrument(skip(self))]
    async fn update_item(
        &self,
        user_id: &UserId,
        line_id: LineItemId,
        quantity: Quantity,
    ) -> Result<CartView, ApiError> {
        let body = UpdateItemRequest {
            user_id: Some(user_id.to_string()),
            quantity: Some(i64::from(quantity.get())),
        };
        let line = line_id.to_string();
        send(self.cart_request(Method::PUT, &["cart", "items", &line], &body))
            .await
    }

    #[instrument(skip(self))]
    async fn remove_item(
        &self,
        user_id: &UserId,
        line_id: LineItemId,
    ) -> Result<CartView, ApiError> {
        let body = UserRequest {
            user_id: Some(user_id.to_string()),
        };
        let line = line_id.to_string();
        send(self.cart_request(Method::DELETE, &["cart", "items", &line], &body))
            .await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self, user_id: &UserId) -> Result<CartView, ApiError> {
        let body = UserRequest {
            user_id: Some(user_id.to_string()),
        };
        send(self.cart_request(Method::DELETE, &["cart"], &body))
            .await
    }
}
