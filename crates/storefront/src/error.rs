//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client with a JSON envelope. All route handlers
//! return `Result<T, AppError>`.

use axum::{
    Json,
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use shopcart_core::CartError;
use shopcart_core::api::{ApiResponse, ErrorCode};

use crate::services::CartServiceError;
use crate::store::StoreError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing request input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Not enough stock for the requested quantity.
    #[error("Stock error: {0}")]
    Stock(String),

    /// Storage operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Stock(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code sent in the envelope.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Stock(_) => ErrorCode::StockError,
            Self::Store(StoreError::Unavailable(_)) => ErrorCode::StoreUnavailable,
            Self::Store(StoreError::DataCorruption(_)) | Self::Internal(_) => {
                ErrorCode::InternalError
            }
        }
    }

    /// Message shown to the client. Internal details are never exposed.
    fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::NotFound(msg) | Self::Stock(msg) => msg.clone(),
            Self::Store(StoreError::Unavailable(_)) => "Service temporarily unavailable".to_string(),
            Self::Store(StoreError::DataCorruption(_)) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.status().is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = ApiResponse::<()>::failure(self.code(), self.public_message());
        (self.status(), Json(body)).into_response()
    }
}

impl From<CartServiceError> for AppError {
    fn from(err: CartServiceError) -> Self {
        match err {
            CartServiceError::ProductNotFound(_) => Self::NotFound("Product not found".to_string()),
            CartServiceError::CartNotFound(_) => Self::NotFound("Cart not found".to_string()),
            CartServiceError::Cart(CartError::ItemNotFound(_)) => {
                Self::NotFound("Item not found in cart".to_string())
            }
            CartServiceError::Cart(CartError::InsufficientStock { available, .. }) => {
                Self::Stock(format!("Insufficient stock. Only {available} available"))
            }
            CartServiceError::Cart(CartError::QuantityOverflow(_)) => {
                Self::Validation("Quantity is too large".to_string())
            }
            CartServiceError::Cart(
                err @ (CartError::DuplicateProduct(_) | CartError::DuplicateLine(_)),
            ) => Self::Internal(err.to_string()),
            CartServiceError::Store(err) => Self::Store(err),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(format!("Invalid path: {}", rejection.body_text()))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for cart actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_string(), serde_json::Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}
