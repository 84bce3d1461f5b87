//! HTTP error mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::ShopError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Shop(#[from] ShopError),

    /// A failure raised by checkout, where a stock shortfall is a conflict
    /// with other buyers rather than a bad request.
    #[error(transparent)]
    Checkout(ShopError),

    #[error("Missing X-User-Id header")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self { Self::BadRequest(errors.to_string()) }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Shop(err) => shop_status(err, false),
            Self::Checkout(err) => shop_status(err, true),
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

fn shop_status(err: &ShopError, checkout: bool) -> StatusCode {
    match err {
        ShopError::InvalidQuantity
        | ShopError::EmptyCart
        | ShopError::CartFull(_)
        | ShopError::InvalidChangeType(_) => StatusCode::BAD_REQUEST,
        ShopError::InsufficientStock if checkout => StatusCode::CONFLICT,
        ShopError::InsufficientStock => StatusCode::BAD_REQUEST,
        ShopError::OptimisticLockExhausted | ShopError::TransactionConflict | ShopError::StockConflict => {
            StatusCode::CONFLICT
        }
        ShopError::OrderNotFound | ShopError::ProductNotFound | ShopError::CartItemNotFound => StatusCode::NOT_FOUND,
        ShopError::Money(_) | ShopError::Storage(_) | ShopError::Serialization(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Don't expose internal error details to clients
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
