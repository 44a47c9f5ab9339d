//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use engine::{CheckoutError, RestockError};
use serde_json::{Value, json};
use store::StoreError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),

    /// Request data rejected by domain validation.
    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Restock(#[from] RestockError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Returns the status code and any structured fields added to the body.
    fn classify(&self) -> (StatusCode, Option<Value>) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            ApiError::BadRequest(_) | ApiError::Invalid(_) => (StatusCode::BAD_REQUEST, None),
            ApiError::Checkout(err) => checkout_status(err),
            ApiError::Restock(err) => restock_status(err),
            ApiError::Store(err) => (store_status(err), None),
        }
    }
}

fn checkout_status(err: &CheckoutError) -> (StatusCode, Option<Value>) {
    match err {
        CheckoutError::InvalidPayment(_) | CheckoutError::InvalidAddress(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, None)
        }
        CheckoutError::EmptyCart(_) => (StatusCode::BAD_REQUEST, None),
        CheckoutError::InvalidOrder(_) => (StatusCode::UNPROCESSABLE_ENTITY, None),
        CheckoutError::InsufficientStock {
            isbn,
            requested,
            available,
        } => (
            StatusCode::CONFLICT,
            Some(json!({
                "isbn": isbn,
                "requested": requested,
                "available": available,
            })),
        ),
        CheckoutError::Store(err) => (store_status(err), None),
    }
}

fn restock_status(err: &RestockError) -> (StatusCode, Option<Value>) {
    match err {
        RestockError::NotFound(_) => (StatusCode::NOT_FOUND, None),
        RestockError::NotPending { status, .. } => {
            (StatusCode::CONFLICT, Some(json!({ "status": status })))
        }
        RestockError::BookNotFound(isbn) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Some(json!({ "isbn": isbn })),
        ),
        RestockError::Store(err) => (store_status(err), None),
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::Conflict(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::BookNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Invalid(DomainError::StockOverflow { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
        StoreError::Corrupt(_) | StoreError::Database(_) | StoreError::Migration(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, details) = self.classify();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, status = status.as_u16(), "request failed");
        }

        let mut body = json!({ "error": message });
        if let (Some(Value::Object(extra)), Some(map)) = (details, body.as_object_mut()) {
            map.extend(extra);
        }
        (status, axum::Json(body)).into_response()
    }
}
