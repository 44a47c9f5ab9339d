//! Shopping cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CustomerId, Isbn};
use domain::CartLine;
use serde::{Deserialize, Serialize};
use store::Store;

use super::parse_uuid;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddLineRequest {
    pub isbn: String,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub isbn: String,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub customer_id: String,
    pub lines: Vec<CartLineResponse>,
}

impl CartResponse {
    fn new(customer_id: CustomerId, lines: Vec<CartLine>) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            lines: lines
                .into_iter()
                .map(|l| CartLineResponse {
                    isbn: l.isbn.to_string(),
                    quantity: l.quantity,
                })
                .collect(),
        }
    }
}

pub(crate) fn parse_customer_id(raw: &str) -> Result<CustomerId, ApiError> {
    parse_uuid(raw, "customer").map(CustomerId::from_uuid)
}

/// GET /customers/{id}/cart
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let customer_id = parse_customer_id(&id)?;
    let lines = state.store.cart_lines(customer_id).await?;
    Ok(Json(CartResponse::new(customer_id, lines)))
}

/// POST /customers/{id}/cart: adds units of a book, merging with an existing line.
#[tracing::instrument(skip(state, req))]
pub async fn add_line<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AddLineRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let customer_id = parse_customer_id(&id)?;
    let line = CartLine::new(req.isbn, req.quantity)?;
    let lines = state.store.add_to_cart(customer_id, line).await?;
    Ok(Json(CartResponse::new(customer_id, lines)))
}

/// DELETE /customers/{id}/cart/{isbn}
#[tracing::instrument(skip(state))]
pub async fn remove_line<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, isbn)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let customer_id = parse_customer_id(&id)?;
    if state
        .store
        .remove_from_cart(customer_id, &Isbn::new(isbn.as_str()))
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Book {isbn} is not in the cart")))
    }
}
