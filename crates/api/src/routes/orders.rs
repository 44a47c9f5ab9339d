//! Checkout and order history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{Order, PaymentInfo, ShippingAddress};
use engine::CheckoutRequest;
use serde::{Deserialize, Serialize};
use store::Store;

use super::carts::parse_customer_id;
use super::parse_uuid;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub payment: PaymentInfo,
    pub shipping: ShippingAddress,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub placed_at: String,
    pub status: String,
    pub total_cents: i64,
    pub payment_reference: String,
    pub shipping: ShippingAddress,
    pub lines: Vec<OrderLineResponse>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub isbn: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: Option<i64>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            customer_id: order.customer_id.to_string(),
            placed_at: order.placed_at.to_rfc3339(),
            status: order.status.to_string(),
            total_cents: order.total.cents(),
            payment_reference: order.payment_reference,
            shipping: order.shipping,
            lines: order
                .lines
                .into_iter()
                .map(|line| OrderLineResponse {
                    line_total_cents: line.line_total().ok().map(|total| total.cents()),
                    isbn: line.isbn.to_string(),
                    title: line.title,
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /customers/{id}/checkout: converts the cart into an order.
#[tracing::instrument(skip(state, body))]
pub async fn checkout<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(body): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let customer_id = parse_customer_id(&id)?;
    let request = CheckoutRequest::new(customer_id, body.payment, body.shipping);
    let order = state.orders.checkout(request).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /customers/{id}/orders: order history, newest first.
#[tracing::instrument(skip(state))]
pub async fn history<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let customer_id = parse_customer_id(&id)?;
    let orders = state.store.orders_for_customer(customer_id).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = OrderId::from_uuid(parse_uuid(&id, "order")?);
    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    Ok(Json(order.into()))
}
