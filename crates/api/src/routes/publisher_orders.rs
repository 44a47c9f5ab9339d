//! Publisher restock order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use common::PublisherOrderId;
use domain::{Money, PublisherOrder, PublisherOrderLine};
use serde::{Deserialize, Serialize};
use store::Store;

use super::parse_uuid;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreatePublisherOrderRequest {
    pub publisher: String,
    pub lines: Vec<PublisherOrderLineRequest>,
}

#[derive(Deserialize)]
pub struct PublisherOrderLineRequest {
    pub isbn: String,
    pub quantity: u32,
    pub unit_cost_cents: i64,
}

#[derive(Serialize)]
pub struct PublisherOrderResponse {
    pub id: String,
    pub publisher: String,
    pub status: String,
    pub created_at: String,
    pub closed_at: Option<String>,
    /// `None` if the stored lines no longer sum within range.
    pub total_cost_cents: Option<i64>,
    pub lines: Vec<PublisherOrderLineResponse>,
}

#[derive(Serialize)]
pub struct PublisherOrderLineResponse {
    pub isbn: String,
    pub quantity: u32,
    pub unit_cost_cents: i64,
}

impl From<PublisherOrder> for PublisherOrderResponse {
    fn from(order: PublisherOrder) -> Self {
        Self {
            id: order.id.to_string(),
            status: order.status.to_string(),
            created_at: order.created_at.to_rfc3339(),
            closed_at: order.closed_at.map(|at| at.to_rfc3339()),
            total_cost_cents: order.total_cost().ok().map(|total| total.cents()),
            lines: order
                .lines
                .into_iter()
                .map(|l| PublisherOrderLineResponse {
                    isbn: l.isbn.to_string(),
                    quantity: l.quantity,
                    unit_cost_cents: l.unit_cost.cents(),
                })
                .collect(),
            publisher: order.publisher,
        }
    }
}

fn parse_publisher_order_id(raw: &str) -> Result<PublisherOrderId, ApiError> {
    parse_uuid(raw, "publisher order").map(PublisherOrderId::from_uuid)
}

/// POST /publisher-orders: records a new pending order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreatePublisherOrderRequest>,
) -> Result<(StatusCode, Json<PublisherOrderResponse>), ApiError> {
    let lines = req
        .lines
        .into_iter()
        .map(|l| PublisherOrderLine::new(l.isbn, l.quantity, Money::from_cents(l.unit_cost_cents)))
        .collect();
    let order = PublisherOrder::new(req.publisher, lines, Utc::now())?;
    state.store.create_publisher_order(&order).await?;

    tracing::info!(id = %order.id, publisher = %order.publisher, "publisher order created");
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /publisher-orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PublisherOrderResponse>, ApiError> {
    let order_id = parse_publisher_order_id(&id)?;
    let order = state
        .store
        .get_publisher_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Publisher order {id} not found")))?;
    Ok(Json(order.into()))
}

/// POST /publisher-orders/{id}/confirm: receives the shipment into stock.
#[tracing::instrument(skip(state))]
pub async fn confirm<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PublisherOrderResponse>, ApiError> {
    let order = state.restock.confirm(parse_publisher_order_id(&id)?).await?;
    Ok(Json(order.into()))
}

/// POST /publisher-orders/{id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PublisherOrderResponse>, ApiError> {
    let order = state.restock.cancel(parse_publisher_order_id(&id)?).await?;
    Ok(Json(order.into()))
}
