//! HTTP API server for the bookstore checkout and restock engine.
//!
//! A thin host around [`engine::OrderEngine`] and [`engine::RestockEngine`]:
//! handlers parse requests, call the engines or the store, and map errors to
//! status codes. Structured logging (tracing) and Prometheus metrics are
//! wired in here.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get::<S>))
        .with_state(routes::metrics::MetricsState {
            app: Arc::clone(&state),
            handle: metrics_handle,
        });

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/books/low-stock", get(routes::books::low_stock::<S>))
        .route(
            "/books/{isbn}",
            get(routes::books::get::<S>).put(routes::books::upsert::<S>),
        )
        .route("/books/{isbn}/price", put(routes::books::set_price::<S>))
        .route(
            "/customers/{id}/cart",
            get(routes::carts::get::<S>).post(routes::carts::add_line::<S>),
        )
        .route(
            "/customers/{id}/cart/{isbn}",
            delete(routes::carts::remove_line::<S>),
        )
        .route(
            "/customers/{id}/checkout",
            post(routes::orders::checkout::<S>),
        )
        .route("/customers/{id}/orders", get(routes::orders::history::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route(
            "/publisher-orders",
            post(routes::publisher_orders::create::<S>),
        )
        .route(
            "/publisher-orders/{id}",
            get(routes::publisher_orders::get::<S>),
        )
        .route(
            "/publisher-orders/{id}/confirm",
            post(routes::publisher_orders::confirm::<S>),
        )
        .route(
            "/publisher-orders/{id}/cancel",
            post(routes::publisher_orders::cancel::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
