//! Prometheus scrape endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;

use crate::state::AppState;

/// State for the scrape route: the recorder handle plus the store whose
/// catalog feeds the point-in-time gauges.
pub struct MetricsState<S: Store> {
    pub app: Arc<AppState<S>>,
    pub handle: PrometheusHandle,
}

impl<S: Store> Clone for MetricsState<S> {
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
            handle: self.handle.clone(),
        }
    }
}

/// GET /metrics: engine counters plus a fresh `books_below_reorder_threshold` gauge.
pub async fn get<S: Store + Clone + 'static>(State(state): State<MetricsState<S>>) -> Response {
    match state.app.store.low_stock_books().await {
        Ok(books) => {
            metrics::gauge!("books_below_reorder_threshold").set(books.len() as f64);
        }
        Err(err) => tracing::warn!(error = %err, "low-stock gauge not refreshed"),
    }

    state.handle.run_upkeep();
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.handle.render(),
    )
        .into_response()
}
