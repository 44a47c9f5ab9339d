//! Publisher restock engine: confirms or cancels pending publisher orders.

use chrono::{DateTime, Utc};
use common::PublisherOrderId;
use domain::PublisherOrder;
use store::{Store, UnitOfWork};

use crate::error::RestockError;
use crate::ledger::{InventoryLedger, StockLine};

/// Drives publisher orders out of `Pending`, exactly once each.
///
/// The order row is locked for the duration of the transition, so two
/// concurrent confirmations cannot both observe `Pending`.
pub struct RestockEngine<S: Store> {
    store: S,
}

impl<S: Store> RestockEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Confirms a pending order, adding every line's quantity to stock.
    pub async fn confirm(&self, id: PublisherOrderId) -> Result<PublisherOrder, RestockError> {
        self.confirm_at(id, Utc::now()).await
    }

    /// Confirms a pending order with `now` as the confirmation time.
    ///
    /// Either every line is restocked and the order becomes `Confirmed`, or
    /// nothing changes.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_at(
        &self,
        id: PublisherOrderId,
        now: DateTime<Utc>,
    ) -> Result<PublisherOrder, RestockError> {
        let result = self.try_confirm(id, now).await;
        match &result {
            Ok(order) => {
                let units: u64 = order.lines.iter().map(|l| u64::from(l.quantity)).sum();
                metrics::counter!("publisher_orders_confirmed_total").increment(1);
                metrics::counter!("stock_units_incremented_total").increment(units);
                tracing::info!(%id, units, "publisher order confirmed");
            }
            Err(err) => record_failure("confirm", err),
        }
        result
    }

    async fn try_confirm(
        &self,
        id: PublisherOrderId,
        now: DateTime<Utc>,
    ) -> Result<PublisherOrder, RestockError> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .lock_publisher_order(id)
            .await?
            .ok_or(RestockError::NotFound(id))?;

        order.confirm(now)?;

        let lines: Vec<StockLine> = order.lines.iter().map(StockLine::from).collect();
        InventoryLedger::increment(&mut tx, &lines).await?;

        tx.update_publisher_order_status(&order).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Cancels a pending order. Stock is not touched.
    pub async fn cancel(&self, id: PublisherOrderId) -> Result<PublisherOrder, RestockError> {
        self.cancel_at(id, Utc::now()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_at(
        &self,
        id: PublisherOrderId,
        now: DateTime<Utc>,
    ) -> Result<PublisherOrder, RestockError> {
        let result = self.try_cancel(id, now).await;
        match &result {
            Ok(_) => {
                metrics::counter!("publisher_orders_cancelled_total").increment(1);
                tracing::info!(%id, "publisher order cancelled");
            }
            Err(err) => record_failure("cancel", err),
        }
        result
    }

    async fn try_cancel(
        &self,
        id: PublisherOrderId,
        now: DateTime<Utc>,
    ) -> Result<PublisherOrder, RestockError> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .lock_publisher_order(id)
            .await?
            .ok_or(RestockError::NotFound(id))?;

        order.cancel(now)?;

        tx.update_publisher_order_status(&order).await?;
        tx.commit().await?;
        Ok(order)
    }
}

fn record_failure(action: &'static str, err: &RestockError) {
    metrics::counter!(
        "publisher_order_transitions_failed_total",
        "action" => action,
        "reason" => err.reason()
    )
    .increment(1);
    tracing::warn!(action, reason = err.reason(), error = %err, "publisher order transition rejected");
}
