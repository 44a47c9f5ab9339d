//! Order engine: turns a customer's cart into a committed order.

use chrono::{DateTime, Utc};
use common::CustomerId;
use domain::{Order, OrderLine, PaymentInfo, ShippingAddress};
use store::{Store, UnitOfWork};

use crate::error::CheckoutError;
use crate::ledger::{InventoryLedger, StockLine};

/// Everything checkout needs from the caller.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_id: CustomerId,
    pub payment: PaymentInfo,
    pub shipping: ShippingAddress,
}

impl CheckoutRequest {
    pub fn new(customer_id: CustomerId, payment: PaymentInfo, shipping: ShippingAddress) -> Self {
        Self {
            customer_id,
            payment,
            shipping,
        }
    }
}

/// Converts carts into orders exactly once.
///
/// Holds no state besides the store handle; any number of engines (in any
/// number of processes) may share the same database.
pub struct OrderEngine<S: Store> {
    store: S,
    conflict_retries: u32,
}

impl<S: Store> OrderEngine<S> {
    /// Creates a new order engine over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            conflict_retries: 0,
        }
    }

    /// Retries a checkout up to `retries` times when the store reports a
    /// transient conflict (deadlock, lock timeout).
    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Checks out the customer's cart as of now.
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<Order, CheckoutError> {
        self.checkout_at(request, Utc::now()).await
    }

    /// Checks out the customer's cart as of `now`.
    ///
    /// Card expiry is judged against `now`, which also becomes the order's
    /// placement time. On any error nothing is committed: stock, cart and
    /// order tables are exactly as before the call.
    #[tracing::instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn checkout_at(
        &self,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<Order, CheckoutError> {
        metrics::counter!("checkouts_total").increment(1);
        let start = std::time::Instant::now();

        let mut attempt = 0;
        let result = loop {
            match self.try_checkout(&request, now).await {
                Err(CheckoutError::Store(ref err))
                    if err.is_retryable() && attempt < self.conflict_retries =>
                {
                    attempt += 1;
                    tracing::warn!(attempt, error = %err, "checkout conflicted, retrying");
                }
                result => break result,
            }
        };

        let duration = start.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);

        match &result {
            Ok(order) => {
                metrics::counter!("stock_units_decremented_total").increment(order.unit_count());
                tracing::info!(
                    order_id = %order.id,
                    total = %order.total,
                    lines = order.lines.len(),
                    duration,
                    "checkout committed"
                );
            }
            Err(err) => {
                metrics::counter!("checkouts_failed_total", "reason" => err.reason()).increment(1);
                tracing::warn!(reason = err.reason(), error = %err, "checkout rejected");
            }
        }

        result
    }

    async fn try_checkout(
        &self,
        request: &CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<Order, CheckoutError> {
        // Pure validation, no side effects.
        request.payment.validate(now.date_naive())?;
        request.shipping.validate()?;

        let customer_id = request.customer_id;

        // Early returns drop `tx`, which rolls it back.
        let mut tx = self.store.begin().await?;

        let cart = tx.cart_lines(customer_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart(customer_id));
        }

        let lines: Vec<StockLine> = cart.iter().map(StockLine::from).collect();
        let reservations = InventoryLedger::reserve_and_decrement(&mut tx, &lines).await?;

        let order_lines = reservations
            .iter()
            .map(|r| {
                OrderLine::new(
                    r.book.isbn.clone(),
                    r.book.title.clone(),
                    r.quantity,
                    r.book.unit_price,
                )
            })
            .collect();
        let order = Order::place(
            customer_id,
            order_lines,
            request.payment.reference(),
            request.shipping.clone(),
            now,
        )?;

        tx.insert_order(&order).await?;
        tx.clear_cart(customer_id).await?;
        tx.commit().await?;

        for reservation in reservations.iter().filter(|r| {
            r.remaining_stock() < r.book.reorder_threshold
        }) {
            tracing::warn!(
                isbn = %reservation.book.isbn,
                stock = reservation.remaining_stock(),
                reorder_threshold = reservation.book.reorder_threshold,
                "book below reorder threshold"
            );
        }

        Ok(order)
    }
}
