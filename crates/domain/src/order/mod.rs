//! Customer orders.

mod status;

pub use status::OrderStatus;

use chrono::{DateTime, Utc};
use common::{CustomerId, Isbn, OrderId};
use serde::{Deserialize, Serialize};

use crate::address::ShippingAddress;
use crate::error::DomainError;
use crate::money::Money;

/// One sold line: the price is the catalog price at the moment of purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub isbn: Isbn,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn new(isbn: Isbn, title: impl Into<String>, quantity: u32, unit_price: Money) -> Self {
        Self {
            isbn,
            title: title.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns quantity * unit_price.
    pub fn line_total(&self) -> Result<Money, DomainError> {
        self.unit_price
            .checked_multiply(self.quantity)
            .ok_or(DomainError::AmountOverflow)
    }
}

/// A committed order. Header and lines are never mutated after creation,
/// except for `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub placed_at: DateTime<Utc>,
    pub total: Money,
    /// Truncated card reference; the full number is never stored.
    pub payment_reference: String,
    pub shipping: ShippingAddress,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Builds a new `Processing` order, computing the total from its lines.
    /// Fails with `AmountOverflow` if the total does not fit in `Money`.
    pub fn place(
        customer_id: CustomerId,
        lines: Vec<OrderLine>,
        payment_reference: impl Into<String>,
        shipping: ShippingAddress,
        placed_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let line_totals = lines
            .iter()
            .map(OrderLine::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        let total = Money::checked_sum(line_totals).ok_or(DomainError::AmountOverflow)?;
        Ok(Self {
            id: OrderId::new(),
            customer_id,
            placed_at,
            total,
            payment_reference: payment_reference.into(),
            shipping,
            status: OrderStatus::Processing,
            lines,
        })
    }

    /// Returns the total number of units across all lines.
    pub fn unit_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}
