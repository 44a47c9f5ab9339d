//! Restocking orders placed with publishers.

mod status;

pub use status::PublisherOrderStatus;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use common::{Isbn, PublisherOrderId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherOrderLine {
    pub isbn: Isbn,
    pub quantity: u32,
    pub unit_cost: Money,
}

impl PublisherOrderLine {
    pub fn new(isbn: impl Into<Isbn>, quantity: u32, unit_cost: Money) -> Self {
        Self {
            isbn: isbn.into(),
            quantity,
            unit_cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherOrder {
    pub id: PublisherOrderId,
    pub publisher: String,
    pub status: PublisherOrderStatus,
    pub lines: Vec<PublisherOrderLine>,
    pub created_at: DateTime<Utc>,
    /// Set when the order leaves `Pending`, whichever way.
    pub closed_at: Option<DateTime<Utc>>,
}

impl PublisherOrder {
    /// Creates a pending order after validating its lines.
    pub fn new(
        publisher: impl Into<String>,
        lines: Vec<PublisherOrderLine>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let publisher = publisher.into();
        if publisher.trim().is_empty() {
            return Err(DomainError::PublisherRequired);
        }
        if lines.is_empty() {
            return Err(DomainError::NoLines);
        }

        let mut seen = HashSet::new();
        for line in &lines {
            if line.isbn.is_empty() {
                return Err(DomainError::IsbnRequired);
            }
            if line.quantity == 0 {
                return Err(DomainError::InvalidQuantity {
                    isbn: line.isbn.clone(),
                    quantity: 0,
                });
            }
            if line.unit_cost.is_negative() {
                return Err(DomainError::InvalidPrice {
                    cents: line.unit_cost.cents(),
                });
            }
            if !seen.insert(&line.isbn) {
                return Err(DomainError::DuplicateLine(line.isbn.clone()));
            }
        }

        let order = Self {
            id: PublisherOrderId::new(),
            publisher,
            status: PublisherOrderStatus::Pending,
            lines,
            created_at,
            closed_at: None,
        };
        order.total_cost()?;
        Ok(order)
    }

    /// Fails with `NotPending` unless the order can still transition.
    pub fn ensure_pending(&self) -> Result<(), DomainError> {
        if self.status.can_transition() {
            Ok(())
        } else {
            Err(DomainError::NotPending {
                id: self.id,
                status: self.status,
            })
        }
    }

    /// Moves a pending order to `Confirmed`.
    pub fn confirm(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.close(PublisherOrderStatus::Confirmed, at)
    }

    /// Moves a pending order to `Cancelled`.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.close(PublisherOrderStatus::Cancelled, at)
    }

    fn close(&mut self, status: PublisherOrderStatus, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_pending()?;
        self.status = status;
        self.closed_at = Some(at);
        Ok(())
    }

    /// Total cost of the order at publisher prices.
    pub fn total_cost(&self) -> Result<Money, DomainError> {
        self.lines.iter().try_fold(Money::zero(), |acc, l| {
            l.unit_cost
                .checked_multiply(l.quantity)
                .and_then(|cost| acc.checked_add(cost))
                .ok_or(DomainError::AmountOverflow)
        })
    }
}
