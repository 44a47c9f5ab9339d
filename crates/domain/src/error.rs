//! Domain error types.

use common::{Isbn, PublisherOrderId};
use thiserror::Error;

use crate::publisher_order::PublisherOrderStatus;

/// Errors raised when constructing or transitioning domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Book code is blank.
    #[error("ISBN is required")]
    IsbnRequired,

    /// Quantity must be at least one.
    #[error("Invalid quantity for {isbn}: {quantity} (must be greater than 0)")]
    InvalidQuantity { isbn: Isbn, quantity: u32 },

    /// Price or cost may not be negative.
    #[error("Invalid price: {cents} cents (must not be negative)")]
    InvalidPrice { cents: i64 },

    /// Reorder threshold must be positive.
    #[error("Invalid reorder threshold for {isbn}: must be greater than 0")]
    InvalidReorderThreshold { isbn: Isbn },

    /// A publisher order needs at least one line.
    #[error("Publisher order has no lines")]
    NoLines,

    /// The same book appears twice in one publisher order.
    #[error("Duplicate line for {0}")]
    DuplicateLine(Isbn),

    /// A line total or order total does not fit in the money range.
    #[error("Amount overflow: total exceeds the representable range")]
    AmountOverflow,

    /// Adding stock would exceed the largest storable count.
    #[error("Stock overflow for {isbn}: cannot add {quantity} units")]
    StockOverflow { isbn: Isbn, quantity: i64 },

    /// Publisher name is blank.
    #[error("Publisher is required")]
    PublisherRequired,

    /// Publisher order already left the pending state.
    #[error("Publisher order {id} is {status}, expected Pending")]
    NotPending {
        id: PublisherOrderId,
        status: PublisherOrderStatus,
    },
}
