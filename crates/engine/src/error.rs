//! Engine error types.

use common::{CustomerId, Isbn, PublisherOrderId};
use domain::{AddressError, CardError, DomainError, PublisherOrderStatus};
use store::StoreError;
use thiserror::Error;

/// Failure to reserve stock for a set of lines.
#[derive(Debug, Error)]
pub enum ReserveError {
    /// A line asks for more units than are on hand. A missing book has zero on hand.
    #[error("Insufficient stock for {isbn}: requested {requested}, available {available}")]
    InsufficientStock {
        isbn: Isbn,
        requested: u32,
        available: u32,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Failure to add stock for a set of lines.
#[derive(Debug, Error)]
pub enum IncrementError {
    #[error("Book not found: {0}")]
    BookNotFound(Isbn),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors returned by checkout. Nothing is committed when any of them occurs.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Card data is malformed or expired.
    #[error("Invalid payment: {0}")]
    InvalidPayment(#[from] CardError),

    #[error("Invalid shipping address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// The customer's cart has no lines.
    #[error("Cart for customer {0} is empty")]
    EmptyCart(CustomerId),

    /// One line could not be reserved; the cart is left untouched.
    #[error("Insufficient stock for {isbn}: requested {requested}, available {available}")]
    InsufficientStock {
        isbn: Isbn,
        requested: u32,
        available: u32,
    },

    /// The order itself cannot be built, e.g. its total overflows.
    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] DomainError),

    /// Infrastructure failure; safe to retry since nothing was committed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CheckoutError {
    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            CheckoutError::InvalidPayment(_) => "invalid_payment",
            CheckoutError::InvalidAddress(_) => "invalid_address",
            CheckoutError::EmptyCart(_) => "empty_cart",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::InvalidOrder(_) => "invalid_order",
            CheckoutError::Store(_) => "store",
        }
    }
}

impl From<ReserveError> for CheckoutError {
    fn from(err: ReserveError) -> Self {
        match err {
            ReserveError::InsufficientStock {
                isbn,
                requested,
                available,
            } => CheckoutError::InsufficientStock {
                isbn,
                requested,
                available,
            },
            ReserveError::Store(e) => CheckoutError::Store(e),
        }
    }
}

/// Errors returned by publisher order confirmation and cancellation.
#[derive(Debug, Error)]
pub enum RestockError {
    #[error("Publisher order not found: {0}")]
    NotFound(PublisherOrderId),

    /// The order already left `Pending`; nothing was changed.
    #[error("Publisher order {id} is {status}, expected Pending")]
    NotPending {
        id: PublisherOrderId,
        status: PublisherOrderStatus,
    },

    /// A line references a book that no longer exists; the whole confirmation aborted.
    #[error("Book not found: {0}")]
    BookNotFound(Isbn),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl RestockError {
    pub fn reason(&self) -> &'static str {
        match self {
            RestockError::NotFound(_) => "not_found",
            RestockError::NotPending { .. } => "not_pending",
            RestockError::BookNotFound(_) => "book_not_found",
            RestockError::Store(_) => "store",
        }
    }
}

impl From<IncrementError> for RestockError {
    fn from(err: IncrementError) -> Self {
        match err {
            IncrementError::BookNotFound(isbn) => RestockError::BookNotFound(isbn),
            IncrementError::Store(e) => RestockError::Store(e),
        }
    }
}

impl From<DomainError> for RestockError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotPending { id, status } => RestockError::NotPending { id, status },
            other => RestockError::Store(StoreError::Invalid(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_error_maps_to_checkout_error() {
        let err: CheckoutError = ReserveError::InsufficientStock {
            isbn: Isbn::new("B2"),
            requested: 1,
            available: 0,
        }
        .into();
        assert!(matches!(
            err,
            CheckoutError::InsufficientStock {
                requested: 1,
                available: 0,
                ..
            }
        ));
        assert_eq!(err.reason(), "insufficient_stock");
        assert_eq!(
            err.to_string(),
            "Insufficient stock for B2: requested 1, available 0"
        );
    }

    #[test]
    fn amount_overflow_maps_to_invalid_order() {
        let err: CheckoutError = DomainError::AmountOverflow.into();
        assert!(matches!(
            err,
            CheckoutError::InvalidOrder(DomainError::AmountOverflow)
        ));
        assert_eq!(err.reason(), "invalid_order");
    }

    #[test]
    fn not_pending_domain_error_maps_to_restock_error() {
        let id = PublisherOrderId::new();
        let err: RestockError = DomainError::NotPending {
            id,
            status: PublisherOrderStatus::Confirmed,
        }
        .into();
        assert!(matches!(
            err,
            RestockError::NotPending {
                status: PublisherOrderStatus::Confirmed,
                ..
            }
        ));
    }
}
