//! Cart lines.

use common::Isbn;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// One (book, desired quantity) pair in a customer's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub isbn: Isbn,
    pub quantity: u32,
}

impl CartLine {
    /// Creates a cart line, rejecting a zero quantity.
    pub fn new(isbn: impl Into<Isbn>, quantity: u32) -> Result<Self, DomainError> {
        let isbn = isbn.into();
        if isbn.is_empty() {
            return Err(DomainError::IsbnRequired);
        }
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { isbn, quantity });
        }
        Ok(Self { isbn, quantity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(matches!(
            CartLine::new("B1", 0),
            Err(DomainError::InvalidQuantity { quantity: 0, .. })
        ));
        assert_eq!(CartLine::new("B1", 2).unwrap().quantity, 2);
    }
}
