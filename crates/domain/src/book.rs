//! Catalog entries.

use common::Isbn;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// A book in the catalog together with its stock level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub isbn: Isbn,
    pub title: String,
    pub unit_price: Money,
    pub stock: u32,
    /// Informational floor; below it restocking is advisable.
    pub reorder_threshold: u32,
}

impl Book {
    /// Creates a validated book record.
    pub fn new(
        isbn: impl Into<Isbn>,
        title: impl Into<String>,
        unit_price: Money,
        stock: u32,
        reorder_threshold: u32,
    ) -> Result<Self, DomainError> {
        let isbn = isbn.into();
        if isbn.is_empty() {
            return Err(DomainError::IsbnRequired);
        }
        if unit_price.is_negative() {
            return Err(DomainError::InvalidPrice {
                cents: unit_price.cents(),
            });
        }
        if reorder_threshold == 0 {
            return Err(DomainError::InvalidReorderThreshold { isbn });
        }

        Ok(Self {
            isbn,
            title: title.into(),
            unit_price,
            stock,
            reorder_threshold,
        })
    }

    /// Returns true if stock has fallen below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock < self.reorder_threshold
    }
}
