//! Inventory ledger: the only code that changes `Book::stock`.
//!
//! Both operations run inside a caller-owned [`UnitOfWork`] and never commit or
//! roll back themselves. On error the caller must discard the unit of work; any
//! adjustments already applied for earlier lines are undone with it.

use std::collections::BTreeMap;

use common::Isbn;
use domain::{Book, CartLine, PublisherOrderLine};
use store::UnitOfWork;

use crate::error::{IncrementError, ReserveError};

/// A (book, quantity) pair to reserve or restock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLine {
    pub isbn: Isbn,
    pub quantity: u32,
}

impl StockLine {
    pub fn new(isbn: impl Into<Isbn>, quantity: u32) -> Self {
        Self {
            isbn: isbn.into(),
            quantity,
        }
    }
}

impl From<&CartLine> for StockLine {
    fn from(line: &CartLine) -> Self {
        Self::new(line.isbn.clone(), line.quantity)
    }
}

impl From<&PublisherOrderLine> for StockLine {
    fn from(line: &PublisherOrderLine) -> Self {
        Self::new(line.isbn.clone(), line.quantity)
    }
}

/// Stock taken for one line, with the book as it was read under lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Book snapshot before the decrement; its price is the purchase price.
    pub book: Book,
    pub quantity: u32,
}

impl Reservation {
    /// Stock left on hand after this reservation.
    pub fn remaining_stock(&self) -> u32 {
        self.book.stock - self.quantity
    }
}

/// Merges duplicate books and orders lines by ISBN, which is also the
/// row-lock order, so overlapping transactions cannot deadlock.
fn lock_order(lines: &[StockLine]) -> BTreeMap<&Isbn, u32> {
    let mut merged: BTreeMap<&Isbn, u32> = BTreeMap::new();
    for line in lines {
        let quantity = merged.entry(&line.isbn).or_insert(0);
        *quantity = quantity.saturating_add(line.quantity);
    }
    merged
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryLedger;

impl InventoryLedger {
    /// Checks and decrements stock for every line, failing the whole call if
    /// any line asks for more than is on hand.
    ///
    /// Each book row is locked before its stock is read, and the decrement is
    /// a conditional update, so check and write form one step per row.
    #[tracing::instrument(skip(tx, lines), fields(lines = lines.len()))]
    pub async fn reserve_and_decrement<U: UnitOfWork>(
        tx: &mut U,
        lines: &[StockLine],
    ) -> Result<Vec<Reservation>, ReserveError> {
        let mut reservations = Vec::with_capacity(lines.len());

        for (isbn, requested) in lock_order(lines) {
            let Some(book) = tx.lock_book(isbn).await? else {
                tracing::info!(%isbn, requested, "book no longer in catalog");
                return Err(ReserveError::InsufficientStock {
                    isbn: isbn.clone(),
                    requested,
                    available: 0,
                });
            };

            let available = book.stock;
            if requested > available
                || tx.adjust_stock(isbn, -i64::from(requested)).await? == 0
            {
                tracing::info!(%isbn, requested, available, "insufficient stock");
                return Err(ReserveError::InsufficientStock {
                    isbn: isbn.clone(),
                    requested,
                    available,
                });
            }

            reservations.push(Reservation {
                book,
                quantity: requested,
            });
        }

        Ok(reservations)
    }

    /// Adds stock for every line, failing the whole call if any book is missing.
    #[tracing::instrument(skip(tx, lines), fields(lines = lines.len()))]
    pub async fn increment<U: UnitOfWork>(
        tx: &mut U,
        lines: &[StockLine],
    ) -> Result<(), IncrementError> {
        for (isbn, quantity) in lock_order(lines) {
            if tx.adjust_stock(isbn, i64::from(quantity)).await? == 0 {
                tracing::info!(%isbn, quantity, "cannot restock missing book");
                return Err(IncrementError::BookNotFound(isbn.clone()));
            }
        }
        Ok(())
    }
}
