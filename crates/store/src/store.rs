use async_trait::async_trait;
use common::{CustomerId, Isbn, OrderId, PublisherOrderId};
use domain::{Book, CartLine, Money, Order, PublisherOrder};

use crate::{Result, StoreError};

/// A transaction handle scoped to one multi-step write.
///
/// Every operation runs inside the same database transaction. Changes become
/// visible to other callers only after [`UnitOfWork::commit`]; dropping the
/// handle without committing discards them.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Reads a book and locks its row until the transaction ends.
    ///
    /// A concurrent unit of work locking the same book waits here until this
    /// one commits or rolls back, then observes the current stock.
    async fn lock_book(&mut self, isbn: &Isbn) -> Result<Option<Book>>;

    /// Adds `delta` to a book's stock unless the result would be negative.
    ///
    /// Returns the number of rows changed: zero means the book is missing or
    /// the adjustment would drive stock below zero. Stock beyond the storable
    /// maximum fails with `StoreError::Invalid(DomainError::StockOverflow)`.
    async fn adjust_stock(&mut self, isbn: &Isbn, delta: i64) -> Result<u64>;

    /// Reads a customer's cart lines, ordered by ISBN.
    async fn cart_lines(&mut self, customer_id: CustomerId) -> Result<Vec<CartLine>>;

    /// Removes every line from a customer's cart. Returns the number removed.
    async fn clear_cart(&mut self, customer_id: CustomerId) -> Result<u64>;

    /// Persists an order header and its lines.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Reads a publisher order and locks it until the transaction ends.
    async fn lock_publisher_order(&mut self, id: PublisherOrderId)
    -> Result<Option<PublisherOrder>>;

    /// Writes a publisher order's status and close timestamp.
    async fn update_publisher_order_status(&mut self, order: &PublisherOrder) -> Result<()>;

    /// Makes every change visible atomically.
    async fn commit(self) -> Result<()>;

    /// Discards every change. Equivalent to dropping the handle.
    async fn rollback(self) -> Result<()>;
}

/// The relational store shared by every engine instance.
///
/// All implementations must be thread-safe (Send + Sync); the store, not the
/// caller, is the serialization point for concurrent writers.
#[async_trait]
pub trait Store: Send + Sync {
    type Tx: UnitOfWork;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Returns a book by code.
    async fn get_book(&self, isbn: &Isbn) -> Result<Option<Book>>;

    /// Inserts or replaces a book. Administrative edit: may set stock arbitrarily.
    async fn upsert_book(&self, book: Book) -> Result<()>;

    /// Changes a book's catalog price. Existing order lines are unaffected.
    async fn set_book_price(&self, isbn: &Isbn, price: Money) -> Result<()>;

    /// Returns books whose stock is below their reorder threshold, ordered by ISBN.
    async fn low_stock_books(&self) -> Result<Vec<Book>>;

    /// Returns a customer's cart lines, ordered by ISBN.
    async fn cart_lines(&self, customer_id: CustomerId) -> Result<Vec<CartLine>>;

    /// Adds a line to a cart, merging with an existing line for the same book.
    ///
    /// Returns the updated cart. Fails with `BookNotFound` for unknown books.
    async fn add_to_cart(&self, customer_id: CustomerId, line: CartLine)
    -> Result<Vec<CartLine>>;

    /// Removes one book from a cart. Returns true if a line was removed.
    async fn remove_from_cart(&self, customer_id: CustomerId, isbn: &Isbn) -> Result<bool>;

    /// Returns an order with its lines.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Returns a customer's order history, newest first.
    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>>;

    /// Persists a new pending publisher order.
    async fn create_publisher_order(&self, order: &PublisherOrder) -> Result<()>;

    /// Returns a publisher order with its lines.
    async fn get_publisher_order(&self, id: PublisherOrderId) -> Result<Option<PublisherOrder>>;
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait StoreExt: Store {
    /// Returns a book, failing with `BookNotFound` if it is absent.
    async fn require_book(&self, isbn: &Isbn) -> Result<Book> {
        self.get_book(isbn)
            .await?
            .ok_or_else(|| StoreError::BookNotFound(isbn.clone()))
    }

    /// Returns the current stock of a book, if it exists.
    async fn stock_of(&self, isbn: &Isbn) -> Result<Option<u32>> {
        Ok(self.get_book(isbn).await?.map(|b| b.stock))
    }
}

// Blanket implementation for all Store implementations
impl<T: Store + ?Sized> StoreExt for T {}
