use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{CustomerId, Isbn, OrderId, PublisherOrderId};
use domain::{Book, CartLine, DomainError, Money, Order, PublisherOrder};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Result, StoreError,
    store::{Store, UnitOfWork},
};

#[derive(Debug, Clone, Default)]
struct State {
    books: BTreeMap<Isbn, Book>,
    carts: HashMap<CustomerId, BTreeMap<Isbn, u32>>,
    orders: Vec<Order>,
    publisher_orders: HashMap<PublisherOrderId, PublisherOrder>,
}

impl State {
    fn cart_lines(&self, customer_id: CustomerId) -> Vec<CartLine> {
        self.carts
            .get(&customer_id)
            .map(|cart| {
                cart.iter()
                    .map(|(isbn, &quantity)| CartLine {
                        isbn: isbn.clone(),
                        quantity,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// In-memory store implementation for testing and for running without a database.
///
/// A unit of work holds the store-wide lock for its whole lifetime and edits a
/// private copy of the state, so concurrent transactions are fully serialized
/// and an uncommitted copy simply disappears on drop.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    fail_on_order_insert: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail every `insert_order` call.
    pub fn set_fail_on_order_insert(&self, fail: bool) {
        self.fail_on_order_insert.store(fail, Ordering::SeqCst);
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<State>,
    working: State,
    fail_on_order_insert: bool,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn lock_book(&mut self, isbn: &Isbn) -> Result<Option<Book>> {
        Ok(self.working.books.get(isbn).cloned())
    }

    async fn adjust_stock(&mut self, isbn: &Isbn, delta: i64) -> Result<u64> {
        let Some(book) = self.working.books.get_mut(isbn) else {
            return Ok(0);
        };
        let updated = i64::from(book.stock).saturating_add(delta);
        if updated < 0 {
            return Ok(0);
        }
        let stock = u32::try_from(updated).map_err(|_| {
            StoreError::Invalid(DomainError::StockOverflow {
                isbn: isbn.clone(),
                quantity: delta,
            })
        })?;
        book.stock = stock;
        Ok(1)
    }

    async fn cart_lines(&mut self, customer_id: CustomerId) -> Result<Vec<CartLine>> {
        Ok(self.working.cart_lines(customer_id))
    }

    async fn clear_cart(&mut self, customer_id: CustomerId) -> Result<u64> {
        let removed = self
            .working
            .carts
            .remove(&customer_id)
            .map(|cart| cart.len() as u64)
            .unwrap_or(0);
        Ok(removed)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        if self.fail_on_order_insert {
            return Err(StoreError::Database(sqlx::Error::Protocol(
                "simulated order insert failure".to_string(),
            )));
        }
        self.working.orders.push(order.clone());
        Ok(())
    }

    async fn lock_publisher_order(
        &mut self,
        id: PublisherOrderId,
    ) -> Result<Option<PublisherOrder>> {
        Ok(self.working.publisher_orders.get(&id).cloned())
    }

    async fn update_publisher_order_status(&mut self, order: &PublisherOrder) -> Result<()> {
        let stored = self
            .working
            .publisher_orders
            .get_mut(&order.id)
            .ok_or_else(|| StoreError::Corrupt(format!("publisher order {} vanished", order.id)))?;
        stored.status = order.status;
        stored.closed_at = order.closed_at;
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        *self.guard = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryUnitOfWork {
            guard,
            working,
            fail_on_order_insert: self.fail_on_order_insert.load(Ordering::SeqCst),
        })
    }

    async fn get_book(&self, isbn: &Isbn) -> Result<Option<Book>> {
        Ok(self.state.lock().await.books.get(isbn).cloned())
    }

    async fn upsert_book(&self, book: Book) -> Result<()> {
        self.state
            .lock()
            .await
            .books
            .insert(book.isbn.clone(), book);
        Ok(())
    }

    async fn set_book_price(&self, isbn: &Isbn, price: Money) -> Result<()> {
        if price.is_negative() {
            return Err(StoreError::Invalid(DomainError::InvalidPrice {
                cents: price.cents(),
            }));
        }
        let mut state = self.state.lock().await;
        let book = state
            .books
            .get_mut(isbn)
            .ok_or_else(|| StoreError::BookNotFound(isbn.clone()))?;
        book.unit_price = price;
        Ok(())
    }

    async fn low_stock_books(&self) -> Result<Vec<Book>> {
        let state = self.state.lock().await;
        Ok(state
            .books
            .values()
            .filter(|b| b.is_low_stock())
            .cloned()
            .collect())
    }

    async fn cart_lines(&self, customer_id: CustomerId) -> Result<Vec<CartLine>> {
        Ok(self.state.lock().await.cart_lines(customer_id))
    }

    async fn add_to_cart(
        &self,
        customer_id: CustomerId,
        line: CartLine,
    ) -> Result<Vec<CartLine>> {
        let line = CartLine::new(line.isbn, line.quantity)?;
        let mut state = self.state.lock().await;
        if !state.books.contains_key(&line.isbn) {
            return Err(StoreError::BookNotFound(line.isbn));
        }
        let quantity = state
            .carts
            .entry(customer_id)
            .or_default()
            .entry(line.isbn)
            .or_insert(0);
        *quantity = quantity.saturating_add(line.quantity);
        Ok(state.cart_lines(customer_id))
    }

    async fn remove_from_cart(&self, customer_id: CustomerId, isbn: &Isbn) -> Result<bool> {
        let mut state = self.state.lock().await;
        let Some(cart) = state.carts.get_mut(&customer_id) else {
            return Ok(false);
        };
        let removed = cart.remove(isbn).is_some();
        if cart.is_empty() {
            state.carts.remove(&customer_id);
        }
        Ok(removed)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        let mut orders: Vec<_> = state
            .orders
            .iter()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));
        Ok(orders)
    }

    async fn create_publisher_order(&self, order: &PublisherOrder) -> Result<()> {
        self.state
            .lock()
            .await
            .publisher_orders
            .insert(order.id, order.clone());
        Ok(())
    }

    async fn get_publisher_order(&self, id: PublisherOrderId) -> Result<Option<PublisherOrder>> {
        Ok(self.state.lock().await.publisher_orders.get(&id).cloned())
    }
}
