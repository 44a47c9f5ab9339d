use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, Isbn, OrderId, PublisherOrderId};
use domain::{
    Book, CartLine, DomainError, Money, Order, OrderLine, OrderStatus, PublisherOrder,
    PublisherOrderLine, PublisherOrderStatus, ShippingAddress,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    error::is_out_of_range,
    store::{Store, UnitOfWork},
};

const BOOK_COLUMNS: &str = "isbn, title, unit_price_cents, stock, reorder_threshold";

const ORDER_COLUMNS: &str = "id, customer_id, placed_at, total_cents, payment_reference, \
     ship_recipient, ship_street, ship_city, ship_postal_code, ship_country, status";

/// PostgreSQL-backed store implementation.
///
/// Stock checks rely on row locks (`SELECT ... FOR UPDATE`) plus a conditional
/// `UPDATE` that never lets stock drop below zero.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: None,
        }
    }

    /// Bounds how long a transaction waits for a row lock before failing with
    /// a retryable conflict.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    async fn load_order_lines(
        &self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<OrderLine>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, isbn, title, quantity, unit_price_cents
            FROM order_lines
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            let order_id: Uuid = row.try_get("order_id")?;
            lines.entry(order_id).or_default().push(OrderLine {
                isbn: Isbn::new(row.try_get::<String, _>("isbn")?),
                title: row.try_get("title")?,
                quantity: to_u32(row.try_get("quantity")?, "order_lines.quantity")?,
                unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            });
        }
        Ok(lines)
    }
}

fn to_u32(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} is negative: {value}")))
}

fn to_i32(value: u32, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{what} out of range: {value}")))
}

fn row_to_book(row: &PgRow) -> Result<Book> {
    Ok(Book {
        isbn: Isbn::new(row.try_get::<String, _>("isbn")?),
        title: row.try_get("title")?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        stock: to_u32(row.try_get("stock")?, "books.stock")?,
        reorder_threshold: to_u32(row.try_get("reorder_threshold")?, "books.reorder_threshold")?,
    })
}

fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id")?),
        customer_id: CustomerId::from_uuid(row.try_get("customer_id")?),
        placed_at: row.try_get("placed_at")?,
        total: Money::from_cents(row.try_get("total_cents")?),
        payment_reference: row.try_get("payment_reference")?,
        shipping: ShippingAddress {
            recipient: row.try_get("ship_recipient")?,
            street: row.try_get("ship_street")?,
            city: row.try_get("ship_city")?,
            postal_code: row.try_get("ship_postal_code")?,
            country: row.try_get("ship_country")?,
        },
        status: OrderStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown order status {status}")))?,
        lines,
    })
}

fn row_to_cart_line(row: &PgRow) -> Result<CartLine> {
    Ok(CartLine {
        isbn: Isbn::new(row.try_get::<String, _>("isbn")?),
        quantity: to_u32(row.try_get("quantity")?, "cart_lines.quantity")?,
    })
}

fn row_to_publisher_order(row: &PgRow, lines: Vec<PublisherOrderLine>) -> Result<PublisherOrder> {
    let status: String = row.try_get("status")?;
    Ok(PublisherOrder {
        id: PublisherOrderId::from_uuid(row.try_get("id")?),
        publisher: row.try_get("publisher")?,
        status: PublisherOrderStatus::parse(&status).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown publisher order status {status}"))
        })?,
        lines,
        created_at: row.try_get("created_at")?,
        closed_at: row.try_get::<Option<DateTime<Utc>>, _>("closed_at")?,
    })
}

async fn fetch_publisher_order_lines<'e, E>(
    executor: E,
    id: PublisherOrderId,
) -> Result<Vec<PublisherOrderLine>>
where
    E: sqlx::postgres::PgExecutor<'e>,
{
    let rows = sqlx::query(
        r#"
        SELECT isbn, quantity, unit_cost_cents
        FROM publisher_order_lines
        WHERE publisher_order_id = $1
        ORDER BY line_no ASC
        "#,
    )
    .bind(id.as_uuid())
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|row| -> Result<PublisherOrderLine> {
            Ok(PublisherOrderLine {
                isbn: Isbn::new(row.try_get::<String, _>("isbn")?),
                quantity: to_u32(row.try_get("quantity")?, "publisher_order_lines.quantity")?,
                unit_cost: Money::from_cents(row.try_get("unit_cost_cents")?),
            })
        })
        .collect()
}

/// Transaction over a [`PostgresStore`].
///
/// Wraps a `sqlx` transaction, which rolls back when dropped uncommitted.
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn lock_book(&mut self, isbn: &Isbn) -> Result<Option<Book>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE isbn = $1 FOR UPDATE"
        ))
        .bind(isbn.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_book).transpose()
    }

    #[tracing::instrument(level = "debug", skip(self, isbn), fields(isbn = %isbn))]
    async fn adjust_stock(&mut self, isbn: &Isbn, delta: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET stock = stock + $2::BIGINT
            WHERE isbn = $1 AND stock + $2::BIGINT >= 0
            "#,
        )
        .bind(isbn.as_str())
        .bind(delta)
        .execute(&mut *self.tx)
        .await
        .map_err(|err| {
            if is_out_of_range(&err) {
                StoreError::Invalid(DomainError::StockOverflow {
                    isbn: isbn.clone(),
                    quantity: delta,
                })
            } else {
                err.into()
            }
        })?;

        Ok(result.rows_affected())
    }

    async fn cart_lines(&mut self, customer_id: CustomerId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            "SELECT isbn, quantity FROM cart_lines WHERE customer_id = $1 ORDER BY isbn FOR UPDATE",
        )
        .bind(customer_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_cart_line).collect()
    }

    async fn clear_cart(&mut self, customer_id: CustomerId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE customer_id = $1")
            .bind(customer_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(order.placed_at)
        .bind(order.total.cents())
        .bind(&order.payment_reference)
        .bind(&order.shipping.recipient)
        .bind(&order.shipping.street)
        .bind(&order.shipping.city)
        .bind(&order.shipping.postal_code)
        .bind(&order.shipping.country)
        .bind(order.status.as_str())
        .execute(&mut *self.tx)
        .await?;

        for (line_no, line) in order.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, line_no, isbn, title, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(line_no as i32)
            .bind(line.isbn.as_str())
            .bind(&line.title)
            .bind(to_i32(line.quantity, "quantity")?)
            .bind(line.unit_price.cents())
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn lock_publisher_order(
        &mut self,
        id: PublisherOrderId,
    ) -> Result<Option<PublisherOrder>> {
        let row = sqlx::query(
            r#"
            SELECT id, publisher, status, created_at, closed_at
            FROM publisher_orders
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let lines = fetch_publisher_order_lines(&mut *self.tx, id).await?;
        row_to_publisher_order(&row, lines).map(Some)
    }

    async fn update_publisher_order_status(&mut self, order: &PublisherOrder) -> Result<()> {
        sqlx::query("UPDATE publisher_orders SET status = $2, closed_at = $3 WHERE id = $1")
            .bind(order.id.as_uuid())
            .bind(order.status.as_str())
            .bind(order.closed_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx> {
        let mut tx = self.pool.begin().await?;
        if let Some(timeout) = self.lock_timeout {
            sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis()))
                .execute(&mut *tx)
                .await?;
        }
        Ok(PostgresUnitOfWork { tx })
    }

    async fn get_book(&self, isbn: &Isbn) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE isbn = $1"))
            .bind(isbn.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_book).transpose()
    }

    #[tracing::instrument(skip(self, book), fields(isbn = %book.isbn, stock = book.stock))]
    async fn upsert_book(&self, book: Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (isbn, title, unit_price_cents, stock, reorder_threshold)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (isbn) DO UPDATE
            SET title = EXCLUDED.title,
                unit_price_cents = EXCLUDED.unit_price_cents,
                stock = EXCLUDED.stock,
                reorder_threshold = EXCLUDED.reorder_threshold
            "#,
        )
        .bind(book.isbn.as_str())
        .bind(&book.title)
        .bind(book.unit_price.cents())
        .bind(to_i32(book.stock, "stock")?)
        .bind(to_i32(book.reorder_threshold, "reorder_threshold")?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_book_price(&self, isbn: &Isbn, price: Money) -> Result<()> {
        if price.is_negative() {
            return Err(StoreError::Invalid(DomainError::InvalidPrice {
                cents: price.cents(),
            }));
        }
        let result = sqlx::query("UPDATE books SET unit_price_cents = $2 WHERE isbn = $1")
            .bind(isbn.as_str())
            .bind(price.cents())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::BookNotFound(isbn.clone()));
        }
        Ok(())
    }

    async fn low_stock_books(&self) -> Result<Vec<Book>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE stock < reorder_threshold ORDER BY isbn"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_book).collect()
    }

    async fn cart_lines(&self, customer_id: CustomerId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            "SELECT isbn, quantity FROM cart_lines WHERE customer_id = $1 ORDER BY isbn",
        )
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_cart_line).collect()
    }

    async fn add_to_cart(
        &self,
        customer_id: CustomerId,
        line: CartLine,
    ) -> Result<Vec<CartLine>> {
        let line = CartLine::new(line.isbn, line.quantity)?;
        if self.get_book(&line.isbn).await?.is_none() {
            return Err(StoreError::BookNotFound(line.isbn));
        }

        sqlx::query(
            r#"
            INSERT INTO cart_lines (customer_id, isbn, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (customer_id, isbn) DO UPDATE
            SET quantity = cart_lines.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(customer_id.as_uuid())
        .bind(line.isbn.as_str())
        .bind(to_i32(line.quantity, "quantity")?)
        .execute(&self.pool)
        .await?;

        self.cart_lines(customer_id).await
    }

    async fn remove_from_cart(&self, customer_id: CustomerId, isbn: &Isbn) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE customer_id = $1 AND isbn = $2")
            .bind(customer_id.as_uuid())
            .bind(isbn.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut lines = self.load_order_lines(&[id.as_uuid()]).await?;
        let lines = lines.remove(&id.as_uuid()).unwrap_or_default();
        row_to_order(&row, lines).map(Some)
    }

    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = $1 ORDER BY placed_at DESC"
        ))
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut lines = self.load_order_lines(&ids).await?;

        rows.iter()
            .zip(ids)
            .map(|(row, id)| row_to_order(row, lines.remove(&id).unwrap_or_default()))
            .collect()
    }

    async fn create_publisher_order(&self, order: &PublisherOrder) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO publisher_orders (id, publisher, status, created_at, closed_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.publisher)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.closed_at)
        .execute(&mut *tx)
        .await?;

        for (line_no, line) in order.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO publisher_order_lines (publisher_order_id, line_no, isbn, quantity, unit_cost_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(line_no as i32)
            .bind(line.isbn.as_str())
            .bind(to_i32(line.quantity, "quantity")?)
            .bind(line.unit_cost.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_publisher_order(&self, id: PublisherOrderId) -> Result<Option<PublisherOrder>> {
        let row = sqlx::query(
            "SELECT id, publisher, status, created_at, closed_at FROM publisher_orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let lines = fetch_publisher_order_lines(&self.pool, id).await?;
        row_to_publisher_order(&row, lines).map(Some)
    }
}
