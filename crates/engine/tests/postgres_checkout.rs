//! Checkout and restock against a real PostgreSQL instance.
//!
//! ```bash
//! cargo test -p engine --test postgres_checkout
//! ```

use std::sync::Arc;

use common::{CustomerId, Isbn};
use domain::{
    Book, CartLine, Money, PaymentInfo, PublisherOrder, PublisherOrderLine, PublisherOrderStatus,
    ShippingAddress,
};
use engine::{CheckoutError, CheckoutRequest, OrderEngine, RestockEngine, RestockError};
use futures_util::future::join_all;
use sqlx::PgPool;
use store::{PostgresStore, Store, StoreExt};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();
            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let store = PostgresStore::new(PgPool::connect(&connection_string).await.unwrap());
            store.run_migrations().await.unwrap();
            store.pool().close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();
    PostgresStore::new(pool)
}

async fn seed_book(store: &PostgresStore, stock: u32) -> Isbn {
    let isbn = Isbn::new(format!("ISBN-{}", Uuid::new_v4().simple()));
    store
        .upsert_book(Book::new(isbn.clone(), "Seeded", Money::from_cents(1250), stock, 3).unwrap())
        .await
        .unwrap();
    isbn
}

async fn cart(store: &PostgresStore, lines: &[(&Isbn, u32)]) -> CustomerId {
    let customer = CustomerId::new();
    for (isbn, quantity) in lines {
        store
            .add_to_cart(customer, CartLine::new((*isbn).clone(), *quantity).unwrap())
            .await
            .unwrap();
    }
    customer
}

fn request(customer_id: CustomerId) -> CheckoutRequest {
    CheckoutRequest::new(
        customer_id,
        PaymentInfo::new("5555555555554444", "01/2031", "321"),
        ShippingAddress::new("Sam Page", "9 Elm Rd", "Portland", "97201", "US"),
    )
}

#[tokio::test]
async fn checkout_commits_order_and_clears_cart() {
    let store = get_test_store().await;
    let b1 = seed_book(&store, 5).await;
    let b2 = seed_book(&store, 4).await;
    let customer = cart(&store, &[(&b1, 2), (&b2, 1)]).await;
    let engine = OrderEngine::new(store.clone());

    let order = engine.checkout(request(customer)).await.unwrap();

    assert_eq!(order.total, Money::from_cents(3750));
    assert_eq!(order.payment_reference, "**** **** **** 4444");
    assert!(store.cart_lines(customer).await.unwrap().is_empty());
    assert_eq!(store.stock_of(&b1).await.unwrap(), Some(3));
    assert_eq!(store.stock_of(&b2).await.unwrap(), Some(3));
    let stored = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.lines, order.lines);
    assert_eq!(stored.total, order.total);
    assert_eq!(stored.customer_id, customer);
}

#[tokio::test]
async fn failed_line_rolls_back_earlier_decrements() {
    let store = get_test_store().await;
    let b1 = seed_book(&store, 5).await;
    let b2 = seed_book(&store, 0).await;
    let customer = cart(&store, &[(&b1, 2), (&b2, 1)]).await;
    let engine = OrderEngine::new(store.clone());

    let err = engine.checkout(request(customer)).await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::InsufficientStock { ref isbn, requested: 1, available: 0 } if *isbn == b2
    ));
    assert_eq!(store.stock_of(&b1).await.unwrap(), Some(5));
    assert_eq!(store.cart_lines(customer).await.unwrap().len(), 2);
    assert!(store.orders_for_customer(customer).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleted_book_in_cart_is_unavailable() {
    let store = get_test_store().await;
    let b1 = seed_book(&store, 5).await;
    let customer = cart(&store, &[(&b1, 1)]).await;
    sqlx::query("DELETE FROM books WHERE isbn = $1")
        .bind(b1.as_str())
        .execute(store.pool())
        .await
        .unwrap();

    let err = OrderEngine::new(store.clone())
        .checkout(request(customer))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::InsufficientStock { requested: 1, available: 0, .. }
    ));
    assert_eq!(store.cart_lines(customer).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_never_oversell() {
    let store = get_test_store().await;
    let b1 = seed_book(&store, 5).await;
    let b2 = seed_book(&store, 100).await;

    // Half the carts list the books in one order, half in the other, so an
    // unordered locker would deadlock.
    let mut customers = Vec::new();
    for i in 0..10 {
        let lines = if i % 2 == 0 {
            [(&b1, 1), (&b2, 1)]
        } else {
            [(&b2, 1), (&b1, 1)]
        };
        customers.push(cart(&store, &lines).await);
    }

    let engine = Arc::new(OrderEngine::new(store.clone()));
    let tasks = customers.into_iter().map(|customer| {
        let engine = engine.clone();
        tokio::spawn(async move { engine.checkout(request(customer)).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let accepted = results.iter().filter(|r| r.is_ok()).count() as u32;
    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(err, CheckoutError::InsufficientStock { .. }),
                "unexpected error: {err}"
            );
        }
    }

    assert_eq!(accepted, 5);
    assert_eq!(store.stock_of(&b1).await.unwrap(), Some(0));
    assert_eq!(store.stock_of(&b2).await.unwrap(), Some(100 - accepted));
}

#[tokio::test]
async fn confirm_restocks_exactly_once() {
    let store = get_test_store().await;
    let b1 = seed_book(&store, 2).await;
    let order = PublisherOrder::new(
        "Orbit",
        vec![PublisherOrderLine::new(b1.clone(), 10, Money::from_cents(600))],
        chrono::Utc::now(),
    )
    .unwrap();
    store.create_publisher_order(&order).await.unwrap();
    let engine = RestockEngine::new(store.clone());

    let confirmed = engine.confirm(order.id).await.unwrap();
    assert_eq!(confirmed.status, PublisherOrderStatus::Confirmed);
    assert_eq!(store.stock_of(&b1).await.unwrap(), Some(12));

    assert!(matches!(
        engine.confirm(order.id).await.unwrap_err(),
        RestockError::NotPending { .. }
    ));
    assert_eq!(store.stock_of(&b1).await.unwrap(), Some(12));
    assert_eq!(
        store.get_publisher_order(order.id).await.unwrap().unwrap().status,
        PublisherOrderStatus::Confirmed
    );
}
