//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;
use uuid::Uuid;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> axum::Router {
    setup_with_state().0
}

fn setup_with_state() -> (axum::Router, Arc<api::AppState<InMemoryStore>>) {
    let state = api::AppState::new(InMemoryStore::new(), 0);
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn put_book(app: &axum::Router, isbn: &str, stock: u32, price_cents: i64) {
    let (status, _) = send(
        app,
        "PUT",
        &format!("/books/{isbn}"),
        Some(json!({
            "title": format!("Title {isbn}"),
            "unit_price_cents": price_cents,
            "stock": stock,
            "reorder_threshold": 3
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn add_to_cart(app: &axum::Router, customer: Uuid, isbn: &str, quantity: u32) -> StatusCode {
    send(
        app,
        "POST",
        &format!("/customers/{customer}/cart"),
        Some(json!({ "isbn": isbn, "quantity": quantity })),
    )
    .await
    .0
}

fn checkout_body() -> Value {
    json!({
        "payment": {
            "card_number": "4111 1111 1111 1111",
            "expiry": "12/2030",
            "cvv": "123"
        },
        "shipping": {
            "recipient": "Jo Reader",
            "street": "1 Main St",
            "city": "Springfield",
            "postal_code": "12345",
            "country": "US"
        }
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_upsert_and_get_book() {
    let app = setup();
    put_book(&app, "978-0441013593", 5, 1099).await;

    let (status, json) = send(&app, "GET", "/books/978-0441013593", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Title 978-0441013593");
    assert_eq!(json["unit_price_cents"], 1099);
    assert_eq!(json["stock"], 5);
    assert_eq!(json["low_stock"], false);
}

#[tokio::test]
async fn test_invalid_book_is_rejected() {
    let app = setup();

    let (status, json) = send(
        &app,
        "PUT",
        "/books/B1",
        Some(json!({
            "title": "Bad",
            "unit_price_cents": -5,
            "stock": 1,
            "reorder_threshold": 1
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_get_nonexistent_book() {
    let app = setup();

    let (status, _) = send(&app, "GET", "/books/missing", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_low_stock_listing() {
    let app = setup();
    put_book(&app, "B1", 1, 500).await;
    put_book(&app, "B2", 10, 500).await;

    let (status, json) = send(&app, "GET", "/books/low-stock", None).await;

    assert_eq!(status, StatusCode::OK);
    let books = json.as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["isbn"], "B1");
    assert_eq!(books[0]["low_stock"], true);
}

#[tokio::test]
async fn test_cart_add_merge_and_remove() {
    let app = setup();
    put_book(&app, "B1", 5, 500).await;
    let customer = Uuid::new_v4();

    assert_eq!(add_to_cart(&app, customer, "B1", 1).await, StatusCode::OK);
    assert_eq!(add_to_cart(&app, customer, "B1", 2).await, StatusCode::OK);

    let (status, json) = send(&app, "GET", &format!("/customers/{customer}/cart"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["lines"][0]["isbn"], "B1");
    assert_eq!(json["lines"][0]["quantity"], 3);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/customers/{customer}/cart/B1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/customers/{customer}/cart/B1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_rejects_unknown_book_and_zero_quantity() {
    let app = setup();
    put_book(&app, "B1", 5, 500).await;
    let customer = Uuid::new_v4();

    assert_eq!(
        add_to_cart(&app, customer, "NOPE", 1).await,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        add_to_cart(&app, customer, "B1", 0).await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_checkout_creates_order_and_empties_cart() {
    let (app, state) = setup_with_state();
    put_book(&app, "B1", 5, 1000).await;
    put_book(&app, "B2", 2, 250).await;
    let customer = Uuid::new_v4();
    add_to_cart(&app, customer, "B1", 2).await;
    add_to_cart(&app, customer, "B2", 1).await;

    let (status, order) = send(
        &app,
        "POST",
        &format!("/customers/{customer}/checkout"),
        Some(checkout_body()),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "Processing");
    assert_eq!(order["total_cents"], 2250);
    assert_eq!(order["payment_reference"], "**** **** **** 1111");
    assert_eq!(order["lines"].as_array().unwrap().len(), 2);

    let (_, cart) = send(&app, "GET", &format!("/customers/{customer}/cart"), None).await;
    assert!(cart["lines"].as_array().unwrap().is_empty());

    let order_id = order["id"].as_str().unwrap();
    let (status, fetched) = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["total_cents"], 2250);

    let (_, history) = send(&app, "GET", &format!("/customers/{customer}/orders"), None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    assert_eq!(state.store.order_count().await, 1);
    let (_, book) = send(&app, "GET", "/books/B1", None).await;
    assert_eq!(book["stock"], 3);
}

#[tokio::test]
async fn test_checkout_insufficient_stock_reports_line() {
    let app = setup();
    put_book(&app, "B1", 5, 1000).await;
    put_book(&app, "B2", 0, 250).await;
    let customer = Uuid::new_v4();
    add_to_cart(&app, customer, "B1", 2).await;
    add_to_cart(&app, customer, "B2", 1).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/customers/{customer}/checkout"),
        Some(checkout_body()),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["isbn"], "B2");
    assert_eq!(json["requested"], 1);
    assert_eq!(json["available"], 0);

    let (_, book) = send(&app, "GET", "/books/B1", None).await;
    assert_eq!(book["stock"], 5);
    let (_, cart) = send(&app, "GET", &format!("/customers/{customer}/cart"), None).await;
    assert_eq!(cart["lines"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_checkout_rejects_bad_card_and_empty_cart() {
    let app = setup();
    put_book(&app, "B1", 5, 1000).await;
    let customer = Uuid::new_v4();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/customers/{customer}/checkout"),
        Some(checkout_body()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    add_to_cart(&app, customer, "B1", 1).await;
    let mut body = checkout_body();
    body["payment"]["card_number"] = json!("4111 1111 1111 1112");
    let (status, json) = send(
        &app,
        "POST",
        &format!("/customers/{customer}/checkout"),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("payment"));

    let (_, book) = send(&app, "GET", "/books/B1", None).await;
    assert_eq!(book["stock"], 5);
}

#[tokio::test]
async fn test_price_change_leaves_order_untouched() {
    let app = setup();
    put_book(&app, "B1", 5, 1000).await;
    let customer = Uuid::new_v4();
    add_to_cart(&app, customer, "B1", 1).await;
    let (_, order) = send(
        &app,
        "POST",
        &format!("/customers/{customer}/checkout"),
        Some(checkout_body()),
    )
    .await;

    let (status, book) = send(
        &app,
        "PUT",
        "/books/B1/price",
        Some(json!({ "unit_price_cents": 1500 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["unit_price_cents"], 1500);

    let order_id = order["id"].as_str().unwrap();
    let (_, fetched) = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(fetched["lines"][0]["unit_price_cents"], 1000);
}

#[tokio::test]
async fn test_publisher_order_lifecycle() {
    let app = setup();
    put_book(&app, "B1", 2, 1000).await;

    let (status, created) = send(
        &app,
        "POST",
        "/publisher-orders",
        Some(json!({
            "publisher": "Ace Books",
            "lines": [{ "isbn": "B1", "quantity": 10, "unit_cost_cents": 600 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "Pending");
    assert_eq!(created["total_cost_cents"], 6000);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, confirmed) = send(&app, "POST", &format!("/publisher-orders/{id}/confirm"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "Confirmed");
    assert!(confirmed["closed_at"].as_str().is_some());

    let (_, book) = send(&app, "GET", "/books/B1", None).await;
    assert_eq!(book["stock"], 12);

    let (status, json) = send(&app, "POST", &format!("/publisher-orders/{id}/confirm"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], "Confirmed");

    let (status, _) = send(&app, "POST", &format!("/publisher-orders/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, book) = send(&app, "GET", "/books/B1", None).await;
    assert_eq!(book["stock"], 12);
}

#[tokio::test]
async fn test_publisher_order_cancel() {
    let app = setup();
    put_book(&app, "B1", 2, 1000).await;
    let (_, created) = send(
        &app,
        "POST",
        "/publisher-orders",
        Some(json!({
            "publisher": "Ace Books",
            "lines": [{ "isbn": "B1", "quantity": 4, "unit_cost_cents": 600 }]
        })),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, cancelled) = send(&app, "POST", &format!("/publisher-orders/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "Cancelled");

    let (_, fetched) = send(&app, "GET", &format!("/publisher-orders/{id}"), None).await;
    assert_eq!(fetched["status"], "Cancelled");
    let (_, book) = send(&app, "GET", "/books/B1", None).await;
    assert_eq!(book["stock"], 2);
}

#[tokio::test]
async fn test_publisher_order_validation() {
    let app = setup();

    let (status, _) = send(
        &app,
        "POST",
        "/publisher-orders",
        Some(json!({ "publisher": "Ace Books", "lines": [] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_and_malformed_ids() {
    let app = setup();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/publisher-orders/{}/confirm", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", &format!("/orders/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(&app, "GET", "/orders/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Invalid order id"));

    let (status, _) = send(&app, "GET", "/customers/42/cart", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    put_book(&app, "B1", 5, 1000).await;
    let customer = Uuid::new_v4();
    add_to_cart(&app, customer, "B1", 1).await;
    send(
        &app,
        "POST",
        &format!("/customers/{customer}/checkout"),
        Some(checkout_body()),
    )
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("checkouts_total"));
    assert!(text.contains("books_below_reorder_threshold"));
}

#[tokio::test]
async fn test_checkout_total_overflow_is_rejected() {
    let app = setup();
    put_book(&app, "B1", 10, 4_000_000_000_000_000_000).await;
    let customer = Uuid::new_v4();
    add_to_cart(&app, customer, "B1", 3).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/customers/{customer}/checkout"),
        Some(checkout_body()),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("Amount overflow"));
    let (_, book) = send(&app, "GET", "/books/B1", None).await;
    assert_eq!(book["stock"], 10);
    let (_, cart) = send(&app, "GET", &format!("/customers/{customer}/cart"), None).await;
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_publisher_order_cost_overflow_is_rejected() {
    let app = setup();
    put_book(&app, "B1", 1, 1000).await;

    let (status, json) = send(
        &app,
        "POST",
        "/publisher-orders",
        Some(json!({
            "publisher": "Ace Books",
            "lines": [{ "isbn": "B1", "quantity": 3, "unit_cost_cents": 4_000_000_000_000_000_000i64 }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Amount overflow"));
}
