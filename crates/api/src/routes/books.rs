//! Catalog endpoints: lookup, low-stock dashboard and admin edits.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::Isbn;
use domain::{Book, Money};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UpsertBookRequest {
    pub title: String,
    pub unit_price_cents: i64,
    pub stock: u32,
    pub reorder_threshold: u32,
}

#[derive(Deserialize)]
pub struct SetPriceRequest {
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct BookResponse {
    pub isbn: String,
    pub title: String,
    pub unit_price_cents: i64,
    pub stock: u32,
    pub reorder_threshold: u32,
    pub low_stock: bool,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            low_stock: book.is_low_stock(),
            isbn: book.isbn.to_string(),
            title: book.title,
            unit_price_cents: book.unit_price.cents(),
            stock: book.stock,
            reorder_threshold: book.reorder_threshold,
        }
    }
}

/// GET /books/{isbn}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(isbn): Path<String>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = state
        .store
        .get_book(&Isbn::new(isbn.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book {isbn} not found")))?;
    Ok(Json(book.into()))
}

/// GET /books/low-stock: books below their reorder threshold.
#[tracing::instrument(skip(state))]
pub async fn low_stock<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let books = state.store.low_stock_books().await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// PUT /books/{isbn}: creates or replaces a catalog entry, stock included.
#[tracing::instrument(skip(state, req))]
pub async fn upsert<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(isbn): Path<String>,
    Json(req): Json<UpsertBookRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = Book::new(
        isbn,
        req.title,
        Money::from_cents(req.unit_price_cents),
        req.stock,
        req.reorder_threshold,
    )?;
    state.store.upsert_book(book.clone()).await?;
    Ok(Json(book.into()))
}

/// PUT /books/{isbn}/price: reprices a book. Placed orders keep their price.
#[tracing::instrument(skip(state, req))]
pub async fn set_price<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(isbn): Path<String>,
    Json(req): Json<SetPriceRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    let isbn = Isbn::new(isbn);
    state
        .store
        .set_book_price(&isbn, Money::from_cents(req.unit_price_cents))
        .await?;
    let book = state
        .store
        .get_book(&isbn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book {isbn} not found")))?;
    Ok(Json(book.into()))
}
