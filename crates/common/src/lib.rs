//! Identifier types shared by every layer of the bookstore.

pub mod types;

pub use types::{CustomerId, Isbn, OrderId, PublisherOrderId};
