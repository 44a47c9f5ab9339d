//! Domain layer for the bookstore.
//!
//! This crate provides the data model shared by the checkout and restock flows:
//! - `Book` catalog entries with stock and reorder threshold
//! - `CartLine` pre-purchase selections
//! - `Order` / `OrderLine` with prices frozen at purchase time
//! - `PublisherOrder` with its pending → confirmed/cancelled state machine
//! - card and shipping address validation

pub mod address;
pub mod book;
pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod payment;
pub mod publisher_order;

pub use address::{AddressError, ShippingAddress};
pub use book::Book;
pub use cart::CartLine;
pub use error::DomainError;
pub use money::Money;
pub use order::{Order, OrderLine, OrderStatus};
pub use payment::{CardError, PaymentInfo, validate_card};
pub use publisher_order::{PublisherOrder, PublisherOrderLine, PublisherOrderStatus};
