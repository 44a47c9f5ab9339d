//! Relational store boundary for the bookstore.
//!
//! [`Store`] exposes the catalog, cart, order and publisher-order collaborators.
//! Multi-step writes go through a [`UnitOfWork`] obtained from [`Store::begin`]:
//! it commits only when asked to and rolls back on every other exit path,
//! including being dropped.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryUnitOfWork};
pub use postgres::{PostgresStore, PostgresUnitOfWork};
pub use store::{Store, StoreExt, UnitOfWork};
