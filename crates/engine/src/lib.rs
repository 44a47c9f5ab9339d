//! Checkout-to-inventory consistency engine.
//!
//! Three cooperating pieces keep book stock consistent with orders:
//! 1. [`InventoryLedger`] - the only writer of stock; atomic check-and-decrement
//!    and all-or-nothing increments inside a caller-owned transaction
//! 2. [`OrderEngine`] - cart → order: validates payment, reserves stock,
//!    persists the order and clears the cart as one unit of work
//! 3. [`RestockEngine`] - confirms or cancels pending publisher orders,
//!    restocking on confirmation
//!
//! Every multi-step write either commits completely or leaves no trace.

pub mod checkout;
pub mod error;
pub mod ledger;
pub mod restock;

pub use checkout::{CheckoutRequest, OrderEngine};
pub use error::{CheckoutError, IncrementError, ReserveError, RestockError};
pub use ledger::{InventoryLedger, Reservation, StockLine};
pub use restock::RestockEngine;
