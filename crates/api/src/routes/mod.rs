//! HTTP handlers, one module per resource.

pub mod books;
pub mod carts;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod publisher_orders;

use uuid::Uuid;

use crate::error::ApiError;

/// Parses a path segment as a UUID, naming the resource in the error.
pub(crate) fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| ApiError::BadRequest(format!("Invalid {what} id: {e}")))
}
