use common::Isbn;
use domain::DomainError;
use thiserror::Error;

/// SQLSTATE codes for failures that a retry may resolve.
const DEADLOCK_DETECTED: &str = "40P01";
const SERIALIZATION_FAILURE: &str = "40001";
const LOCK_NOT_AVAILABLE: &str = "55P03";
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database aborted the transaction because of contention
    /// (deadlock, serialization failure or lock timeout). Nothing was committed.
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// A referenced book does not exist.
    #[error("Book not found: {0}")]
    BookNotFound(Isbn),

    /// A value was rejected by domain validation.
    #[error("Invalid data: {0}")]
    Invalid(#[from] DomainError),

    /// A stored value could not be mapped back into the domain.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && let Some(code) = db_err.code()
            && matches!(
                code.as_ref(),
                DEADLOCK_DETECTED | SERIALIZATION_FAILURE | LOCK_NOT_AVAILABLE
            )
        {
            return StoreError::Conflict(db_err.message().to_string());
        }
        StoreError::Database(err)
    }
}

/// Returns true if the database rejected a value that does not fit its column.
pub(crate) fn is_out_of_range(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err)
            if db_err.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE)
    )
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
