use thiserror::Error;

/// Errors that can occur when interacting with the delivery store.
///
/// A missing record is never an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness, foreign-key, or other integrity constraint was violated.
    #[error("Constraint violation ({}): {message}", .constraint.as_deref().unwrap_or("unnamed"))]
    ConstraintViolation {
        constraint: Option<String>,
        message: String,
    },

    /// The database could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The operation was cancelled by a timeout before it completed.
    #[error("Store operation timed out")]
    Timeout,

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Any other database error.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// An invariant of the stored data did not hold.
    #[error("Internal store error: {0}")]
    Internal(String),
}

// SQLSTATE class 23 is integrity_constraint_violation, class 08 is
// connection_exception, 57014 is query_canceled (statement_timeout).
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
                if code.starts_with("23") {
                    StoreError::ConstraintViolation {
                        constraint: db_err.constraint().map(str::to_owned),
                        message: db_err.message().to_owned(),
                    }
                } else if code.starts_with("08") || code == "57P01" {
                    StoreError::Unavailable(err.to_string())
                } else if code == "57014" {
                    StoreError::Timeout
                } else {
                    StoreError::Database(err)
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            _ => StoreError::Database(err),
        }
    }
}

/// Result type for delivery store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
