//! Coordinator error types.

use delivery_store::StoreError;
use thiserror::Error;

/// Transport-facing error category.
///
/// A transport layer picks its response code from this, never from the
/// error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    ConstraintViolation,
    Unavailable,
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ConstraintViolation => "constraint_violation",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by coordinator operations.
///
/// Cache errors never appear here.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// A required field was missing or blank. Carries the field name.
    #[error("Invalid input: {0} is required")]
    InvalidInput(&'static str),

    /// An update targeted a delivery that does not exist.
    #[error("Delivery not found: {0}")]
    NotFound(String),

    /// The store did not answer within the configured bound.
    #[error("Store operation timed out")]
    Timeout,

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DeliveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeliveryError::InvalidInput(_) => ErrorKind::InvalidInput,
            DeliveryError::NotFound(_) => ErrorKind::NotFound,
            DeliveryError::Timeout => ErrorKind::Timeout,
            DeliveryError::Store(err) => match err {
                StoreError::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
                StoreError::Unavailable(_) => ErrorKind::Unavailable,
                StoreError::Timeout => ErrorKind::Timeout,
                StoreError::Migration(_) | StoreError::Database(_) | StoreError::Internal(_) => {
                    ErrorKind::Internal
                }
            },
        }
    }
}

/// Convenience type alias for coordinator results.
pub type Result<T> = std::result::Result<T, DeliveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_their_category() {
        let constraint = DeliveryError::from(StoreError::ConstraintViolation {
            constraint: Some("unique_tracking_number".to_string()),
            message: "duplicate".to_string(),
        });
        assert_eq!(constraint.kind(), ErrorKind::ConstraintViolation);

        let unavailable = DeliveryError::from(StoreError::Unavailable("refused".to_string()));
        assert_eq!(unavailable.kind(), ErrorKind::Unavailable);

        assert_eq!(
            DeliveryError::from(StoreError::Timeout).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            DeliveryError::from(StoreError::Internal("x".to_string())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn coordinator_errors_map_directly() {
        assert_eq!(
            DeliveryError::InvalidInput("order_id").kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            DeliveryError::NotFound("abc".to_string()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(DeliveryError::Timeout.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn invalid_input_names_the_field() {
        assert_eq!(
            DeliveryError::InvalidInput("status").to_string(),
            "Invalid input: status is required"
        );
    }
}
