//! Application-wide error types.
//!
//! Every engine operation returns a tagged [`EngineError`] instead of leaking
//! storage exceptions across layers. The external caller translates the tag
//! into a transport response via [`EngineError::status_code`] and
//! [`EngineError::error_code`].

use thiserror::Error;

/// Result type alias using `EngineError`.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error taxonomy.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input (missing fields, non-positive required quantity).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced document or entity is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A ledger rollback or debit would drive a balance negative.
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    /// A new line or document references an archived resource, unit, or client.
    #[error("Archived reference: {0}")]
    ArchivedReference(String),

    /// Deletion blocked by existing references.
    #[error("In use: {0}")]
    InUse(String),

    /// Operation not legal in the document's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Conflict (duplicate number or name, concurrent modification).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Returns the transport status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::InsufficientStock(_)
            | Self::ArchivedReference(_)
            | Self::InUse(_)
            | Self::InvalidState(_) => 422,
            Self::Conflict(_) => 409,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            Self::ArchivedReference(_) => "ARCHIVED_REFERENCE",
            Self::InUse(_) => "IN_USE",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the caller may simply resubmit the operation.
    ///
    /// Only concurrent-write conflicts qualify; business-rule failures require
    /// a changed request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(EngineError::Validation(String::new()).status_code(), 400);
        assert_eq!(EngineError::NotFound(String::new()).status_code(), 404);
        assert_eq!(
            EngineError::InsufficientStock(String::new()).status_code(),
            422
        );
        assert_eq!(
            EngineError::ArchivedReference(String::new()).status_code(),
            422
        );
        assert_eq!(EngineError::InUse(String::new()).status_code(), 422);
        assert_eq!(EngineError::InvalidState(String::new()).status_code(), 422);
        assert_eq!(EngineError::Conflict(String::new()).status_code(), 409);
        assert_eq!(EngineError::Database(String::new()).status_code(), 500);
        assert_eq!(EngineError::Internal(String::new()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            EngineError::Validation(String::new()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            EngineError::NotFound(String::new()).error_code(),
            "NOT_FOUND"
        );
        assert_eq!(
            EngineError::InsufficientStock(String::new()).error_code(),
            "INSUFFICIENT_STOCK"
        );
        assert_eq!(
            EngineError::ArchivedReference(String::new()).error_code(),
            "ARCHIVED_REFERENCE"
        );
        assert_eq!(EngineError::InUse(String::new()).error_code(), "IN_USE");
        assert_eq!(
            EngineError::InvalidState(String::new()).error_code(),
            "INVALID_STATE"
        );
        assert_eq!(EngineError::Conflict(String::new()).error_code(), "CONFLICT");
        assert_eq!(
            EngineError::Database(String::new()).error_code(),
            "DATABASE_ERROR"
        );
        assert_eq!(
            EngineError::Internal(String::new()).error_code(),
            "INTERNAL_ERROR"
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            EngineError::InsufficientStock("balance 70 < requested 150".into()).to_string(),
            "Insufficient stock: balance 70 < requested 150"
        );
        assert_eq!(
            EngineError::InvalidState("already signed".into()).to_string(),
            "Invalid state: already signed"
        );
        assert_eq!(
            EngineError::Conflict("number R-001 exists".into()).to_string(),
            "Conflict: number R-001 exists"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(EngineError::Conflict(String::new()).is_retryable());
        assert!(!EngineError::InsufficientStock(String::new()).is_retryable());
        assert!(!EngineError::Validation(String::new()).is_retryable());
    }
}
