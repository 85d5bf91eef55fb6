//! Error types for the circulation engine

use thiserror::Error;

/// Stable error codes the API layer maps to user-visible statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    DbFailure = 1,
    NotFound = 2,
    Unavailable = 3,
    AlreadyReturned = 4,
    BadValue = 5,
}

/// Main application error type
///
/// Every engine-level failure is one of these typed outcomes; nothing is
/// retried internally and nothing is fatal to the process.
#[derive(Error, Debug)]
pub enum AppError {
    /// A book, record, or reservation identifier did not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// No copies free at borrow time
    #[error("Not available: {0}")]
    Unavailable(String),

    /// Duplicate return attempt on a borrowing record
    #[error("Already returned: {0}")]
    AlreadyReturned(String),

    /// Missing or malformed input, rejected before any mutation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    /// Code for the caller's status mapping
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Unavailable(_) => ErrorCode::Unavailable,
            AppError::AlreadyReturned(_) => ErrorCode::AlreadyReturned,
            AppError::InvalidInput(_) => ErrorCode::BadValue,
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ErrorCode::DbFailure
            }
        }
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AppError::NotFound("x".into()).code(), ErrorCode::NotFound);
        assert_eq!(
            AppError::Unavailable("x".into()).code(),
            ErrorCode::Unavailable
        );
        assert_eq!(
            AppError::AlreadyReturned("x".into()).code(),
            ErrorCode::AlreadyReturned
        );
        assert_eq!(
            AppError::InvalidInput("x".into()).code(),
            ErrorCode::BadValue
        );
        assert_eq!(ErrorCode::AlreadyReturned as u32, 4);
    }
}
