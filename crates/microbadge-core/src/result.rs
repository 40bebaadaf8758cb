//! Convenience result type alias for MicroBadge.

use crate::error::AppError;

/// A specialized `Result` type for MicroBadge operations.
pub type AppResult<T> = Result<T, AppError>;
