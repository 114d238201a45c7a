//! Result alias used across all LoadHub crates.

use crate::error::AppError;

/// Convenience alias for results carrying [`AppError`].
pub type AppResult<T> = Result<T, AppError>;
