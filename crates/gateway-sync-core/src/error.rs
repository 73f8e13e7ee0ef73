//! Error types for route declarations.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while declaring routes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The HTTP method is not one the gateway accepts.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// A route was declared without a name.
    #[error("route name must not be empty")]
    EmptyRouteName,
}
