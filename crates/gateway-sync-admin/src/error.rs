//! Error types for gateway admin calls.

use thiserror::Error;

use crate::types::AdminResponse;

/// A result type using `GatewayError`.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors returned by [`GatewayClient`](crate::GatewayClient) calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// No response was obtained (DNS, connection refused, timeout).
    #[error("gateway request failed: {0}")]
    Transport(String),

    /// The gateway answered with a status of 300 or above.
    #[error("gateway rejected request with status {}", .0.status)]
    Rejected(AdminResponse),

    /// The gateway answered successfully but the body could not be decoded.
    #[error("invalid gateway response (status {status}): {message}")]
    InvalidResponse {
        /// Status of the undecodable response.
        status: u16,
        /// Decoder error.
        message: String,
    },
}

impl GatewayError {
    /// The response carried by this error, if the gateway answered.
    #[must_use]
    pub const fn response(&self) -> Option<&AdminResponse> {
        match self {
            Self::Rejected(response) => Some(response),
            Self::Transport(_) | Self::InvalidResponse { .. } => None,
        }
    }

    /// Returns true if no response was received at all.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
