//! Classification of admin API outcomes.
//!
//! [`classify`] turns a response, or the lack of one, into a [`Verdict`]: a
//! success flag, the severity the outcome should be logged at, and a
//! human-readable diagnostic. It is pure and never fails.

use std::fmt;

use crate::error::GatewayError;
use crate::types::AdminResponse;

/// Log level an outcome should be reported at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Successful call.
    Info,
    /// The gateway answered but refused the request.
    Warn,
    /// No usable response.
    Error,
}

/// Outcome of classifying an admin API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Log level for the diagnostic.
    pub severity: Severity,
    /// Human-readable description of the outcome.
    pub diagnostic: String,
}

impl Verdict {
    fn new(ok: bool, severity: Severity, diagnostic: impl Into<String>) -> Self {
        Self {
            ok,
            severity,
            diagnostic: diagnostic.into(),
        }
    }

    /// Emit the diagnostic at the verdict's severity.
    pub fn log(&self, operation: &str, item: &str) {
        match self.severity {
            Severity::Info => {
                tracing::info!(operation, item, "{}", self.diagnostic);
            }
            Severity::Warn => {
                tracing::warn!(operation, item, "{}", self.diagnostic);
            }
            Severity::Error => {
                tracing::error!(operation, item, "{}", self.diagnostic);
            }
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic)
    }
}

/// Classify a response; `None` means no response was received.
#[must_use]
pub fn classify(response: Option<&AdminResponse>) -> Verdict {
    let Some(response) = response else {
        return Verdict::new(false, Severity::Error, "no response received from gateway");
    };

    match response.status {
        status if status < 300 => Verdict::new(
            true,
            Severity::Info,
            format!("gateway responded with success status {status}"),
        ),
        400 => Verdict::new(false, Severity::Warn, "bad request sent to gateway"),
        404 => Verdict::new(
            false,
            Severity::Warn,
            "gateway endpoint not found; check the admin URL or gateway configuration",
        ),
        status => Verdict::new(
            false,
            Severity::Warn,
            format!("gateway returned status {status}: {}", response.body),
        ),
    }
}

impl GatewayError {
    /// Classify this error.
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::Transport(_) | Self::Rejected(_) => classify(self.response()),
            Self::InvalidResponse { status, message } => Verdict::new(
                false,
                Severity::Error,
                format!("undecodable gateway response with status {status}: {message}"),
            ),
        }
    }
}
