//! Structured results of a reconciliation run.
//!
//! A run never fails as a whole; the report says what happened to each item
//! so callers can act on it, while logs remain the primary failure surface.

use std::fmt;

use chrono::{DateTime, Utc};
use gateway_sync_admin::Verdict;
use uuid::Uuid;

/// Phase an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Service upsert.
    Service,
    /// Route upserts.
    Route,
    /// JWT plugin attachment.
    Plugin,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Service => "service",
            Self::Route => "route",
            Self::Plugin => "plugin",
        })
    }
}

/// What happened to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// The gateway accepted the request.
    Applied,
    /// Nothing to do; the gateway already had it.
    AlreadyPresent,
    /// The request failed.
    Failed(Verdict),
}

/// Outcome of one item of a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    /// Phase of the item.
    pub phase: Phase,
    /// Service or route name.
    pub name: String,
    /// Result.
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub(crate) fn new(phase: Phase, name: impl Into<String>, status: ItemStatus) -> Self {
        Self {
            phase,
            name: name.into(),
            status,
        }
    }

    /// Whether the item did not fail.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        !matches!(self.status, ItemStatus::Failed(_))
    }
}

/// Why a run stopped before its last phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The service upsert failed and short-circuiting was enabled.
    ServiceFailed,
    /// A panic was caught at the run boundary.
    Panicked(String),
}

/// Result of one reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    /// Identifier of the run, also recorded on its tracing span.
    pub run_id: Uuid,
    /// Service that was reconciled.
    pub service_name: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Service phase outcome. `None` if the run never got that far.
    pub service: Option<ItemOutcome>,
    /// Route phase outcomes, in registry order.
    pub routes: Vec<ItemOutcome>,
    /// Plugin phase outcomes for authenticated routes, in registry order.
    pub plugins: Vec<ItemOutcome>,
    /// Set when the run stopped early.
    pub aborted: Option<AbortReason>,
}

impl ReconcileReport {
    pub(crate) fn empty(run_id: Uuid, service_name: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            service_name: service_name.to_string(),
            started_at,
            finished_at: started_at,
            service: None,
            routes: Vec::new(),
            plugins: Vec::new(),
            aborted: None,
        }
    }

    /// Every outcome, service first.
    pub fn outcomes(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.service
            .iter()
            .chain(self.routes.iter())
            .chain(self.plugins.iter())
    }

    /// Outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes().filter(|o| !o.is_ok())
    }

    /// Whether every phase ran and no item failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.aborted.is_none() && self.failures().next().is_none()
    }

    /// Wall-clock duration of the run.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
