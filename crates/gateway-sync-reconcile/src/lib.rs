//! Route reconciliation against a gateway admin API.
//!
//! This crate converges a gateway onto the routes declared in a
//! [`RouteRegistry`](gateway_sync_core::RouteRegistry). Convergence is
//! additive: routes are created or replaced, never deleted.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     RouteRegistry                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Reconciler                            │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────────┐    │
//! │  │  Service    │──▶│   Routes    │──▶│   JWT plugins   │    │
//! │  │  upsert     │   │  (fan-out)  │   │   (fan-out)     │    │
//! │  └─────────────┘   └─────────────┘   └─────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                GatewayClient (admin API)                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use gateway_sync_admin::{AdminConfig, HttpGatewayClient};
//! use gateway_sync_core::{HttpMethod, Route, RouteRegistry};
//! use gateway_sync_reconcile::{ReconcileConfig, Reconciler};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = RouteRegistry::new();
//! registry.register(Route::new("getUser", HttpMethod::Get, "users/:id", true));
//!
//! let client = Arc::new(HttpGatewayClient::from_config(&AdminConfig::from_env())?);
//! let reconciler = Reconciler::new(client, ReconcileConfig::from_env());
//!
//! let report = reconciler.reconcile(&registry, 3000).await;
//! for failure in report.failures() {
//!     println!("{} {} failed", failure.phase, failure.name);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod reconciler;
pub mod report;

pub use config::ReconcileConfig;
pub use reconciler::Reconciler;
pub use report::{AbortReason, ItemOutcome, ItemStatus, Phase, ReconcileReport};
