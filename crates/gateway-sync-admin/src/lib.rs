//! Gateway admin API client for gateway-sync.
//!
//! This crate talks to the control plane of a Kong-style API gateway:
//!
//! - Idempotent upserts of services and routes (`PUT`)
//! - Listing the plugins attached to a route (`GET`)
//! - Attaching the JWT plugin to a route (`POST`)
//! - Classifying every outcome into a verdict and a log-ready diagnostic
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   Reconciler     │────▶│  GatewayClient   │
//! │                  │     │  (trait)         │
//! └────────┬─────────┘     └────────┬─────────┘
//!          │                        │
//!          │               ┌────────▼─────────┐
//!          │               │ HttpGatewayClient│
//!          │               │ (reqwest)        │
//!          │               └────────┬─────────┘
//!          │                        │ HTTP
//!          │               ┌────────▼─────────┐
//!          │               │  Gateway admin   │
//!          │               │  API             │
//!          │               └──────────────────┘
//!          ▼
//! ┌──────────────────┐
//! │   classify()     │
//! │   (verdicts)     │
//! └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use gateway_sync_admin::{AdminConfig, GatewayClient, HttpGatewayClient, ServiceRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpGatewayClient::from_config(&AdminConfig::default())?;
//!
//! let service = ServiceRequest::new("user-service", 3000);
//! let response = client.upsert_service("user-service", &service).await?;
//! println!("gateway answered {}", response.status);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::time::Duration;

use serde::Deserialize;

pub mod classify;
pub mod client;
pub mod error;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use classify::{classify, Severity, Verdict};
pub use client::{GatewayClient, HttpGatewayClient};
pub use error::{GatewayError, Result};
pub use types::{
    AdminResponse, JwtPluginConfig, PluginList, PluginRequest, PluginSummary, RouteRef,
    RouteRequest, ServiceRef, ServiceRequest, JWT_PLUGIN_NAME,
};

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockFailure, MockGatewayClient, RecordedCall};

/// Connection settings for the gateway admin API.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Host name of the gateway (e.g., `Kong`).
    #[serde(default = "AdminConfig::default_host")]
    pub host: String,

    /// Port of the admin API.
    #[serde(default = "AdminConfig::default_port")]
    pub port: u16,

    /// Request timeout in seconds.
    #[serde(default = "AdminConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Connect timeout in seconds.
    #[serde(default = "AdminConfig::default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl AdminConfig {
    fn default_host() -> String {
        "Kong".to_string()
    }

    const fn default_port() -> u16 {
        8001
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    const fn default_connect_timeout() -> u64 {
        5
    }

    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `KONG_GATEWAY_NAME`: host name of the gateway
    /// - `GATEWAY_PORT`: admin API port
    /// - `GATEWAY_REQUEST_TIMEOUT_SECONDS`: request timeout
    /// - `GATEWAY_CONNECT_TIMEOUT_SECONDS`: connect timeout
    ///
    /// Values that are empty or fail to parse keep their default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|val| !val.trim().is_empty());
        let mut config = Self::default();

        if let Some(val) = var("KONG_GATEWAY_NAME") {
            config.host = val;
        }
        if let Some(n) = var("GATEWAY_PORT").and_then(|val| val.parse().ok()) {
            config.port = n;
        }
        if let Some(n) = var("GATEWAY_REQUEST_TIMEOUT_SECONDS").and_then(|val| val.parse().ok()) {
            config.request_timeout_seconds = n;
        }
        if let Some(n) = var("GATEWAY_CONNECT_TIMEOUT_SECONDS").and_then(|val| val.parse().ok()) {
            config.connect_timeout_seconds = n;
        }

        config
    }

    /// Base URL of the admin API.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Get the connect timeout as a `Duration`.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_seconds: Self::default_request_timeout(),
            connect_timeout_seconds: Self::default_connect_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AdminConfig::default();
        assert_eq!(config.host, "Kong");
        assert_eq!(config.port, 8001);
        assert_eq!(config.base_url(), "http://Kong:8001");
    }

    #[test]
    fn timeout_durations() {
        let config = AdminConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: AdminConfig = serde_json::from_str(r#"{"host":"gateway.internal"}"#).unwrap();
        assert_eq!(config.host, "gateway.internal");
        assert_eq!(config.port, 8001);
        assert_eq!(config.request_timeout_seconds, 30);
    }

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn env_overrides() {
        let config = AdminConfig::from_lookup(lookup(&[
            ("KONG_GATEWAY_NAME", "kong.internal"),
            ("GATEWAY_PORT", "9001"),
            ("GATEWAY_REQUEST_TIMEOUT_SECONDS", "10"),
        ]));
        assert_eq!(config.base_url(), "http://kong.internal:9001");
        assert_eq!(config.request_timeout_seconds, 10);
        assert_eq!(config.connect_timeout_seconds, 5);
    }

    #[test]
    fn empty_env_values_keep_defaults() {
        let config = AdminConfig::from_lookup(lookup(&[
            ("KONG_GATEWAY_NAME", ""),
            ("GATEWAY_PORT", "  "),
        ]));
        assert_eq!(config.base_url(), "http://Kong:8001");
    }

    #[test]
    fn unparseable_env_values_keep_defaults() {
        let config = AdminConfig::from_lookup(lookup(&[("GATEWAY_PORT", "admin")]));
        assert_eq!(config.port, 8001);
    }
}
