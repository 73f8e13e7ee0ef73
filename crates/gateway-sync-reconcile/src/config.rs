//! Reconciliation settings.

use std::num::NonZeroUsize;

use serde::Deserialize;

/// Configuration for a reconciliation run.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    /// Name of the service this process registers.
    #[serde(default = "ReconcileConfig::default_service_name")]
    pub service_name: String,

    /// Upstream host the gateway forwards to. Defaults to the service name.
    #[serde(default)]
    pub service_host: Option<String>,

    /// Skip the route and plugin phases when the service upsert fails.
    #[serde(default)]
    pub abort_on_service_failure: bool,

    /// Maximum in-flight requests per phase. `None` sends one request per
    /// route at once.
    #[serde(default)]
    pub max_concurrency: Option<NonZeroUsize>,
}

impl ReconcileConfig {
    fn default_service_name() -> String {
        "user-service".to_string()
    }

    /// Create a config for `service_name` with the other defaults.
    #[must_use]
    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `SERVICE_NAME`: name of the service to register
    /// - `SERVICE_HOST`: upstream host, defaults to the service name
    /// - `GATEWAY_ABORT_ON_SERVICE_FAILURE`: `true`/`false`
    /// - `GATEWAY_MAX_CONCURRENCY`: positive integer
    ///
    /// Empty values are treated as unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|val| !val.trim().is_empty());
        let mut config = Self::default();

        if let Some(val) = var("SERVICE_NAME") {
            config.service_name = val;
        }
        if let Some(val) = var("SERVICE_HOST") {
            config.service_host = Some(val);
        }
        if let Some(flag) =
            var("GATEWAY_ABORT_ON_SERVICE_FAILURE").and_then(|val| parse_flag(&val))
        {
            config.abort_on_service_failure = flag;
        }
        if let Some(n) = var("GATEWAY_MAX_CONCURRENCY").and_then(|val| val.parse().ok()) {
            config.max_concurrency = Some(n);
        }

        config
    }

    /// Upstream host sent in the service record.
    #[must_use]
    pub fn service_host(&self) -> &str {
        self.service_host.as_deref().unwrap_or(&self.service_name)
    }

    /// In-flight limit for a phase of `items` requests. Never zero.
    #[must_use]
    pub fn fan_out(&self, items: usize) -> usize {
        self.max_concurrency
            .map_or(items, NonZeroUsize::get)
            .clamp(1, items.max(1))
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            service_name: Self::default_service_name(),
            service_host: None,
            abort_on_service_failure: false,
            max_concurrency: None,
        }
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
