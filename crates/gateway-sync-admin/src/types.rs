//! Wire types for the gateway admin API.
//!
//! Request bodies are built fresh from local declarations on every run; no
//! remote state is cached.

use gateway_sync_core::{HttpMethod, Route};
use serde::{Deserialize, Serialize};

/// Name of the JWT authentication plugin.
pub const JWT_PLUGIN_NAME: &str = "jwt";

/// Status and body of an admin API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl AdminResponse {
    /// Create a response from its parts.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is below 300.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status < 300
    }
}

/// Body of `PUT /services/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Upstream host the gateway forwards to.
    pub host: String,
    /// Upstream port the gateway forwards to.
    pub port: u16,
}

impl ServiceRequest {
    /// Create a service body.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Reference to a service by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRef {
    /// Service name.
    pub name: String,
}

/// Body of `PUT /services/{service}/routes/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
    /// Route name, also the key in the URL.
    pub name: String,
    /// Owning service.
    pub service: ServiceRef,
    /// Methods the route matches.
    pub methods: Vec<HttpMethod>,
    /// Paths the route matches.
    pub paths: Vec<String>,
    /// Whether the gateway strips the matched path before proxying.
    pub strip_path: bool,
}

impl RouteRequest {
    /// Map a declared route onto the wire format for `service_name`.
    #[must_use]
    pub fn from_route(service_name: &str, route: &Route) -> Self {
        Self {
            name: route.name.clone(),
            service: ServiceRef {
                name: service_name.to_string(),
            },
            methods: vec![route.method],
            paths: vec![route.gateway_path()],
            strip_path: false,
        }
    }
}

/// Configuration of the JWT plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtPluginConfig {
    /// Claim holding the key identifier.
    pub key_claim_name: String,
    /// Registered claims the gateway verifies.
    pub claims_to_verify: Vec<String>,
}

impl Default for JwtPluginConfig {
    fn default() -> Self {
        Self {
            key_claim_name: "kid".to_string(),
            claims_to_verify: vec!["exp".to_string()],
        }
    }
}

/// Reference to a route by id and/or name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRef {
    /// Gateway-assigned route id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Route name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Body of `POST /plugins`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRequest {
    /// Plugin name.
    pub name: String,
    /// Plugin configuration.
    pub config: JwtPluginConfig,
    /// Whether the plugin is active.
    pub enabled: bool,
    /// Route the plugin is scoped to.
    pub route: RouteRef,
}

impl PluginRequest {
    /// JWT plugin scoped to the route named `route_name`.
    #[must_use]
    pub fn jwt_for_route(route_name: &str) -> Self {
        Self {
            name: JWT_PLUGIN_NAME.to_string(),
            config: JwtPluginConfig::default(),
            enabled: true,
            route: RouteRef {
                id: None,
                name: Some(route_name.to_string()),
            },
        }
    }
}

/// A plugin as listed by `GET /routes/{name}/plugins`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSummary {
    /// Plugin name.
    pub name: String,
    /// Gateway-assigned plugin id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Whether the plugin is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Response of `GET /routes/{name}/plugins`.
///
/// Only the first page is read; `next` is kept for visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginList {
    /// Plugins on this page.
    #[serde(default)]
    pub data: Vec<PluginSummary>,
    /// Link to the next page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl PluginList {
    /// Whether a plugin named `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.data.iter().any(|p| p.name == name)
    }
}
