//! Route manifest read at startup.
//!
//! ```json
//! {
//!   "routes": [
//!     { "name": "health", "method": "GET", "path": "health", "auth": false }
//!   ],
//!   "controllers": [
//!     { "prefix": "users", "routes": [
//!       { "name": "getUser", "method": "get", "path": "/:id" }
//!     ] }
//!   ]
//! }
//! ```
//!
//! `auth` defaults to `true`. Methods are case-insensitive.

use std::path::Path;

use anyhow::Context;
use gateway_sync_core::{Controller, HttpMethod, Route, RouteRegistry};
use serde::Deserialize;

/// Routes this service declares.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Routes registered with their path as written.
    #[serde(default)]
    pub routes: Vec<ManifestRoute>,
    /// Routes grouped under a path prefix.
    #[serde(default)]
    pub controllers: Vec<ManifestController>,
}

/// One declared route.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestRoute {
    /// Route name, the gateway's key for the route.
    pub name: String,
    /// HTTP method.
    pub method: String,
    /// URL path.
    pub path: String,
    /// Whether the JWT plugin is required.
    #[serde(default = "default_auth")]
    pub auth: bool,
}

/// Routes mounted under a common prefix.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestController {
    /// Path prefix without slashes, e.g. `users`.
    pub prefix: String,
    /// Routes relative to the prefix.
    #[serde(default)]
    pub routes: Vec<ManifestRoute>,
}

const fn default_auth() -> bool {
    true
}

impl ManifestRoute {
    fn method(&self) -> anyhow::Result<HttpMethod> {
        self.method
            .parse()
            .with_context(|| format!("route `{}`", self.name))
    }
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read route manifest {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid route manifest {}", path.display()))
    }

    /// Build the registry: plain routes first, then each controller in order.
    pub fn into_registry(self) -> anyhow::Result<RouteRegistry> {
        let mut registry = RouteRegistry::new();

        for entry in self.routes {
            let method = entry.method()?;
            registry.register(Route::new(entry.name, method, entry.path, entry.auth));
        }

        for group in self.controllers {
            let mut controller = Controller::new(group.prefix);
            for entry in group.routes {
                let method = entry.method()?;
                controller =
                    controller.route_with_auth(entry.name, method, &entry.path, entry.auth);
            }
            registry.register_controller(controller);
        }

        for route in registry.all() {
            route
                .validate()
                .with_context(|| format!("route with path {}", route.path))?;
        }

        Ok(registry)
    }
}
