//! In-memory gateway for tests.
//!
//! [`MockGatewayClient`] behaves like a small gateway: upserts are keyed by
//! name (last write wins), attached plugins are listed back, and every call is
//! recorded. Failures can be scripted per operation and per route.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::GatewayClient;
use crate::error::{GatewayError, Result};
use crate::types::{
    AdminResponse, PluginList, PluginRequest, PluginSummary, RouteRequest, ServiceRequest,
};

/// A scripted failure.
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// No response at all.
    Transport,
    /// A response with the given status and body.
    Status(u16, String),
}

impl MockFailure {
    fn into_error(self) -> GatewayError {
        match self {
            Self::Transport => GatewayError::Transport("connection refused (mock)".to_string()),
            Self::Status(status, body) => GatewayError::Rejected(AdminResponse::new(status, body)),
        }
    }
}

/// A call received by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    /// `PUT /services/{service_name}`
    UpsertService {
        /// Service name from the URL.
        service_name: String,
        /// Request body.
        body: ServiceRequest,
    },
    /// `PUT /services/{service_name}/routes/{name}`
    UpsertRoute {
        /// Service name from the URL.
        service_name: String,
        /// Request body.
        body: RouteRequest,
    },
    /// `GET /routes/{route_name}/plugins`
    ListRoutePlugins {
        /// Route name from the URL.
        route_name: String,
    },
    /// `POST /plugins`
    AttachPlugin {
        /// Request body.
        body: PluginRequest,
    },
}

impl RecordedCall {
    /// HTTP method of the call.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::UpsertService { .. } | Self::UpsertRoute { .. } => "PUT",
            Self::ListRoutePlugins { .. } => "GET",
            Self::AttachPlugin { .. } => "POST",
        }
    }

    /// Request path of the call.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::UpsertService { service_name, .. } => format!("/services/{service_name}"),
            Self::UpsertRoute { service_name, body } => {
                format!("/services/{service_name}/routes/{}", body.name)
            }
            Self::ListRoutePlugins { route_name } => format!("/routes/{route_name}/plugins"),
            Self::AttachPlugin { .. } => "/plugins".to_string(),
        }
    }

    /// Name of the route this call concerns, if any.
    #[must_use]
    pub fn route_name(&self) -> Option<&str> {
        match self {
            Self::UpsertService { .. } => None,
            Self::UpsertRoute { body, .. } => Some(&body.name),
            Self::ListRoutePlugins { route_name } => Some(route_name),
            Self::AttachPlugin { body } => body.route.name.as_deref(),
        }
    }
}

#[derive(Default)]
struct MockState {
    calls: Vec<RecordedCall>,
    services: HashMap<String, ServiceRequest>,
    routes: HashMap<String, RouteRequest>,
    plugins: HashMap<String, Vec<PluginSummary>>,
    service_failure: Option<MockFailure>,
    route_failures: HashMap<String, MockFailure>,
    list_failures: HashMap<String, MockFailure>,
    attach_failures: HashMap<String, MockFailure>,
    panic_on_route: Option<String>,
}

/// A mock gateway client that keeps gateway state in memory.
#[derive(Default)]
pub struct MockGatewayClient {
    state: Mutex<MockState>,
}

impl MockGatewayClient {
    /// Create an empty mock gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every service upsert fail.
    pub fn fail_service(&self, failure: MockFailure) {
        self.state.lock().service_failure = Some(failure);
    }

    /// Make upserts of the route named `route_name` fail.
    pub fn fail_route(&self, route_name: &str, failure: MockFailure) {
        self.state
            .lock()
            .route_failures
            .insert(route_name.to_string(), failure);
    }

    /// Make plugin listing for `route_name` fail.
    pub fn fail_plugin_list(&self, route_name: &str, failure: MockFailure) {
        self.state
            .lock()
            .list_failures
            .insert(route_name.to_string(), failure);
    }

    /// Make plugin attachment for `route_name` fail.
    pub fn fail_plugin_attach(&self, route_name: &str, failure: MockFailure) {
        self.state
            .lock()
            .attach_failures
            .insert(route_name.to_string(), failure);
    }

    /// Panic while upserting the route named `route_name`.
    pub fn panic_on_route(&self, route_name: &str) {
        self.state.lock().panic_on_route = Some(route_name.to_string());
    }

    /// Pretend a plugin named `plugin_name` is already attached to `route_name`.
    pub fn seed_plugin(&self, route_name: &str, plugin_name: &str) {
        self.state
            .lock()
            .plugins
            .entry(route_name.to_string())
            .or_default()
            .push(PluginSummary {
                name: plugin_name.to_string(),
                id: None,
                enabled: Some(true),
            });
    }

    /// All calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Calls received for the route named `route_name`.
    #[must_use]
    pub fn calls_for_route(&self, route_name: &str) -> Vec<RecordedCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.route_name() == Some(route_name))
            .cloned()
            .collect()
    }

    /// Stored service record.
    #[must_use]
    pub fn service(&self, service_name: &str) -> Option<ServiceRequest> {
        self.state.lock().services.get(service_name).cloned()
    }

    /// Stored route record.
    #[must_use]
    pub fn route(&self, route_name: &str) -> Option<RouteRequest> {
        self.state.lock().routes.get(route_name).cloned()
    }

    /// Number of stored routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.state.lock().routes.len()
    }

    /// Names of the plugins attached to `route_name`, duplicates included.
    #[must_use]
    pub fn plugins(&self, route_name: &str) -> Vec<String> {
        self.state
            .lock()
            .plugins
            .get(route_name)
            .map(|p| p.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GatewayClient for MockGatewayClient {
    async fn upsert_service(
        &self,
        service_name: &str,
        service: &ServiceRequest,
    ) -> Result<AdminResponse> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::UpsertService {
            service_name: service_name.to_string(),
            body: service.clone(),
        });

        if let Some(failure) = state.service_failure.clone() {
            return Err(failure.into_error());
        }

        state
            .services
            .insert(service_name.to_string(), service.clone());
        Ok(AdminResponse::new(200, "{}"))
    }

    async fn upsert_route(
        &self,
        service_name: &str,
        route: &RouteRequest,
    ) -> Result<AdminResponse> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::UpsertRoute {
            service_name: service_name.to_string(),
            body: route.clone(),
        });

        if state.panic_on_route.as_deref() == Some(route.name.as_str()) {
            drop(state);
            panic!("mock gateway panicked on route {}", route.name);
        }
        if let Some(failure) = state.route_failures.get(&route.name).cloned() {
            return Err(failure.into_error());
        }

        state.routes.insert(route.name.clone(), route.clone());
        Ok(AdminResponse::new(200, "{}"))
    }

    async fn list_route_plugins(&self, route_name: &str) -> Result<PluginList> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::ListRoutePlugins {
            route_name: route_name.to_string(),
        });

        if let Some(failure) = state.list_failures.get(route_name).cloned() {
            return Err(failure.into_error());
        }

        Ok(PluginList {
            data: state.plugins.get(route_name).cloned().unwrap_or_default(),
            next: None,
        })
    }

    async fn attach_plugin(&self, plugin: &PluginRequest) -> Result<AdminResponse> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::AttachPlugin {
            body: plugin.clone(),
        });

        let route_name = plugin.route.name.clone().unwrap_or_default();
        if let Some(failure) = state.attach_failures.get(&route_name).cloned() {
            return Err(failure.into_error());
        }

        let plugins = state.plugins.entry(route_name).or_default();
        plugins.push(PluginSummary {
            name: plugin.name.clone(),
            id: Some(format!("plugin-{}", plugins.len() + 1)),
            enabled: Some(plugin.enabled),
        });
        Ok(AdminResponse::new(201, "{}"))
    }
}
