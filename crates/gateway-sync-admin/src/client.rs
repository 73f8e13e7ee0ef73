//! HTTP client for the gateway admin API.
//!
//! This module provides the [`GatewayClient`] trait and the reqwest-backed
//! [`HttpGatewayClient`]. Every operation is a single request with no retry;
//! retry policy, if any, belongs to the caller.

use async_trait::async_trait;

use crate::error::{GatewayError, Result};
use crate::types::{AdminResponse, PluginList, PluginRequest, RouteRequest, ServiceRequest};
use crate::AdminConfig;

/// Trait for gateway admin communication.
///
/// This trait abstracts the admin API, allowing for an in-memory fake in
/// tests. Statuses of 300 and above are returned as
/// [`GatewayError::Rejected`], carrying the response.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Create or replace the service record.
    ///
    /// `PUT /services/{service_name}`
    ///
    /// # Errors
    ///
    /// Returns an error if no response is received or the gateway rejects it.
    async fn upsert_service(
        &self,
        service_name: &str,
        service: &ServiceRequest,
    ) -> Result<AdminResponse>;

    /// Create or replace a route under a service.
    ///
    /// `PUT /services/{service_name}/routes/{route.name}`
    ///
    /// # Errors
    ///
    /// Returns an error if no response is received or the gateway rejects it.
    async fn upsert_route(&self, service_name: &str, route: &RouteRequest)
        -> Result<AdminResponse>;

    /// List the plugins attached to a route.
    ///
    /// `GET /routes/{route_name}/plugins`
    ///
    /// # Errors
    ///
    /// Returns an error if no response is received, the gateway rejects it,
    /// or the body is not a plugin list.
    async fn list_route_plugins(&self, route_name: &str) -> Result<PluginList>;

    /// Attach a plugin. Not idempotent: every call creates a plugin instance.
    ///
    /// `POST /plugins`
    ///
    /// # Errors
    ///
    /// Returns an error if no response is received or the gateway rejects it.
    async fn attach_plugin(&self, plugin: &PluginRequest) -> Result<AdminResponse>;
}

/// HTTP client for the gateway admin API.
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGatewayClient {
    /// Create a client for `config`'s admin endpoint with its timeouts.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Transport` if the HTTP client cannot be built.
    pub fn from_config(config: &AdminConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, config.base_url()))
    }

    /// Create a client with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the base URL of the admin API.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of an admin endpoint. Each segment is percent-encoded, so names
    /// containing `/`, `?` or `#` stay inside their own path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            GatewayError::Transport(format!("invalid admin URL {}: {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                GatewayError::Transport(format!("admin URL {} cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and split the outcome into success, rejection, or
    /// transport failure.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<AdminResponse> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(status, error = %e, "Failed to read gateway response body");
                String::new()
            }
        };
        let response = AdminResponse::new(status, body);

        if response.is_success() {
            Ok(response)
        } else {
            Err(GatewayError::Rejected(response))
        }
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn upsert_service(
        &self,
        service_name: &str,
        service: &ServiceRequest,
    ) -> Result<AdminResponse> {
        let url = self.endpoint(&["services", service_name])?;
        tracing::debug!(url = %url, "PUT service");

        self.send(self.client.put(url).json(service)).await
    }

    async fn upsert_route(
        &self,
        service_name: &str,
        route: &RouteRequest,
    ) -> Result<AdminResponse> {
        let url = self.endpoint(&["services", service_name, "routes", &route.name])?;
        tracing::debug!(url = %url, paths = ?route.paths, "PUT route");

        self.send(self.client.put(url).json(route)).await
    }

    async fn list_route_plugins(&self, route_name: &str) -> Result<PluginList> {
        let url = self.endpoint(&["routes", route_name, "plugins"])?;
        tracing::debug!(url = %url, "GET route plugins");

        let response = self.send(self.client.get(url)).await?;
        serde_json::from_str(&response.body).map_err(|e| GatewayError::InvalidResponse {
            status: response.status,
            message: e.to_string(),
        })
    }

    async fn attach_plugin(&self, plugin: &PluginRequest) -> Result<AdminResponse> {
        let url = self.endpoint(&["plugins"])?;
        tracing::debug!(
            url = %url,
            plugin = %plugin.name,
            route = ?plugin.route.name,
            "POST plugin"
        );

        self.send(self.client.post(url).json(plugin)).await
    }
}
