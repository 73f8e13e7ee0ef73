//! Three-phase reconciliation of declared routes against the gateway.
//!
//! A run is linear: the service record is upserted first, then every route
//! concurrently, then the JWT plugin on every authenticated route
//! concurrently. Each phase waits for all of its requests before the next one
//! starts. Failures are contained per item and never stop sibling requests or
//! later phases (unless `abort_on_service_failure` is set).

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use futures::{future, FutureExt};
use gateway_sync_admin::{
    classify, AdminResponse, GatewayClient, GatewayError, PluginRequest, RouteRequest,
    ServiceRequest, JWT_PLUGIN_NAME,
};
use gateway_sync_core::{Route, RouteRegistry};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ReconcileConfig;
use crate::report::{AbortReason, ItemOutcome, ItemStatus, Phase, ReconcileReport};

/// Drives reconciliation runs for one backend service.
pub struct Reconciler<C: GatewayClient> {
    client: Arc<C>,
    config: ReconcileConfig,
}

impl<C: GatewayClient> Reconciler<C> {
    /// Create a reconciler.
    #[must_use]
    pub fn new(client: Arc<C>, config: ReconcileConfig) -> Self {
        Self { client, config }
    }

    /// Create with default configuration.
    #[must_use]
    pub fn with_defaults(client: Arc<C>) -> Self {
        Self::new(client, ReconcileConfig::default())
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Get a reference to the gateway client.
    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run one reconciliation of `registry` for a service listening on
    /// `service_port`.
    ///
    /// Never fails: per-item failures are logged and recorded in the report,
    /// and a panic inside the run is caught, logged, and reported as an abort.
    pub async fn reconcile(
        &self,
        registry: &RouteRegistry,
        service_port: u16,
    ) -> ReconcileReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let service_name = self.config.service_name.as_str();
        let span = tracing::info_span!("reconcile", run_id = %run_id, service = %service_name);

        async move {
            tracing::info!(
                routes = registry.len(),
                port = service_port,
                "Starting gateway registration"
            );

            let mut report = ReconcileReport::empty(run_id, service_name, started_at);
            let phases = self.run_phases(registry, service_port, &mut report);
            let run = AssertUnwindSafe(phases).catch_unwind().await;
            if let Err(payload) = run {
                let message = panic_message(payload.as_ref());
                tracing::error!(error = %message, "Gateway configuration failed");
                report.aborted = Some(AbortReason::Panicked(message));
            }
            report.finished_at = Utc::now();

            let failed = report.failures().count();
            let duration_ms = report.duration().num_milliseconds();
            if report.is_success() {
                tracing::info!(
                    routes = report.routes.len(),
                    plugins = report.plugins.len(),
                    duration_ms,
                    "Gateway configuration completed"
                );
            } else {
                tracing::warn!(
                    failed,
                    aborted = ?report.aborted,
                    duration_ms,
                    "Gateway configuration completed with failures"
                );
            }

            report
        }
        .instrument(span)
        .await
    }

    /// Outcomes are written into `report` as they complete, so a caught
    /// panic still leaves the items finished before it in the report.
    async fn run_phases(
        &self,
        registry: &RouteRegistry,
        service_port: u16,
        report: &mut ReconcileReport,
    ) {
        let service = self.upsert_service(service_port).await;
        let service_ok = service.is_ok();
        report.service = Some(service);

        if !service_ok && self.config.abort_on_service_failure {
            tracing::warn!("Service upsert failed, skipping route and plugin phases");
            report.aborted = Some(AbortReason::ServiceFailed);
            return;
        }

        let routes = registry.all();
        self.upsert_routes(routes, &mut report.routes).await;
        self.attach_jwt_plugins(routes, &mut report.plugins).await;
    }

    async fn upsert_service(&self, service_port: u16) -> ItemOutcome {
        let name = &self.config.service_name;
        let body = ServiceRequest::new(self.config.service_host(), service_port);

        tracing::info!(
            host = %body.host,
            port = body.port,
            "Creating or updating gateway service"
        );
        let status = settle(
            "upsert_service",
            name,
            self.client.upsert_service(name, &body).await,
        );
        if status == ItemStatus::Applied {
            tracing::info!("Gateway service created or updated");
        }

        ItemOutcome::new(Phase::Service, name.clone(), status)
    }

    async fn upsert_routes(&self, routes: &[Route], outcomes: &mut Vec<ItemOutcome>) {
        let limit = self.config.fan_out(routes.len());
        tracing::debug!(count = routes.len(), limit, "Route phase started");

        stream::iter(routes.iter().map(|route| self.upsert_route(route)))
            .buffered(limit)
            .for_each(|outcome| {
                outcomes.push(outcome);
                future::ready(())
            })
            .await;
    }

    async fn upsert_route(&self, route: &Route) -> ItemOutcome {
        let service_name = &self.config.service_name;
        let request = RouteRequest::from_route(service_name, route);

        tracing::info!(route = %request.name, "Creating or updating gateway route");
        tracing::debug!(
            route = %request.name,
            methods = ?request.methods,
            paths = ?request.paths,
            "Route config"
        );

        let status = settle(
            "upsert_route",
            &route.name,
            self.client.upsert_route(service_name, &request).await,
        );
        if status == ItemStatus::Applied {
            tracing::info!(route = %route.name, "Route registered with gateway");
        }

        ItemOutcome::new(Phase::Route, route.name.clone(), status)
    }

    /// One check per route name: for a duplicated name only the last
    /// declaration counts, matching the route the gateway ends up keeping.
    async fn attach_jwt_plugins(&self, routes: &[Route], outcomes: &mut Vec<ItemOutcome>) {
        let secured: Vec<&Route> = routes
            .iter()
            .enumerate()
            .filter(|(i, route)| !routes[i + 1..].iter().any(|later| later.name == route.name))
            .map(|(_, route)| route)
            .filter(|route| route.auth)
            .collect();
        let limit = self.config.fan_out(secured.len());
        tracing::debug!(
            count = secured.len(),
            skipped = routes.len() - secured.len(),
            limit,
            "Plugin phase started"
        );

        stream::iter(secured.into_iter().map(|route| self.attach_jwt_plugin(route)))
            .buffered(limit)
            .for_each(|outcome| {
                outcomes.push(outcome);
                future::ready(())
            })
            .await;
    }

    /// Attach the JWT plugin unless the route already has one. The check
    /// matters because `POST /plugins` creates a new instance on every call.
    async fn attach_jwt_plugin(&self, route: &Route) -> ItemOutcome {
        tracing::info!(route = %route.name, "Checking for existing JWT plugin");

        let status = match self.client.list_route_plugins(&route.name).await {
            Ok(plugins) if plugins.contains(JWT_PLUGIN_NAME) => {
                tracing::info!(route = %route.name, "JWT plugin already exists, skipping");
                ItemStatus::AlreadyPresent
            }
            Ok(_) => {
                tracing::info!(route = %route.name, "Attaching JWT plugin");
                let request = PluginRequest::jwt_for_route(&route.name);
                let status = settle(
                    "attach_plugin",
                    &route.name,
                    self.client.attach_plugin(&request).await,
                );
                if status == ItemStatus::Applied {
                    tracing::info!(route = %route.name, "JWT plugin attached");
                }
                status
            }
            Err(e) => failure("list_route_plugins", &route.name, &e),
        };

        ItemOutcome::new(Phase::Plugin, route.name.clone(), status)
    }
}

/// Classify a call result and log it.
fn settle(
    operation: &str,
    item: &str,
    result: gateway_sync_admin::Result<AdminResponse>,
) -> ItemStatus {
    match result {
        Ok(response) => {
            let verdict = classify(Some(&response));
            verdict.log(operation, item);
            if verdict.ok {
                ItemStatus::Applied
            } else {
                ItemStatus::Failed(verdict)
            }
        }
        Err(e) => failure(operation, item, &e),
    }
}

fn failure(operation: &str, item: &str, error: &GatewayError) -> ItemStatus {
    tracing::error!(operation, item, error = %error, "Gateway request failed");
    let verdict = error.verdict();
    verdict.log(operation, item);
    ItemStatus::Failed(verdict)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use gateway_sync_admin::{JwtPluginConfig, MockFailure, MockGatewayClient, RecordedCall};
    use gateway_sync_core::HttpMethod;

    fn setup(
        config: ReconcileConfig,
    ) -> (Reconciler<MockGatewayClient>, Arc<MockGatewayClient>) {
        let client = Arc::new(MockGatewayClient::new());
        (Reconciler::new(Arc::clone(&client), config), client)
    }

    fn registry(routes: &[(&str, bool)]) -> RouteRegistry {
        routes
            .iter()
            .map(|(name, auth)| Route::new(*name, HttpMethod::Get, *name, *auth))
            .collect()
    }

    fn count(calls: &[RecordedCall], method: &str) -> usize {
        calls.iter().filter(|c| c.method() == method).count()
    }

    #[tokio::test]
    async fn single_authenticated_route_end_to_end() {
        let (reconciler, client) = setup(ReconcileConfig::default());
        let mut registry = RouteRegistry::new();
        registry.register(Route::new("getUser", HttpMethod::Get, "users/:id", true));

        let report = reconciler.reconcile(&registry, 3000).await;
        assert!(report.is_success());

        let calls = client.calls();
        assert_eq!(
            calls,
            vec![
                RecordedCall::UpsertService {
                    service_name: "user-service".into(),
                    body: ServiceRequest::new("user-service", 3000),
                },
                RecordedCall::UpsertRoute {
                    service_name: "user-service".into(),
                    body: RouteRequest {
                        name: "getUser".into(),
                        service: gateway_sync_admin::ServiceRef {
                            name: "user-service".into()
                        },
                        methods: vec![HttpMethod::Get],
                        paths: vec!["/users/:id".into()],
                        strip_path: false,
                    },
                },
                RecordedCall::ListRoutePlugins {
                    route_name: "getUser".into()
                },
                RecordedCall::AttachPlugin {
                    body: PluginRequest {
                        name: "jwt".into(),
                        config: JwtPluginConfig::default(),
                        enabled: true,
                        route: gateway_sync_admin::RouteRef {
                            id: None,
                            name: Some("getUser".into()),
                        },
                    },
                },
            ]
        );
        assert_eq!(report.plugins[0].status, ItemStatus::Applied);
    }

    #[tokio::test]
    async fn public_routes_skip_plugin_phase() {
        let (reconciler, client) = setup(ReconcileConfig::default());
        let registry = registry(&[("health", false), ("login", false)]);

        let report = reconciler.reconcile(&registry, 8080).await;

        for name in ["health", "login"] {
            let calls = client.calls_for_route(name);
            assert_eq!(calls.len(), 1, "only the route upsert for {name}");
            assert_eq!(calls[0].method(), "PUT");
        }
        assert!(report.plugins.is_empty());
        assert_eq!(report.routes.len(), 2);
    }

    #[tokio::test]
    async fn existing_jwt_plugin_is_not_reattached() {
        let (reconciler, client) = setup(ReconcileConfig::default());
        client.seed_plugin("getUser", "jwt");
        let registry = registry(&[("getUser", true), ("getOrder", true)]);

        let report = reconciler.reconcile(&registry, 3000).await;

        let attached: Vec<_> = client
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::AttachPlugin { body } => body.route.name,
                _ => None,
            })
            .collect();
        assert_eq!(attached, ["getOrder"]);
        assert_eq!(report.plugins[0].status, ItemStatus::AlreadyPresent);
        assert_eq!(report.plugins[1].status, ItemStatus::Applied);
    }

    #[tokio::test]
    async fn other_plugins_do_not_count_as_jwt() {
        let (reconciler, client) = setup(ReconcileConfig::default());
        client.seed_plugin("getUser", "cors");

        reconciler.reconcile(&registry(&[("getUser", true)]), 3000).await;

        assert_eq!(client.plugins("getUser"), ["cors", "jwt"]);
    }

    #[tokio::test]
    async fn second_run_is_idempotent() {
        let (reconciler, client) = setup(ReconcileConfig::default());
        let registry = registry(&[("getUser", true), ("health", false)]);

        let first = reconciler.reconcile(&registry, 3000).await;
        let second = reconciler.reconcile(&registry, 3000).await;

        assert_eq!(client.plugins("getUser"), ["jwt"]);
        assert_eq!(count(&client.calls(), "POST"), 1);
        assert_eq!(second.plugins[0].status, ItemStatus::AlreadyPresent);
        assert_ne!(first.run_id, second.run_id);
    }

    #[tokio::test]
    async fn route_transport_failure_is_contained() {
        let (reconciler, client) = setup(ReconcileConfig::default());
        client.fail_route("b", MockFailure::Transport);
        let registry = registry(&[("a", true), ("b", true), ("c", true)]);

        let report = reconciler.reconcile(&registry, 3000).await;

        assert_eq!(count(&client.calls(), "PUT"), 4);
        assert!(client.route("a").is_some());
        assert!(client.route("b").is_none());
        assert!(client.route("c").is_some());

        let failed: Vec<_> = report.failures().map(|o| o.name.as_str()).collect();
        assert_eq!(failed, ["b"]);
        match &report.routes[1].status {
            ItemStatus::Failed(verdict) => assert!(verdict.diagnostic.contains("no response")),
            other => panic!("expected failure, got {other:?}"),
        }
        // The plugin phase still runs for every authenticated route.
        assert_eq!(report.plugins.len(), 3);
    }

    #[tokio::test]
    async fn service_failure_continues_by_default() {
        let (reconciler, client) = setup(ReconcileConfig::default());
        client.fail_service(MockFailure::Status(500, "database unavailable".into()));

        let report = reconciler.reconcile(&registry(&[("a", true)]), 3000).await;

        assert!(report.aborted.is_none());
        assert!(!report.service.as_ref().unwrap().is_ok());
        assert_eq!(report.routes.len(), 1);
        assert_eq!(client.plugins("a"), ["jwt"]);
    }

    #[tokio::test]
    async fn service_failure_can_short_circuit() {
        let (reconciler, client) = setup(ReconcileConfig {
            abort_on_service_failure: true,
            ..Default::default()
        });
        client.fail_service(MockFailure::Status(404, "no Route matched".into()));

        let report = reconciler.reconcile(&registry(&[("a", true), ("b", false)]), 3000).await;

        assert_eq!(report.aborted, Some(AbortReason::ServiceFailed));
        assert!(report.routes.is_empty());
        assert!(report.plugins.is_empty());
        assert_eq!(client.calls().len(), 1);
        match &report.service.unwrap().status {
            ItemStatus::Failed(verdict) => assert!(verdict.diagnostic.contains("not found")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn plugin_list_failure_skips_attach_for_that_route() {
        let (reconciler, client) = setup(ReconcileConfig::default());
        client.fail_plugin_list("a", MockFailure::Status(400, "bad".into()));

        let report = reconciler.reconcile(&registry(&[("a", true), ("b", true)]), 3000).await;

        assert!(client.plugins("a").is_empty());
        assert_eq!(client.plugins("b"), ["jwt"]);
        assert!(!report.plugins[0].is_ok());
        assert!(report.plugins[1].is_ok());
    }

    #[tokio::test]
    async fn plugin_attach_failure_is_reported() {
        let (reconciler, client) = setup(ReconcileConfig::default());
        client.fail_plugin_attach("a", MockFailure::Status(409, "unique constraint".into()));

        let report = reconciler.reconcile(&registry(&[("a", true)]), 3000).await;

        match &report.plugins[0].status {
            ItemStatus::Failed(verdict) => {
                assert!(verdict.diagnostic.contains("409"));
                assert!(verdict.diagnostic.contains("unique constraint"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_names_last_write_wins() {
        let (reconciler, client) = setup(ReconcileConfig::default());
        let mut registry = RouteRegistry::new();
        registry.register(Route::new("getUser", HttpMethod::Get, "users/:id", true));
        registry.register(Route::new("getUser", HttpMethod::Delete, "users/:id", true));

        let report = reconciler.reconcile(&registry, 3000).await;

        assert!(report.is_success());
        assert_eq!(client.route_count(), 1);
        assert_eq!(client.route("getUser").unwrap().methods, [HttpMethod::Delete]);
        assert_eq!(report.routes.len(), 2);
        assert_eq!(report.plugins.len(), 1);
        assert_eq!(client.plugins("getUser"), ["jwt"]);
    }

    #[tokio::test]
    async fn duplicate_names_follow_last_declaration_for_auth() {
        let (reconciler, client) = setup(ReconcileConfig {
            max_concurrency: NonZeroUsize::new(1),
            ..Default::default()
        });
        let registry = registry(&[("getUser", true), ("health", false), ("getUser", false)]);

        let report = reconciler.reconcile(&registry, 3000).await;

        assert!(report.is_success());
        assert!(report.plugins.is_empty());
        assert_eq!(count(&client.calls(), "GET"), 0);
        assert_eq!(client.route_count(), 2);
    }

    #[tokio::test]
    async fn bounded_fan_out_reconciles_everything() {
        let (reconciler, client) = setup(ReconcileConfig {
            max_concurrency: NonZeroUsize::new(1),
            ..Default::default()
        });
        let names: Vec<String> = (0..10).map(|i| format!("route-{i}")).collect();
        let registry: RouteRegistry = names
            .iter()
            .map(|n| Route::new(n.as_str(), HttpMethod::Get, n.as_str(), true))
            .collect();

        let report = reconciler.reconcile(&registry, 3000).await;

        assert!(report.is_success());
        assert_eq!(client.route_count(), 10);
        for name in &names {
            assert_eq!(client.plugins(name), ["jwt"]);
        }
        let reported: Vec<_> = report.routes.iter().map(|o| o.name.clone()).collect();
        assert_eq!(reported, names);
    }

    #[tokio::test]
    async fn route_phase_completes_before_plugin_phase() {
        let (reconciler, client) = setup(ReconcileConfig::default());
        reconciler
            .reconcile(&registry(&[("a", true), ("b", true), ("c", false)]), 3000)
            .await;

        let calls = client.calls();
        let last_route = calls
            .iter()
            .rposition(|c| matches!(c, RecordedCall::UpsertRoute { .. }))
            .unwrap();
        let first_plugin = calls
            .iter()
            .position(|c| matches!(c, RecordedCall::ListRoutePlugins { .. }))
            .unwrap();
        assert!(last_route < first_plugin);
        assert!(matches!(calls[0], RecordedCall::UpsertService { .. }));
    }

    #[tokio::test]
    async fn panic_is_caught_at_run_boundary() {
        let (reconciler, client) = setup(ReconcileConfig::default());
        client.panic_on_route("boom");

        let report = reconciler.reconcile(&registry(&[("boom", true)]), 3000).await;

        match report.aborted {
            Some(AbortReason::Panicked(ref message)) => assert!(message.contains("boom")),
            other => panic!("expected panic abort, got {other:?}"),
        }
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn panic_keeps_outcomes_completed_before_it() {
        let (reconciler, client) = setup(ReconcileConfig {
            max_concurrency: NonZeroUsize::new(1),
            ..Default::default()
        });
        client.panic_on_route("boom");

        let report = reconciler
            .reconcile(&registry(&[("first", true), ("boom", true), ("last", true)]), 3000)
            .await;

        assert!(matches!(report.aborted, Some(AbortReason::Panicked(_))));
        assert_eq!(
            report.service.as_ref().map(|o| &o.status),
            Some(&ItemStatus::Applied)
        );
        let routes: Vec<_> = report.routes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(routes, ["first"]);
        assert!(report.plugins.is_empty());
    }

    #[tokio::test]
    async fn custom_service_host() {
        let (reconciler, client) = setup(ReconcileConfig {
            service_host: Some("users.svc.cluster.local".into()),
            ..ReconcileConfig::with_service_name("users")
        });

        reconciler.reconcile(&RouteRegistry::new(), 4000).await;

        assert_eq!(
            client.service("users"),
            Some(ServiceRequest::new("users.svc.cluster.local", 4000))
        );
    }

    #[tokio::test]
    async fn empty_registry_only_upserts_service() {
        let (reconciler, client) = setup(ReconcileConfig::default());
        let report = reconciler.reconcile(&RouteRegistry::new(), 3000).await;

        assert!(report.is_success());
        assert_eq!(client.calls().len(), 1);
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn panic_messages() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }
}
