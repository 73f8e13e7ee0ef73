//! Gateway Sync - registers a service's routes with the gateway.
//!
//! This is the entry point for the `gateway-sync` binary. It runs once at
//! service startup: loads the route manifest, upserts the service record and
//! every route, and attaches the JWT plugin to authenticated routes.
//!
//! # Configuration
//!
//! The admin API location comes from `KONG_GATEWAY_NAME` and `GATEWAY_PORT`,
//! the service identity from `SERVICE_NAME` and `SERVICE_HOST`. Flags below
//! override the matching environment settings.
//!
//! Gateway failures are logged and never fail the process unless `--strict`
//! is passed.

mod manifest;

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateway_sync_admin::{AdminConfig, HttpGatewayClient};
use gateway_sync_reconcile::{ReconcileConfig, Reconciler};

use manifest::Manifest;

/// Register a service's routes with the gateway.
#[derive(Parser, Debug)]
#[command(name = "gateway-sync")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON route manifest.
    #[arg(long, env = "GATEWAY_ROUTES_FILE")]
    routes: PathBuf,

    /// Port the registered service listens on.
    #[arg(long, env = "SERVICE_PORT", default_value_t = 3000)]
    port: u16,

    /// Skip the route and plugin phases when the service upsert fails.
    #[arg(long)]
    abort_on_service_failure: bool,

    /// Maximum in-flight admin requests per phase.
    #[arg(long)]
    max_concurrency: Option<NonZeroUsize>,

    /// Exit with an error when any item failed.
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gateway_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting gateway sync");

    let registry = Manifest::load(&args.routes)?.into_registry()?;
    tracing::info!(
        path = %args.routes.display(),
        routes = registry.len(),
        "Route manifest loaded"
    );

    let admin = AdminConfig::from_env();
    let mut config = ReconcileConfig::from_env();
    if args.abort_on_service_failure {
        config.abort_on_service_failure = true;
    }
    if args.max_concurrency.is_some() {
        config.max_concurrency = args.max_concurrency;
    }

    tracing::info!(
        admin_url = %admin.base_url(),
        service = %config.service_name,
        service_host = %config.service_host(),
        port = args.port,
        abort_on_service_failure = config.abort_on_service_failure,
        max_concurrency = ?config.max_concurrency,
        "Gateway sync configuration loaded"
    );

    let client =
        HttpGatewayClient::from_config(&admin).context("failed to build gateway admin client")?;
    let reconciler = Reconciler::new(Arc::new(client), config);

    let report = reconciler.reconcile(&registry, args.port).await;

    if args.strict && !report.is_success() {
        anyhow::bail!(
            "gateway reconciliation {} finished with {} failed item(s)",
            report.run_id,
            report.failures().count()
        );
    }

    Ok(())
}
