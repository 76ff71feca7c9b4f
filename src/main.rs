// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use k8s_dns::{
    config::Args,
    constants::{
        CONTROLLER_NAME, DEFAULT_LEASE_DURATION_SECS, DEFAULT_LEASE_GRACE_SECS, LEADER_LEASE_NAME,
        METRICS_SERVER_PATH, TOKIO_WORKER_THREADS,
    },
    context::Context,
    crd::DNSRecord,
    dns::{build_chain, DnsServer},
    metrics,
    providers::{embedded::EmbeddedProvider, Provider, ProviderEnv, Registry},
    reconcilers::{
        run_dns_record_controller, run_ingress_controller, run_service_controller,
        store::{KubeEventSink, KubeRecordStore},
        verify::DnsVerifier,
        RecordReconciler,
    },
    webhook,
    zones::ZoneStore,
};
use kube::{Api, Client};
use kube_lease_manager::LeaseManagerBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    let args = Args::parse();

    // Provider API clients use rustls; pin the ring backend process-wide.
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name(CONTROLLER_NAME)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

/// Initialize logging.
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT=json|text`.
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(args: Args) -> Result<()> {
    init_logging();
    info!(provider = %args.provider, embedded_dns = args.embedded_enabled(), "Starting k8s-dns controller");

    let registry = Registry::with_remote_providers();
    args.validate(&registry)?;

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    let identity = leader_identity();

    // The embedded provider and the DNS server share one zone store.
    let embedded = args
        .uses_embedded_provider()
        .then(|| Arc::new(EmbeddedProvider::new(Arc::new(ZoneStore::new(Some(args.external_address))))));
    let provider: Arc<dyn Provider> = match embedded.as_ref() {
        Some(embedded) => embedded.clone() as Arc<dyn Provider>,
        None => registry.build(&args.provider, &ProviderEnv::from_process())?,
    };

    let verification_server = args.verification_server()?;
    info!(server = %verification_server, "Verifying records against resolver");
    let reconciler = Arc::new(RecordReconciler::new(
        Arc::new(KubeRecordStore::new(client.clone())),
        Arc::new(KubeEventSink::new(client.clone(), Some(identity.clone()))),
        Arc::new(DnsVerifier::new(verification_server)),
        provider,
    ));
    let ctx = Arc::new(Context::new(client.clone(), reconciler, args.workers));

    let ready = Arc::new(AtomicBool::new(false));
    let metrics_listener = TcpListener::bind(args.metrics_addr)
        .await
        .with_context(|| format!("binding metrics server on {}", args.metrics_addr))?;
    tokio::spawn(run_metrics_server(metrics_listener, ready.clone()));

    let dns_server = match embedded.as_ref() {
        Some(embedded) => {
            let chain = build_chain(&args.plugin_config()?, embedded.store().clone());
            let server = DnsServer::bind(args.dns_addr, chain).await?;
            info!(addr = %args.dns_addr, "Embedded DNS server listening");
            tokio::spawn(embedded.clone().run_watcher(Api::<DNSRecord>::all(client.clone())));
            Some(server)
        }
        None => None,
    };

    if args.enable_webhook {
        let webhook_addr = args.webhook_addr;
        let webhook_client = client.clone();
        tokio::spawn(async move {
            if let Err(e) = webhook::serve(webhook_addr, Some(webhook_client)).await {
                error!(error = %e, "Admission webhook stopped");
            }
        });
    }

    ready.store(true, Ordering::SeqCst);
    info!("Starting all controllers");

    let controllers = async {
        if args.enable_leader_election {
            run_with_leader_election(ctx.clone(), &args.leader_election_namespace, &identity).await
        } else {
            run_controllers(ctx.clone()).await
        }
    };
    let dns = async {
        match dns_server {
            Some(server) => server.run().await,
            None => std::future::pending().await,
        }
    };

    // Controllers and the DNS server should never exit - if one does, exit the process
    tokio::select! {
        result = controllers => {
            error!("CRITICAL: controllers exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Controllers exited unexpectedly without error")
        }
        result = dns => {
            error!("CRITICAL: DNS server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("DNS server exited unexpectedly without error")
        }
        () = shutdown_signal() => {
            info!("Shutdown signal received, stopping");
            Ok(())
        }
    }
}

/// Run every controller until one of them exits.
async fn run_controllers(ctx: Arc<Context>) -> Result<()> {
    tokio::select! {
        result = run_dns_record_controller(ctx.clone()) => {
            error!("CRITICAL: DNSRecord controller exited unexpectedly: {:?}", result);
            result
        }
        result = run_ingress_controller(ctx.clone()) => {
            error!("CRITICAL: Ingress controller exited unexpectedly: {:?}", result);
            result
        }
        result = run_service_controller(ctx.clone()) => {
            error!("CRITICAL: Service controller exited unexpectedly: {:?}", result);
            result
        }
    }
}

/// Run the controllers only while this replica holds the leader lease.
async fn run_with_leader_election(ctx: Arc<Context>, namespace: &str, identity: &str) -> Result<()> {
    let manager = LeaseManagerBuilder::new(ctx.client.clone(), LEADER_LEASE_NAME)
        .with_namespace(namespace)
        .with_identity(identity)
        .with_duration(DEFAULT_LEASE_DURATION_SECS)
        .with_grace(DEFAULT_LEASE_GRACE_SECS)
        .build()
        .await?;
    let (mut leader, _lease_task) = manager.watch().await;
    info!(lease = LEADER_LEASE_NAME, namespace = %namespace, identity = %identity, "Waiting for leadership");

    loop {
        if *leader.borrow_and_update() {
            info!(identity = %identity, "Acquired leadership, starting controllers");
            metrics::record_leader_elected(identity);
            tokio::select! {
                result = run_controllers(ctx.clone()) => return result,
                changed = leader.changed() => {
                    changed.context("leader lease watcher stopped")?;
                    warn!(identity = %identity, "Lost leadership, stopping controllers");
                    metrics::record_leader_lost(identity);
                }
            }
        } else {
            leader.changed().await.context("leader lease watcher stopped")?;
        }
    }
}

/// Identity of this replica: `POD_NAME`, then `HOSTNAME`, then the controller name.
fn leader_identity() -> String {
    std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| CONTROLLER_NAME.to_string())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Cannot install SIGTERM handler, waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn metrics_router(ready: Arc<AtomicBool>) -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(readyz_handler))
        .with_state(ready)
}

async fn run_metrics_server(listener: TcpListener, ready: Arc<AtomicBool>) {
    let addr = listener.local_addr().map_or_else(|_| "unknown".to_string(), |a: SocketAddr| a.to_string());
    info!(addr = %addr, path = METRICS_SERVER_PATH, "Metrics server listening");
    if let Err(e) = axum::serve(listener, metrics_router(ready)).await {
        error!(error = %e, "Metrics server stopped");
    }
}

async fn metrics_handler() -> (StatusCode, String) {
    match metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn readyz_handler(State(ready): State<Arc<AtomicBool>>) -> (StatusCode, &'static str) {
    if ready.load(Ordering::SeqCst) {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting")
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod main_tests;
