//! Anomaly agent - workload anomaly scoring daemon
//!
//! This binary runs as a DaemonSet on each Kubernetes node, keeping the
//! anomaly scorer fed with usage snapshots and serving pod metrics
//! annotated with anomaly scores.

use agent_lib::{
    health::{components, HealthRegistry},
    observability::{AgentMetrics, StructuredLogger},
    plugin::AnomalyPlugin,
};
use anomaly_agent::{api, config::AgentConfig};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting anomaly-agent");

    let config = AgentConfig::load()?;
    info!(node_name = %config.node_name, port = config.listen_port, "Agent configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::USAGE_SOURCE).await;
    health_registry.register(components::SCORER).await;
    health_registry.register(components::SNAPSHOT_LOOP).await;

    let metrics = AgentMetrics::new();
    let logger = StructuredLogger::new(&config.node_name);

    let plugin = AnomalyPlugin::from_config(config.plugin_config(), health_registry.clone())?
        .with_logger(logger.clone());
    let plugin = Arc::new(plugin);
    logger.log_startup(AGENT_VERSION, plugin.is_enabled());

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let snapshot_handle = plugin.start_background_task(shutdown_rx);

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        plugin.clone(),
    ));

    health_registry.set_ready(true).await;

    let (reason_tx, reason_rx) = tokio::sync::oneshot::channel();
    let shutdown = async move {
        let reason = shutdown_signal().await;
        let _ = reason_tx.send(reason);
    };

    if let Err(e) = api::serve(config.listen_port, app_state, shutdown).await {
        warn!(error = %e, "API server stopped with error");
        let _ = shutdown_tx.send(());
        return Err(e);
    }

    let reason = reason_rx.await.unwrap_or("server stopped");
    health_registry.set_ready(false).await;
    logger.log_shutdown(reason);

    let _ = shutdown_tx.send(());
    if let Some(handle) = snapshot_handle {
        if let Err(e) = handle.await {
            warn!(error = %e, "Snapshot loop did not stop cleanly");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM and name the signal received
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT received",
        _ = terminate => "SIGTERM received",
    }
}
