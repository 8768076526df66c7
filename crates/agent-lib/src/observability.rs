//! Observability infrastructure for the anomaly agent
//!
//! Provides:
//! - Prometheus metrics for snapshot ticks and scoring passes
//! - Structured JSON logging of lifecycle and anomaly events

use prometheus::{
    register_histogram, register_int_counter, Encoder, Histogram, IntCounter, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for remote round trips (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

struct AgentMetricsInner {
    snapshot_tick_seconds: Histogram,
    scoring_pass_seconds: Histogram,
    samples_snapshotted: IntCounter,
    workloads_scored: IntCounter,
    workloads_returned: IntCounter,
    snapshot_errors: IntCounter,
    scoring_errors: IntCounter,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            snapshot_tick_seconds: register_histogram!(
                "anomaly_agent_snapshot_tick_seconds",
                "Time spent fetching usage and pushing snapshots to the scorer",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register snapshot_tick_seconds"),

            scoring_pass_seconds: register_histogram!(
                "anomaly_agent_scoring_pass_seconds",
                "Time spent fetching usage and predicting scores for one query",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register scoring_pass_seconds"),

            samples_snapshotted: register_int_counter!(
                "anomaly_agent_samples_snapshotted_total",
                "Usage samples accepted by the scorer in snapshot mode"
            )
            .expect("Failed to register samples_snapshotted"),

            workloads_scored: register_int_counter!(
                "anomaly_agent_workloads_scored_total",
                "Workloads annotated with an anomaly score"
            )
            .expect("Failed to register workloads_scored"),

            workloads_returned: register_int_counter!(
                "anomaly_agent_workloads_returned_total",
                "Workloads returned after percentile filtering"
            )
            .expect("Failed to register workloads_returned"),

            snapshot_errors: register_int_counter!(
                "anomaly_agent_snapshot_errors_total",
                "Failed usage fetches or snapshot calls in the background loop"
            )
            .expect("Failed to register snapshot_errors"),

            scoring_errors: register_int_counter!(
                "anomaly_agent_scoring_errors_total",
                "Queries that failed to produce annotated usage"
            )
            .expect("Failed to register scoring_errors"),
        }
    }
}

/// Handle to the process-wide Prometheus metrics.
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct AgentMetrics {
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new)
    }

    pub fn observe_snapshot_tick(&self, duration_secs: f64) {
        self.inner().snapshot_tick_seconds.observe(duration_secs);
    }

    pub fn observe_scoring_pass(&self, duration_secs: f64) {
        self.inner().scoring_pass_seconds.observe(duration_secs);
    }

    pub fn add_samples_snapshotted(&self, count: u64) {
        self.inner().samples_snapshotted.inc_by(count);
    }

    pub fn add_workloads_scored(&self, count: u64) {
        self.inner().workloads_scored.inc_by(count);
    }

    pub fn add_workloads_returned(&self, count: u64) {
        self.inner().workloads_returned.inc_by(count);
    }

    pub fn add_snapshot_errors(&self, count: u64) {
        self.inner().snapshot_errors.inc_by(count);
    }

    pub fn inc_scoring_errors(&self) {
        self.inner().scoring_errors.inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode_text(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// Structured logger for agent events
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    /// Log a workload that survived percentile filtering
    pub fn log_anomalous_workload(
        &self,
        pod_name: &str,
        namespace: &str,
        aggregate_score: f32,
        cutoff: f32,
        percentile: i64,
    ) {
        info!(
            event = "anomalous_workload",
            node = %self.node_name,
            pod_name = %pod_name,
            namespace = %namespace,
            aggregate_score = aggregate_score,
            cutoff = cutoff,
            percentile = percentile,
            "Workload at or above anomaly percentile"
        );
    }

    /// Log a failed snapshot tick
    pub fn log_snapshot_failure(&self, error: &dyn std::error::Error) {
        warn!(
            event = "snapshot_failed",
            node = %self.node_name,
            error = %error,
            "Failed to generate snapshot"
        );
    }

    pub fn log_startup(&self, version: &str, enabled: bool) {
        info!(
            event = "agent_started",
            node = %self.node_name,
            agent_version = %version,
            anomaly_plugin_enabled = enabled,
            "Anomaly agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Anomaly agent shutting down"
        );
    }
}
