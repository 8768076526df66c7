//! Background snapshot loop
//!
//! Once per interval, fetches current usage and pushes every sample to the
//! scorer in snapshot mode so its state tracks the cluster. Per-tick
//! failures are logged and counted; they never stop the loop.
//!
//! The sleep between ticks does not subtract the time the tick took, so a
//! slow scorer stretches the effective period.

use crate::error::FetchError;
use crate::health::{components, HealthRegistry};
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::scorer::{ScoreMode, Scorer};
use crate::source::UsageSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::Instant;
use tracing::{debug, info};

/// Outcome of one snapshot tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotResults {
    pub success_count: usize,
    pub error_count: usize,
}

/// Periodic snapshot task
pub struct SnapshotLoop {
    source: Arc<dyn UsageSource>,
    scorer: Arc<dyn Scorer>,
    interval: Duration,
    health: HealthRegistry,
    metrics: AgentMetrics,
    logger: StructuredLogger,
}

impl SnapshotLoop {
    pub fn new(
        source: Arc<dyn UsageSource>,
        scorer: Arc<dyn Scorer>,
        interval: Duration,
        health: HealthRegistry,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            source,
            scorer,
            interval,
            health,
            metrics: AgentMetrics::new(),
            logger,
        }
    }

    /// Run until `shutdown` fires or its sender is dropped.
    ///
    /// Returns immediately when the interval is zero. Shutdown is observed
    /// before a tick starts and while sleeping, never in the middle of a tick.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.interval.is_zero() {
            info!("Polling for snapshot generation is disabled");
            return;
        }

        info!(
            interval_secs = self.interval.as_secs_f64(),
            "Starting snapshot loop"
        );

        let mut tick_count = 0u64;

        loop {
            if !matches!(shutdown.try_recv(), Err(TryRecvError::Empty)) {
                break;
            }

            let start = Instant::now();
            let outcome = self.snapshot_all().await;
            self.metrics
                .observe_snapshot_tick(start.elapsed().as_secs_f64());
            tick_count += 1;

            self.record_outcome(&outcome).await;
            if let Ok(results) = outcome {
                debug!(
                    tick = tick_count,
                    snapshotted = results.success_count,
                    errors = results.error_count,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Snapshot tick complete"
                );
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.recv() => break,
            }
        }

        info!(ticks = tick_count, "Stopping polling for snapshot generation");
    }

    /// Fetch usage once and snapshot every sample.
    ///
    /// A failed fetch fails the tick. A failed snapshot call is counted and
    /// the remaining samples are still pushed.
    pub async fn snapshot_all(&self) -> Result<SnapshotResults, FetchError> {
        let workloads = self.source.fetch().await?;
        let mut results = SnapshotResults::default();

        for workload in &workloads {
            for container in &workload.containers {
                match self.scorer.score(ScoreMode::Snapshot, container.sample).await {
                    Ok(_) => results.success_count += 1,
                    Err(e) => {
                        results.error_count += 1;
                        debug!(
                            pod = %workload.display_name(),
                            container = %container.name,
                            error = %e,
                            "Failed to snapshot sample"
                        );
                    }
                }
            }
        }

        Ok(results)
    }

    async fn record_outcome(&self, outcome: &Result<SnapshotResults, FetchError>) {
        match outcome {
            Ok(results) => {
                self.metrics
                    .add_samples_snapshotted(results.success_count as u64);
                self.health.record_success(components::USAGE_SOURCE).await;

                if results.error_count == 0 {
                    self.health.record_success(components::SNAPSHOT_LOOP).await;
                } else {
                    self.metrics.add_snapshot_errors(results.error_count as u64);
                    self.health
                        .record_failure(
                            components::SNAPSHOT_LOOP,
                            format!("{} snapshot calls failed", results.error_count),
                        )
                        .await;
                }
            }
            Err(e) => {
                self.metrics.add_snapshot_errors(1);
                self.logger.log_snapshot_failure(e);
                self.health
                    .record_failure(components::USAGE_SOURCE, e.to_string())
                    .await;
                self.health
                    .record_failure(components::SNAPSHOT_LOOP, e.to_string())
                    .await;
            }
        }
    }
}
