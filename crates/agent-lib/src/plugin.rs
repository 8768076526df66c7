//! Anomaly plugin façade
//!
//! Ties the usage source, scorer, snapshot loop, scoring pipeline and
//! percentile filter together behind an enable flag. The background loop is
//! started at most once per plugin instance.

use crate::error::{ConfigurationError, PipelineError, PluginError};
use crate::health::{components, HealthRegistry};
use crate::models::PodMetricsWithAnomalyList;
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::pipeline::ScoringPipeline;
use crate::sampler::SnapshotLoop;
use crate::scorer::{HttpScorer, Scorer};
use crate::source::{HttpUsageSource, UsageSource};
use crate::threshold::{filter_by_percentile, percentile_cutoff};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

/// Plugin settings
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Serve anomalies and run the snapshot loop
    pub enable: bool,
    /// Snapshot interval; zero disables polling
    pub poll_interval: Duration,
    /// Percentile threshold; zero or negative disables filtering
    pub threshold_percentile: i64,
    /// Scorer base address
    pub model_address: String,
    /// Usage source base address
    pub source_address: String,
    /// Bearer token for the usage source
    pub source_token: Option<String>,
    /// PEM CA certificate trusted for the usage source, e.g. the kubelet's
    /// self-signed serving certificate
    pub source_ca_path: Option<String>,
    /// Timeout applied to every remote call
    pub request_timeout: Duration,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            enable: true,
            poll_interval: Duration::from_secs(10),
            threshold_percentile: 99,
            model_address: "http://127.0.0.1:5001".to_string(),
            source_address: "https://127.0.0.1:10250".to_string(),
            source_token: None,
            source_ca_path: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl PluginConfig {
    /// Reject settings that cannot be honored
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.threshold_percentile > 100 {
            return Err(ConfigurationError::PercentileOutOfRange(
                self.threshold_percentile,
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigurationError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Anomaly detection plugin
pub struct AnomalyPlugin {
    config: PluginConfig,
    source: Arc<dyn UsageSource>,
    scorer: Arc<dyn Scorer>,
    pipeline: ScoringPipeline,
    health: HealthRegistry,
    metrics: AgentMetrics,
    logger: StructuredLogger,
    started: AtomicBool,
}

impl AnomalyPlugin {
    pub const NAME: &'static str = "anomaly";

    pub fn new(
        config: PluginConfig,
        source: Arc<dyn UsageSource>,
        scorer: Arc<dyn Scorer>,
        health: HealthRegistry,
    ) -> Self {
        Self {
            pipeline: ScoringPipeline::new(source.clone(), scorer.clone()),
            config,
            source,
            scorer,
            health,
            metrics: AgentMetrics::new(),
            logger: StructuredLogger::new(Self::NAME),
            started: AtomicBool::new(false),
        }
    }

    /// Validate `config` and build the HTTP-backed source and scorer
    pub fn from_config(
        config: PluginConfig,
        health: HealthRegistry,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let mut source = match &config.source_ca_path {
            Some(path) => {
                let pem = std::fs::read(path).map_err(|source| ConfigurationError::CaCertificate {
                    path: path.clone(),
                    source,
                })?;
                HttpUsageSource::with_ca_certificate(
                    &config.source_address,
                    config.request_timeout,
                    &pem,
                )?
            }
            None => HttpUsageSource::new(&config.source_address, config.request_timeout)?,
        };
        if let Some(token) = &config.source_token {
            source = source.with_bearer_token(token.clone());
        }
        let scorer = HttpScorer::new(&config.model_address, config.request_timeout)?;

        info!(
            source = %source.url(),
            model = %scorer.base_url(),
            "Anomaly plugin configured"
        );

        Ok(Self::new(config, Arc::new(source), Arc::new(scorer), health))
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enable
    }

    /// Start the snapshot loop.
    ///
    /// Only the first call on an enabled plugin spawns anything; later calls
    /// and calls on a disabled plugin return `None`.
    pub fn start_background_task(
        &self,
        shutdown: broadcast::Receiver<()>,
    ) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            return None;
        }
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let snapshot_loop = SnapshotLoop::new(
            self.source.clone(),
            self.scorer.clone(),
            self.config.poll_interval,
            self.health.clone(),
            self.logger.clone(),
        );
        Some(tokio::spawn(snapshot_loop.run(shutdown)))
    }

    /// Score current usage and apply the percentile filter
    pub async fn handle_query(&self) -> Result<PodMetricsWithAnomalyList, PluginError> {
        if !self.is_enabled() {
            return Err(PluginError::Disabled);
        }

        let start = Instant::now();
        let result = self.pipeline.run().await;
        self.metrics
            .observe_scoring_pass(start.elapsed().as_secs_f64());

        let collection = match result {
            Ok(collection) => {
                self.health.record_success(components::USAGE_SOURCE).await;
                self.health.record_success(components::SCORER).await;
                collection
            }
            Err(e) => {
                self.metrics.inc_scoring_errors();
                let component = match &e {
                    PipelineError::Fetch(_) => components::USAGE_SOURCE,
                    PipelineError::Score { .. } => components::SCORER,
                };
                self.health.record_failure(component, e.to_string()).await;
                warn!(error = %e, "Failed to score pod metrics");
                return Err(e.into());
            }
        };

        let percentile = self.config.threshold_percentile;
        let scored = collection.len();
        let cutoff = (percentile > 0).then(|| percentile_cutoff(&collection.scores, percentile));
        let items = filter_by_percentile(collection, percentile);

        if let Some(cutoff) = cutoff {
            for item in &items {
                self.logger.log_anomalous_workload(
                    &item.metadata.name,
                    item.metadata.namespace.as_deref().unwrap_or_default(),
                    item.aggregate_score(),
                    cutoff,
                    percentile,
                );
            }
        }

        self.metrics.add_workloads_scored(scored as u64);
        self.metrics.add_workloads_returned(items.len() as u64);

        Ok(PodMetricsWithAnomalyList::new(items))
    }
}
