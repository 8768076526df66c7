//! Request-time scoring pipeline
//!
//! Each run fetches fresh usage and asks the scorer for a prediction per
//! container. Nothing is cached: concurrent queries each pay the full
//! round-trip cost and each see their own consistent view of usage.

use crate::error::PipelineError;
use crate::models::{ContainerMetricsWithAnomaly, PodMetricsWithAnomaly};
use crate::scorer::{ScoreMode, Scorer};
use crate::source::UsageSource;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Annotated workloads with their aggregate scores, index for index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoredCollection {
    pub items: Vec<PodMetricsWithAnomaly>,
    pub scores: Vec<f32>,
}

impl ScoredCollection {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            scores: Vec::with_capacity(capacity),
        }
    }

    /// Append a workload, recording its aggregate score alongside
    pub fn push(&mut self, item: PodMetricsWithAnomaly) {
        self.scores.push(item.aggregate_score());
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Fetch, predict, assemble
pub struct ScoringPipeline {
    source: Arc<dyn UsageSource>,
    scorer: Arc<dyn Scorer>,
}

impl ScoringPipeline {
    pub fn new(source: Arc<dyn UsageSource>, scorer: Arc<dyn Scorer>) -> Self {
        Self { source, scorer }
    }

    /// Run one scoring pass.
    ///
    /// Any fetch or predict failure aborts the pass; partial annotations
    /// are never returned.
    pub async fn run(&self) -> Result<ScoredCollection, PipelineError> {
        let workloads = self.source.fetch().await?;
        let mut collection = ScoredCollection::with_capacity(workloads.len());
        let mut seen = HashSet::with_capacity(workloads.len());

        for workload in workloads {
            let key = (
                workload.metadata.namespace.clone(),
                workload.metadata.name.clone(),
            );
            if !seen.insert(key) {
                warn!(pod = %workload.display_name(), "Skipping duplicate pod in usage fetch");
                continue;
            }

            let mut containers = Vec::with_capacity(workload.containers.len());
            for container in &workload.containers {
                let anomaly_score = self
                    .scorer
                    .score(ScoreMode::Predict, container.sample)
                    .await
                    .map_err(|source| PipelineError::Score {
                        pod: workload.display_name(),
                        container: container.name.clone(),
                        source,
                    })?;

                containers.push(ContainerMetricsWithAnomaly {
                    name: container.name.clone(),
                    usage: container.usage.clone(),
                    anomaly_score,
                });
            }

            collection.push(PodMetricsWithAnomaly::new(
                workload.metadata,
                workload.timestamp,
                workload.window,
                containers,
            ));
        }

        debug!(pods = collection.len(), "Scored pod metrics");
        Ok(collection)
    }
}
