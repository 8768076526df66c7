//! In-memory usage source and scorer shared by unit tests

use crate::error::{FetchError, ScoreError};
use crate::models::{ContainerUsage, ObjectMeta, ResourceUsage, UsageSample, WorkloadUsage};
use crate::scorer::{ScoreMode, Scorer};
use crate::source::UsageSource;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Build a workload in `default` with `(container, cpu nanocores, memory KiB)` entries
pub fn workload(name: &str, containers: &[(&str, f64, f64)]) -> WorkloadUsage {
    WorkloadUsage {
        metadata: ObjectMeta {
            name: name.to_string(),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        window: "10s".to_string(),
        containers: containers
            .iter()
            .map(|(container, cpu, memory)| ContainerUsage {
                name: container.to_string(),
                usage: ResourceUsage {
                    cpu: format!("{}n", cpu),
                    memory: format!("{}Ki", memory),
                },
                sample: UsageSample::new(*cpu, *memory),
            })
            .collect(),
    }
}

pub struct MockSource {
    workloads: Option<Vec<WorkloadUsage>>,
    fetches: AtomicUsize,
}

impl MockSource {
    pub fn new(workloads: Vec<WorkloadUsage>) -> Self {
        Self {
            workloads: Some(workloads),
            fetches: AtomicUsize::new(0),
        }
    }

    /// A source whose every fetch fails with a 503
    pub fn failing() -> Self {
        Self {
            workloads: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UsageSource for MockSource {
    async fn fetch(&self) -> Result<Vec<WorkloadUsage>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.workloads.clone().ok_or_else(|| FetchError::Status {
            url: "http://metrics.test/apis/metrics.k8s.io/v1beta1/pods/".to_string(),
            status: 503,
            body: "service unavailable".to_string(),
        })
    }
}

enum Behavior {
    Constant(f32),
    /// Return scores in call order, cycling
    Sequence(Vec<f32>),
    /// Fail the call with this zero-based index, score 1.0 otherwise
    FailOn(usize),
}

pub struct MockScorer {
    behavior: Behavior,
    calls: Mutex<Vec<(ScoreMode, UsageSample)>>,
}

impl MockScorer {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn constant(score: f32) -> Self {
        Self::with_behavior(Behavior::Constant(score))
    }

    pub fn sequence(scores: Vec<f32>) -> Self {
        Self::with_behavior(Behavior::Sequence(scores))
    }

    pub fn failing_on(call: usize) -> Self {
        Self::with_behavior(Behavior::FailOn(call))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn modes(&self) -> Vec<ScoreMode> {
        self.calls.lock().unwrap().iter().map(|(mode, _)| *mode).collect()
    }

    pub fn samples(&self) -> Vec<UsageSample> {
        self.calls.lock().unwrap().iter().map(|(_, s)| *s).collect()
    }
}

#[async_trait]
impl Scorer for MockScorer {
    async fn score(&self, mode: ScoreMode, sample: UsageSample) -> Result<f32, ScoreError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((mode, sample));
            calls.len() - 1
        };

        match &self.behavior {
            Behavior::Constant(score) => Ok(*score),
            Behavior::Sequence(scores) => Ok(scores[index % scores.len()]),
            Behavior::FailOn(failing) if *failing == index => Err(ScoreError::Status {
                endpoint: mode.endpoint(),
                status: 503,
                body: "model unavailable".to_string(),
            }),
            Behavior::FailOn(_) => Ok(1.0),
        }
    }
}
