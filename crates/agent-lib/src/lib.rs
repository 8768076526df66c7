//! Agent library for workload anomaly scoring
//!
//! This crate provides the core functionality for:
//! - Fetching per-container usage from the metrics API
//! - Scoring usage samples against a remote anomaly scorer
//! - Keeping the scorer's state fresh with a background snapshot loop
//! - Percentile filtering of scored workloads
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod plugin;
pub mod quantity;
pub mod sampler;
pub mod scorer;
pub mod source;
pub mod threshold;

#[cfg(test)]
mod testing;

pub use error::{
    ConfigurationError, FetchError, ParseError, PipelineError, PluginError, ScoreError,
};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
pub use pipeline::{ScoredCollection, ScoringPipeline};
pub use plugin::{AnomalyPlugin, PluginConfig};
pub use sampler::{SnapshotLoop, SnapshotResults};
pub use scorer::{HttpScorer, ScoreMode, Scorer};
pub use source::{HttpUsageSource, UsageSource};

pub use async_trait::async_trait;
