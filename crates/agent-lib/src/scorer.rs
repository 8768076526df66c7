//! Scorer client
//!
//! The scorer is a remote, stateful service. `snapshot` feeds a sample into
//! its state and `predict` returns an anomaly score for a sample. Every call
//! is an independent request with no batching.

use crate::error::{ConfigurationError, ScoreError};
use crate::models::UsageSample;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Which scorer operation a call performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMode {
    /// Update the scorer's internal state
    Snapshot,
    /// Request an anomaly score
    Predict,
}

impl ScoreMode {
    /// Select a mode from a pair of flags.
    ///
    /// Exactly one flag must be set; anything else is a caller bug and is
    /// reported instead of silently producing a zero score.
    pub fn from_flags(snapshot: bool, predict: bool) -> Result<Self, ScoreError> {
        match (snapshot, predict) {
            (true, false) => Ok(ScoreMode::Snapshot),
            (false, true) => Ok(ScoreMode::Predict),
            (false, false) => Err(ScoreError::NoModeSelected),
            (true, true) => Err(ScoreError::ConflictingModes),
        }
    }

    /// Path of the scorer endpoint for this mode
    pub fn endpoint(&self) -> &'static str {
        match self {
            ScoreMode::Snapshot => "/snapshot",
            ScoreMode::Predict => "/predict",
        }
    }
}

impl fmt::Display for ScoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreMode::Snapshot => write!(f, "snapshot"),
            ScoreMode::Predict => write!(f, "predict"),
        }
    }
}

/// Remote anomaly scorer
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Send one sample in the given mode and return the reported score
    async fn score(&self, mode: ScoreMode, sample: UsageSample) -> Result<f32, ScoreError>;
}

#[derive(Debug, Serialize)]
struct ScoreRequest {
    cpu: f64,
    memory: f64,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    // The snapshot endpoint answers without a score
    #[serde(default)]
    anomaly_score: Option<f32>,
}

/// Scorer reached over HTTP with JSON bodies
pub struct HttpScorer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpScorer {
    pub fn new(model_address: &str, timeout: Duration) -> Result<Self, ConfigurationError> {
        Url::parse(model_address).map_err(|source| ConfigurationError::InvalidAddress {
            field: "model address",
            value: model_address.to_string(),
            source,
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ConfigurationError::HttpClient)?;

        Ok(Self {
            client,
            base_url: model_address.trim_end_matches('/').to_string(),
        })
    }

    /// Base address of the scorer
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Scorer for HttpScorer {
    async fn score(&self, mode: ScoreMode, sample: UsageSample) -> Result<f32, ScoreError> {
        let endpoint = mode.endpoint();
        let payload = ScoreRequest {
            cpu: sample.cpu_nanocores,
            memory: sample.memory_kib,
        };

        let response = self
            .client
            .post(format!("{}{}", self.base_url, endpoint))
            .json(&payload)
            .send()
            .await
            .map_err(|source| ScoreError::Transport { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoreError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ScoreError::Transport { endpoint, source })?;
        let result: ScoreResponse = serde_json::from_slice(&body)
            .map_err(|source| ScoreError::Decode { endpoint, source })?;

        match (mode, result.anomaly_score) {
            (_, Some(score)) => Ok(score),
            (ScoreMode::Snapshot, None) => Ok(0.0),
            (ScoreMode::Predict, None) => Err(ScoreError::MissingScore { endpoint }),
        }
    }
}
