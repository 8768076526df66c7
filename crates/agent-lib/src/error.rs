//! Error types for the anomaly pipeline
//!
//! Each layer has its own error so callers can tell a malformed quantity
//! apart from an unreachable upstream without string matching.

use thiserror::Error;

/// A textual quantity could not be turned into a number
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("quantity {quantity:?} does not carry the expected unit {unit:?}")]
    MissingUnit {
        quantity: String,
        unit: &'static str,
    },
    #[error("quantity {quantity:?} does not start with a number")]
    InvalidNumber { quantity: String },
    #[error("quantity {quantity:?} is negative")]
    Negative { quantity: String },
    #[error("quantity {quantity:?} is not a finite number")]
    NonFinite { quantity: String },
}

/// Failure reaching or decoding the usage source
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("error fetching usage from {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("usage source {url} responded with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("error decoding usage from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("error parsing usage of container {container} in pod {pod}: {source}")]
    Parse {
        pod: String,
        container: String,
        #[source]
        source: ParseError,
    },
}

/// Failure reaching or decoding the scorer
///
/// Callers treat this as opaque; the variants only exist for log messages.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("no scorer mode selected, exactly one of snapshot or predict is required")]
    NoModeSelected,
    #[error("both snapshot and predict selected, exactly one is required")]
    ConflictingModes,
    #[error("error making {endpoint} request: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} request failed with status {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
    #[error("error decoding {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{endpoint} response carried no anomaly_score")]
    MissingScore { endpoint: &'static str },
}

/// A scoring pass failed; no partial result is produced
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("error scoring container {container} in pod {pod}: {source}")]
    Score {
        pod: String,
        container: String,
        #[source]
        source: ScoreError,
    },
}

/// Error returned by the anomaly plugin's query handler
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("anomaly detection plugin is disabled")]
    Disabled,
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl PluginError {
    /// Machine-readable error code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            PluginError::Disabled => "disabled",
            PluginError::Pipeline(PipelineError::Score { .. }) => "scorer_unavailable",
            PluginError::Pipeline(PipelineError::Fetch(fetch)) => match fetch {
                FetchError::Transport { .. } | FetchError::Status { .. } => "upstream_unavailable",
                FetchError::Decode { .. } | FetchError::Parse { .. } => "invalid_upstream_payload",
            },
        }
    }

    /// HTTP status code the error should be surfaced with
    pub fn status_code(&self) -> u16 {
        match self.code() {
            "disabled" => 501,
            "invalid_upstream_payload" => 500,
            _ => 502,
        }
    }
}

/// Invalid option combination detected at startup
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("threshold percentile must be at most 100, got {0}")]
    PercentileOutOfRange(i64),
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
    #[error("invalid {field} {value:?}: {source}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("failed to read CA certificate {path}: {source}")]
    CaCertificate {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CA certificate: {0}")]
    InvalidCaCertificate(#[source] reqwest::Error),
}
