//! Usage source client
//!
//! Pulls the current pod metrics list from the upstream metrics API and
//! parses every container's quantities. One malformed quantity fails the
//! whole fetch; a partial list would under-report anomalies.

use crate::error::{ConfigurationError, FetchError};
use crate::models::{
    ContainerUsage, PodMetrics, PodMetricsList, UsageSample, WorkloadUsage, METRICS_PODS_PATH,
};
use crate::quantity::{parse_cpu_nanocores, parse_memory_kib};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Source of current per-container usage
#[async_trait]
pub trait UsageSource: Send + Sync {
    /// Fetch usage for every monitored workload, containers in source order
    async fn fetch(&self) -> Result<Vec<WorkloadUsage>, FetchError>;
}

impl TryFrom<PodMetrics> for WorkloadUsage {
    type Error = FetchError;

    fn try_from(pod: PodMetrics) -> Result<Self, Self::Error> {
        let mut containers = Vec::with_capacity(pod.containers.len());

        for container in pod.containers {
            let parse_err = |source| FetchError::Parse {
                pod: pod.metadata.name.clone(),
                container: container.name.clone(),
                source,
            };
            let cpu = parse_cpu_nanocores(&container.usage.cpu).map_err(parse_err)?;
            let memory = parse_memory_kib(&container.usage.memory).map_err(parse_err)?;

            containers.push(ContainerUsage {
                name: container.name,
                usage: container.usage,
                sample: UsageSample::new(cpu, memory),
            });
        }

        Ok(WorkloadUsage {
            metadata: pod.metadata,
            timestamp: pod.timestamp,
            window: pod.window,
            containers,
        })
    }
}

/// Usage source backed by the metrics API over HTTP
pub struct HttpUsageSource {
    client: reqwest::Client,
    url: String,
    bearer_token: Option<String>,
}

impl HttpUsageSource {
    /// Create a client for `<base_address>/apis/metrics.k8s.io/v1beta1/pods/`.
    ///
    /// Server certificates are checked against the built-in web roots, so an
    /// HTTPS address must present a publicly trusted certificate. Use
    /// [`HttpUsageSource::with_ca_certificate`] for a kubelet or proxy with
    /// a private CA.
    pub fn new(base_address: &str, timeout: Duration) -> Result<Self, ConfigurationError> {
        Self::build(base_address, timeout, None)
    }

    /// Like [`HttpUsageSource::new`], additionally trusting the PEM CA certificate `pem`
    pub fn with_ca_certificate(
        base_address: &str,
        timeout: Duration,
        pem: &[u8],
    ) -> Result<Self, ConfigurationError> {
        let certificate =
            reqwest::Certificate::from_pem(pem).map_err(ConfigurationError::InvalidCaCertificate)?;
        Self::build(base_address, timeout, Some(certificate))
    }

    fn build(
        base_address: &str,
        timeout: Duration,
        ca_certificate: Option<reqwest::Certificate>,
    ) -> Result<Self, ConfigurationError> {
        let url = format!("{}{}", base_address.trim_end_matches('/'), METRICS_PODS_PATH);
        Url::parse(&url).map_err(|source| ConfigurationError::InvalidAddress {
            field: "source address",
            value: base_address.to_string(),
            source,
        })?;

        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(certificate) = ca_certificate {
            builder = builder.add_root_certificate(certificate);
        }
        let client = builder.build().map_err(ConfigurationError::HttpClient)?;

        Ok(Self {
            client,
            url,
            bearer_token: None,
        })
    }

    /// Authenticate against the usage source with a bearer token
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Full URL the client fetches from
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl UsageSource for HttpUsageSource {
    async fn fetch(&self) -> Result<Vec<WorkloadUsage>, FetchError> {
        let transport = |source| FetchError::Transport {
            url: self.url.clone(),
            source,
        };

        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        let list: PodMetricsList =
            serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
                url: self.url.clone(),
                source,
            })?;

        debug!(pods = list.items.len(), url = %self.url, "Fetched pod metrics");

        list.items.into_iter().map(WorkloadUsage::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;

    const POD_METRICS: &str = r#"{
        "kind": "PodMetricsList",
        "apiVersion": "metrics.k8s.io/v1beta1",
        "metadata": {},
        "items": [
            {
                "metadata": {"name": "web-0", "namespace": "default"},
                "timestamp": "2024-01-01T00:00:00Z",
                "window": "10s",
                "containers": [
                    {"name": "app", "usage": {"cpu": "500000000n", "memory": "1048576Ki"}},
                    {"name": "sidecar", "usage": {"cpu": "1000n", "memory": "512Ki"}}
                ]
            },
            {
                "metadata": {"name": "db-0", "namespace": "storage"},
                "timestamp": "2024-01-01T00:00:01Z",
                "window": "10s",
                "containers": [
                    {"name": "postgres", "usage": {"cpu": "0", "memory": "2048Ki"}}
                ]
            }
        ]
    }"#;

    fn source_for(server: &mockito::Server) -> HttpUsageSource {
        HttpUsageSource::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_url_joins_pods_path() {
        let source = HttpUsageSource::new("https://10.0.0.1:10250/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            source.url(),
            "https://10.0.0.1:10250/apis/metrics.k8s.io/v1beta1/pods/"
        );
    }

    #[test]
    fn test_invalid_address_rejected() {
        let result = HttpUsageSource::new("not a url", Duration::from_secs(1));
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_parses_samples_in_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", METRICS_PODS_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(POD_METRICS)
            .create_async()
            .await;

        let workloads = source_for(&server).fetch().await.unwrap();
        mock.assert_async().await;

        assert_eq!(workloads.len(), 2);
        assert_eq!(workloads[0].display_name(), "default/web-0");

        let names: Vec<_> = workloads[0].containers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["app", "sidecar"]);

        let sample = workloads[0].containers[0].sample;
        assert_eq!(sample.cpu_nanocores, 500_000_000.0);
        assert_eq!(sample.memory_kib, 1_048_576.0);
        assert_eq!(workloads[1].containers[0].sample.cpu_nanocores, 0.0);
    }

    #[tokio::test]
    async fn test_fetch_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", METRICS_PODS_PATH)
            .match_header("authorization", "Bearer secret-token")
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let workloads = source_for(&server)
            .with_bearer_token("secret-token")
            .fetch()
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(workloads.is_empty());
    }

    #[tokio::test]
    async fn test_single_bad_quantity_fails_whole_fetch() {
        let mut server = mockito::Server::new_async().await;
        let body = POD_METRICS.replace("\"512Ki\"", "\"1Mi\"");
        let _mock = server
            .mock("GET", METRICS_PODS_PATH)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let err = source_for(&server).fetch().await.unwrap_err();
        match err {
            FetchError::Parse {
                pod,
                container,
                source,
            } => {
                assert_eq!(pod, "web-0");
                assert_eq!(container, "sidecar");
                assert!(matches!(source, ParseError::MissingUnit { unit: "Ki", .. }));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", METRICS_PODS_PATH)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = source_for(&server).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", METRICS_PODS_PATH)
            .with_status(401)
            .with_body("Unauthorized")
            .create_async()
            .await;

        let err = source_for(&server).fetch().await.unwrap_err();
        match err {
            FetchError::Status { status, body, .. } => {
                assert_eq!(status, 401);
                assert_eq!(body, "Unauthorized");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_source() {
        let source = HttpUsageSource::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }
}
