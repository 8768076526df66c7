//! Core data models for the anomaly agent
//!
//! The upstream shapes follow the `metrics.k8s.io/v1beta1` pod metrics API.
//! The annotated shapes add an `anomaly_score` to every container and are
//! what the anomalies endpoint serves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Group/version stamped on every annotated object
pub const API_GROUP_VERSION: &str = "anomaly.workloads.io/v1alpha1";

/// Kind of a single annotated workload
pub const POD_ANOMALY_KIND: &str = "PodMetricsWithAnomaly";

/// Kind of the annotated list envelope
pub const POD_ANOMALY_LIST_KIND: &str = "PodMetricsWithAnomalyList";

/// Resource path of pod metrics on the usage source
pub const METRICS_PODS_PATH: &str = "/apis/metrics.k8s.io/v1beta1/pods/";

/// Object metadata carried through from the usage source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// List metadata; always empty on the annotated list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListMeta {}

/// Raw usage quantities as reported by the usage source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub cpu: String,
    pub memory: String,
}

/// Upstream per-container usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerMetrics {
    pub name: String,
    pub usage: ResourceUsage,
}

/// Upstream per-pod usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodMetrics {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub timestamp: DateTime<Utc>,
    pub window: String,
    #[serde(default)]
    pub containers: Vec<ContainerMetrics>,
}

/// Upstream pod metrics list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodMetricsList {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub metadata: ListMeta,
    #[serde(default)]
    pub items: Vec<PodMetrics>,
}

/// One container's parsed CPU and memory reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageSample {
    pub cpu_nanocores: f64,
    pub memory_kib: f64,
}

impl UsageSample {
    pub fn new(cpu_nanocores: f64, memory_kib: f64) -> Self {
        Self {
            cpu_nanocores,
            memory_kib,
        }
    }
}

/// A container of a fetched workload, with its parsed sample
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerUsage {
    pub name: String,
    pub usage: ResourceUsage,
    pub sample: UsageSample,
}

/// A fetched workload with its containers in source order
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadUsage {
    pub metadata: ObjectMeta,
    pub timestamp: DateTime<Utc>,
    pub window: String,
    pub containers: Vec<ContainerUsage>,
}

impl WorkloadUsage {
    /// `namespace/name`, or just the name for cluster-scoped objects
    pub fn display_name(&self) -> String {
        match &self.metadata.namespace {
            Some(ns) => format!("{}/{}", ns, self.metadata.name),
            None => self.metadata.name.clone(),
        }
    }
}

/// Container usage annotated with the scorer's anomaly score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerMetricsWithAnomaly {
    pub name: String,
    pub usage: ResourceUsage,
    pub anomaly_score: f32,
}

/// Pod usage annotated with per-container anomaly scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodMetricsWithAnomaly {
    pub kind: String,
    pub api_version: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub timestamp: DateTime<Utc>,
    pub window: String,
    pub containers: Vec<ContainerMetricsWithAnomaly>,
}

impl PodMetricsWithAnomaly {
    pub fn new(
        metadata: ObjectMeta,
        timestamp: DateTime<Utc>,
        window: String,
        containers: Vec<ContainerMetricsWithAnomaly>,
    ) -> Self {
        Self {
            kind: POD_ANOMALY_KIND.to_string(),
            api_version: API_GROUP_VERSION.to_string(),
            metadata,
            timestamp,
            window,
            containers,
        }
    }

    /// Mean anomaly score across containers.
    ///
    /// A pod without containers scores 0 so it never poisons the threshold
    /// computation with NaN.
    pub fn aggregate_score(&self) -> f32 {
        if self.containers.is_empty() {
            return 0.0;
        }
        let total: f32 = self.containers.iter().map(|c| c.anomaly_score).sum();
        total / self.containers.len() as f32
    }
}

/// Envelope served by the anomalies endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodMetricsWithAnomalyList {
    pub kind: String,
    pub api_version: String,
    #[serde(default)]
    pub metadata: ListMeta,
    #[serde(default)]
    pub items: Vec<PodMetricsWithAnomaly>,
}

impl PodMetricsWithAnomalyList {
    pub fn new(items: Vec<PodMetricsWithAnomaly>) -> Self {
        Self {
            kind: POD_ANOMALY_LIST_KIND.to_string(),
            api_version: API_GROUP_VERSION.to_string(),
            metadata: ListMeta::default(),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn annotated(scores: &[f32]) -> PodMetricsWithAnomaly {
        let containers = scores
            .iter()
            .enumerate()
            .map(|(i, score)| ContainerMetricsWithAnomaly {
                name: format!("c{}", i),
                usage: ResourceUsage {
                    cpu: "500000000n".to_string(),
                    memory: "1048576Ki".to_string(),
                },
                anomaly_score: *score,
            })
            .collect();

        PodMetricsWithAnomaly::new(
            ObjectMeta {
                name: "web-0".to_string(),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            "10s".to_string(),
            containers,
        )
    }

    #[test]
    fn test_aggregate_score_is_mean() {
        assert_eq!(annotated(&[2.0, 4.0]).aggregate_score(), 3.0);
    }

    #[test]
    fn test_aggregate_score_without_containers_is_zero() {
        let pod = annotated(&[]);
        assert_eq!(pod.aggregate_score(), 0.0);
        assert!(!pod.aggregate_score().is_nan());
    }

    #[test]
    fn test_list_wire_format() {
        let list = PodMetricsWithAnomalyList::new(vec![annotated(&[1.5])]);
        let value = serde_json::to_value(&list).unwrap();

        assert_eq!(value["kind"], "PodMetricsWithAnomalyList");
        assert_eq!(value["apiVersion"], API_GROUP_VERSION);
        assert_eq!(value["metadata"], serde_json::json!({}));

        let item = &value["items"][0];
        assert_eq!(item["kind"], "PodMetricsWithAnomaly");
        assert_eq!(item["metadata"]["name"], "web-0");
        assert_eq!(item["timestamp"], "2024-01-01T00:00:00Z");
        assert_eq!(item["window"], "10s");
        assert_eq!(item["containers"][0]["usage"]["cpu"], "500000000n");
        assert_eq!(item["containers"][0]["anomaly_score"], 1.5);
    }

    #[test]
    fn test_list_survives_wire_round_trip() {
        let list = PodMetricsWithAnomalyList::new(vec![annotated(&[0.25, 7.5]), annotated(&[])]);
        let encoded = serde_json::to_string(&list).unwrap();
        let decoded: PodMetricsWithAnomalyList = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, list);
        assert_eq!(decoded.items[0].containers[1].name, "c1");
    }

    #[test]
    fn test_decode_upstream_pod_metrics() {
        let body = r#"{
            "kind": "PodMetricsList",
            "apiVersion": "metrics.k8s.io/v1beta1",
            "metadata": {"resourceVersion": ""},
            "items": [{
                "metadata": {
                    "name": "web-0",
                    "namespace": "default",
                    "creationTimestamp": "2024-01-01T00:00:05Z",
                    "labels": {"app": "web"}
                },
                "timestamp": "2024-01-01T00:00:00Z",
                "window": "10.5s",
                "containers": [{"name": "app", "usage": {"cpu": "1200n", "memory": "2048Ki"}}]
            }]
        }"#;

        let list: PodMetricsList = serde_json::from_str(body).unwrap();
        assert_eq!(list.items.len(), 1);
        let pod = &list.items[0];
        assert_eq!(pod.metadata.labels.get("app").map(String::as_str), Some("web"));
        assert_eq!(pod.window, "10.5s");
        assert_eq!(pod.containers[0].usage.memory, "2048Ki");
    }
}
