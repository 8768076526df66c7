//! Anomaly listing command

use agent_lib::quantity::{parse_cpu_nanocores, parse_memory_kib};
use agent_lib::{PodMetricsWithAnomaly, PodMetricsWithAnomalyList};
use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_score, format_cpu, format_memory, print_table, OutputFormat};

const ANOMALIES_PATH: &str = "apis/metrics.k8s.io/v1beta1/pods/anomalies";

/// Row for the anomalies table
#[derive(Tabled)]
struct AnomalyRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Pod")]
    pod: String,
    #[tabled(rename = "Containers")]
    containers: usize,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Timestamp")]
    timestamp: String,
}

/// Keep only workloads in `namespace`, when given
fn filter_namespace(
    items: Vec<PodMetricsWithAnomaly>,
    namespace: Option<&str>,
) -> Vec<PodMetricsWithAnomaly> {
    match namespace {
        Some(ns) => items
            .into_iter()
            .filter(|p| p.metadata.namespace.as_deref() == Some(ns))
            .collect(),
        None => items,
    }
}

/// Summed CPU and memory of a pod's containers, `-` if any quantity is unparsable
fn pod_usage(pod: &PodMetricsWithAnomaly) -> (String, String) {
    let cpu: Result<f64, _> = pod
        .containers
        .iter()
        .map(|c| parse_cpu_nanocores(&c.usage.cpu))
        .sum();
    let memory: Result<f64, _> = pod
        .containers
        .iter()
        .map(|c| parse_memory_kib(&c.usage.memory))
        .sum();

    (
        cpu.map(format_cpu).unwrap_or_else(|_| "-".to_string()),
        memory.map(format_memory).unwrap_or_else(|_| "-".to_string()),
    )
}

fn to_rows(items: &[PodMetricsWithAnomaly]) -> Vec<AnomalyRow> {
    let max = items
        .iter()
        .map(|p| p.aggregate_score())
        .fold(0.0_f32, f32::max);

    items
        .iter()
        .map(|p| {
            let (cpu, memory) = pod_usage(p);
            AnomalyRow {
                namespace: p.metadata.namespace.clone().unwrap_or_default(),
                pod: p.metadata.name.clone(),
                containers: p.containers.len(),
                cpu,
                memory,
                score: color_score(p.aggregate_score(), max),
                timestamp: p.timestamp.to_rfc3339(),
            }
        })
        .collect()
}

/// Fetch and print the anomalous workloads reported by the agent
pub async fn get_anomalies(
    client: &ApiClient,
    namespace: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let list: PodMetricsWithAnomalyList = client.get(ANOMALIES_PATH).await?;
    let items = filter_namespace(list.items, namespace.as_deref());

    print_table(to_rows(&items), &items, format)?;
    if matches!(format, OutputFormat::Table) && !items.is_empty() {
        println!("\nTotal: {} workloads", items.len());
    }

    Ok(())
}
