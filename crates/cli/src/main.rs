//! Anomaly agent CLI
//!
//! A command-line tool for listing anomalous workloads reported by an
//! agent and for sending one-off samples to the anomaly scorer.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{anomalies, score};

/// Workload anomaly agent CLI
#[derive(Parser)]
#[command(name = "anomalyctl")]
#[command(author, version, about = "CLI for the Workload Anomaly Agent", long_about = None)]
pub struct Cli {
    /// Agent API URL (can also be set via ANOMALYCTL_API_URL env var)
    #[arg(long, env = "ANOMALYCTL_API_URL", default_value = "http://localhost:8002")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get resources from the agent
    #[command(subcommand)]
    Get(GetCommands),

    /// Send a single usage sample to the anomaly scorer
    Score {
        /// Feed the sample into the scorer's state
        #[arg(long)]
        snapshot: bool,

        /// Request an anomaly score for the sample
        #[arg(long)]
        predict: bool,

        /// CPU usage in nanocores
        #[arg(long)]
        cpu: f64,

        /// Memory usage in KiB
        #[arg(long)]
        memory: f64,

        /// Anomaly scorer address
        #[arg(long, env = "ANOMALYCTL_MODEL_ADDRESS", default_value = "http://127.0.0.1:5001")]
        model_address: String,
    },
}

#[derive(Subcommand)]
pub enum GetCommands {
    /// Get workloads scored above the agent's percentile cutoff
    Anomalies {
        /// Filter by namespace
        #[arg(long, short)]
        namespace: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Get(get_cmd) => match get_cmd {
            GetCommands::Anomalies { namespace } => {
                let client = client::ApiClient::new(&cli.api_url)?;
                anomalies::get_anomalies(&client, namespace, cli.format).await?;
            }
        },
        Commands::Score {
            snapshot,
            predict,
            cpu,
            memory,
            model_address,
        } => {
            score::score_sample(&model_address, snapshot, predict, cpu, memory, cli.format).await?;
        }
    }

    Ok(())
}
