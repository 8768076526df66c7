//! One-off scorer requests

use agent_lib::{HttpScorer, ScoreMode, Scorer, UsageSample};
use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;

use crate::output::{print_success, OutputFormat};

#[derive(Serialize)]
struct ScoreOutput {
    mode: String,
    cpu: f64,
    memory: f64,
    anomaly_score: f32,
}

/// Send one sample to the scorer in the selected mode
pub async fn score_sample(
    model_address: &str,
    snapshot: bool,
    predict: bool,
    cpu: f64,
    memory: f64,
    format: OutputFormat,
) -> Result<()> {
    let mode = ScoreMode::from_flags(snapshot, predict)?;
    let scorer = HttpScorer::new(model_address, Duration::from_secs(10))
        .context("Invalid model address")?;

    let sample = UsageSample::new(cpu, memory);
    let anomaly_score = scorer.score(mode, sample).await?;

    match format {
        OutputFormat::Json => {
            let output = ScoreOutput {
                mode: mode.to_string(),
                cpu,
                memory,
                anomaly_score,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => match mode {
            ScoreMode::Snapshot => print_success("Sample recorded by scorer"),
            ScoreMode::Predict => {
                print_success(&format!("Anomaly score: {:.4}", anomaly_score));
            }
        },
    }

    Ok(())
}
