//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a table, or `value` as JSON
pub fn print_table<T: Tabled, V: Serialize>(
    rows: Vec<T>,
    value: &V,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                print_warning("No items found");
                return Ok(());
            }
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format nanocores as cores or millicores
pub fn format_cpu(nanocores: f64) -> String {
    let millicores = nanocores / 1_000_000.0;
    if millicores >= 1000.0 {
        format!("{:.2}", millicores / 1000.0)
    } else {
        format!("{:.0}m", millicores)
    }
}

/// Format KiB as a human-readable string
pub fn format_memory(kib: f64) -> String {
    const MI: f64 = 1024.0;
    const GI: f64 = MI * 1024.0;

    if kib >= GI {
        format!("{:.2}Gi", kib / GI)
    } else if kib >= MI {
        format!("{:.2}Mi", kib / MI)
    } else {
        format!("{:.0}Ki", kib)
    }
}

/// Color an anomaly score relative to the highest score in view
pub fn color_score(score: f32, max: f32) -> String {
    let formatted = format!("{:.4}", score);
    if max <= 0.0 {
        return formatted;
    }
    let ratio = score / max;
    if ratio >= 0.9 {
        formatted.red().bold().to_string()
    } else if ratio >= 0.5 {
        formatted.yellow().to_string()
    } else {
        formatted
    }
}
