use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution, Max, Min};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::application::pipeline::{PipelineOutcome, SignalDisposition};
use crate::domain::performance::ActualComparison;
use crate::domain::series::{CompositeSeries, SignalSeries};

#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: DateTime<Utc>,
    pub configuration: String,
    pub signals: Vec<SignalReportEntry>,
    pub composite: CompositeSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_comparison: Option<ActualComparison>,
}

/// One audited signal: how it fared on the way into the composite.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignalReportEntry {
    pub signal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t_stat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompositeSummary {
    pub periods: usize,
    pub first_period: NaiveDate,
    pub last_period: NaiveDate,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Per-signal summary statistics for the `describe` command.
#[derive(Debug, Serialize)]
pub struct SignalSummary {
    pub signal: String,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

pub struct RunReporter {
    output_dir: PathBuf,
}

impl RunReporter {
    pub fn new(output_dir: &str) -> Self {
        let path = PathBuf::from(output_dir);
        if !path.exists() {
            fs::create_dir_all(&path).expect("Failed to create report output directory");
        }
        Self { output_dir: path }
    }

    pub fn generate_report(
        &self,
        outcome: &PipelineOutcome,
        config_desc: &str,
        actual_comparison: Option<ActualComparison>,
    ) -> String {
        let report = RunReport {
            timestamp: Utc::now(),
            configuration: config_desc.to_string(),
            signals: signal_entries(outcome),
            composite: summarize_composite(&outcome.composite),
            actual_comparison,
        };

        let json = serde_json::to_string_pretty(&report).expect("Failed to serialize report");
        let filename = format!(
            "composite_report_{}.json",
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.output_dir.join(&filename);

        let mut file = fs::File::create(&path).expect("Failed to create report file");
        file.write_all(json.as_bytes())
            .expect("Failed to write report file");

        println!("📝 Report saved to: {}", path.display());
        path.to_string_lossy().to_string()
    }

    pub fn print_summary(
        &self,
        outcome: &PipelineOutcome,
        actual_comparison: Option<&ActualComparison>,
    ) {
        let entries = signal_entries(outcome);

        println!("\n{}", "=".repeat(80));
        println!("📊 COMPOSITE SIGNAL SUMMARY");
        println!("{}", "=".repeat(80));
        println!(
            "{:<20} | {:<10} | {:<18} | {:>8} | {:>8}",
            "Signal", "Quality", "Status", "T-stat", "Weight"
        );
        println!("{}", "-".repeat(80));

        for entry in &entries {
            println!(
                "{:<20} | {:<10} | {:<18} | {:>8} | {:>8}",
                entry.signal,
                entry.quality.as_deref().unwrap_or("-"),
                entry.status,
                entry
                    .t_stat
                    .map(|t| format!("{:.2}", t))
                    .unwrap_or_else(|| "-".to_string()),
                entry
                    .weight
                    .map(|w| format!("{:.4}", w))
                    .unwrap_or_else(|| "-".to_string()),
            );
        }

        let skipped = entries.iter().filter(|e| e.status != "included").count();
        if skipped > 0 {
            println!("⚠️ {} signal(s) did not contribute to the composite", skipped);
        }

        let summary = summarize_composite(&outcome.composite);
        println!("{}", "-".repeat(80));
        println!(
            "Composite: {} periods from {} to {}, mean {:.4}, range [{:.4}, {:.4}]",
            summary.periods,
            summary.first_period,
            summary.last_period,
            summary.mean,
            summary.min,
            summary.max
        );

        if let Some(cmp) = actual_comparison {
            println!(
                "vs actual returns over {} periods: alpha {:.4}, beta {:.4}, correlation {:.4}",
                cmp.periods, cmp.alpha, cmp.beta, cmp.correlation
            );
        }
        println!("{}", "=".repeat(80));
    }
}

/// Print the `describe` table: one row of summary statistics per signal.
pub fn print_describe(series: &[SignalSeries]) {
    println!("\n{}", "=".repeat(80));
    println!("🔍 SIGNAL TABLE SUMMARY");
    println!("{}", "=".repeat(80));
    println!(
        "{:<20} | {:>6} | {:>10} | {:>10} | {:>10} | {:>10}",
        "Signal", "Count", "Mean", "StdDev", "Min", "Max"
    );
    println!("{}", "-".repeat(80));

    for summary in series.iter().map(summarize_signal) {
        println!(
            "{:<20} | {:>6} | {:>10.4} | {:>10.4} | {:>10.4} | {:>10.4}",
            summary.signal,
            summary.count,
            summary.mean,
            summary.std_dev,
            summary.min,
            summary.max
        );
    }
    println!("{}", "=".repeat(80));
}

pub fn summarize_signal(series: &SignalSeries) -> SignalSummary {
    let data = Data::new(series.values());
    SignalSummary {
        signal: series.name().to_string(),
        count: series.len(),
        mean: data.mean().unwrap_or(0.0),
        std_dev: data.std_dev().unwrap_or(0.0),
        min: if series.is_empty() { 0.0 } else { data.min() },
        max: if series.is_empty() { 0.0 } else { data.max() },
    }
}

fn signal_entries(outcome: &PipelineOutcome) -> Vec<SignalReportEntry> {
    outcome
        .audits
        .iter()
        .map(|audit| {
            let (status, t_stat, weight) = match &audit.disposition {
                SignalDisposition::Included { t_stat, weight } => {
                    ("included", Some(*t_stat), Some(*weight))
                }
                SignalDisposition::MissingStatistic => ("no statistic", None, None),
                SignalDisposition::MissingSeries => ("no series", None, None),
                SignalDisposition::Degenerate { .. } => ("degenerate", None, None),
                SignalDisposition::BelowThreshold { t_stat } => {
                    ("below threshold", Some(*t_stat), None)
                }
            };
            SignalReportEntry {
                signal: audit.name.clone(),
                quality: audit.quality.clone(),
                status: status.to_string(),
                t_stat,
                weight,
            }
        })
        .collect()
}

fn summarize_composite(composite: &CompositeSeries) -> CompositeSummary {
    let points = composite.points();
    let values = composite.values();
    let data = Data::new(values);
    CompositeSummary {
        periods: points.len(),
        first_period: points.first().map(|(d, _)| *d).unwrap_or_default(),
        last_period: points.last().map(|(d, _)| *d).unwrap_or_default(),
        mean: data.mean().unwrap_or(0.0),
        min: if points.is_empty() { 0.0 } else { data.min() },
        max: if points.is_empty() { 0.0 } else { data.max() },
    }
}
