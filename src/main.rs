use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use alphamix::application::pipeline::run_pipeline;
use alphamix::application::reporting::{RunReporter, print_describe};
use alphamix::config::{MissingPeriodPolicy, PipelineConfig, WeightNormalization};
use alphamix::domain::performance::Stats;
use alphamix::infrastructure::csv_store;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the composite signal from a signal table and a statistics table
    Run {
        /// Signal table: date column plus one numeric column per signal
        #[arg(long)]
        signals: PathBuf,

        /// Statistics table: signal,quality,t_stat
        #[arg(long)]
        stats: PathBuf,

        /// Actual-returns series (date,value) to compare the composite against
        #[arg(long)]
        actual: Option<PathBuf>,

        /// Where to write the composite (date,composite)
        #[arg(long, default_value = "composite.csv")]
        out: PathBuf,

        /// Directory for the JSON run report
        #[arg(long, default_value = "reports")]
        report_dir: String,

        /// Minimum |T-statistic| to include a signal (overrides SIGNIFICANCE_THRESHOLD)
        #[arg(long)]
        threshold: Option<f64>,

        /// Missing-period policy: drop or zero-fill (overrides MISSING_PERIOD_POLICY)
        #[arg(long)]
        policy: Option<String>,

        /// Weight normalization: raw or sum-to-one (overrides WEIGHT_NORMALIZATION)
        #[arg(long)]
        normalization: Option<String>,

        /// Fail on the first bad signal instead of skipping it with a warning
        #[arg(long)]
        strict: bool,
    },
    /// Print per-signal summary statistics without running the pipeline
    Describe {
        /// Signal table: date column plus one numeric column per signal
        #[arg(long)]
        signals: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            signals,
            stats,
            actual,
            out,
            report_dir,
            threshold,
            policy,
            normalization,
            strict,
        } => {
            let mut config = PipelineConfig::from_env().context("Failed to load configuration")?;
            if let Some(threshold) = threshold {
                config.significance_threshold = threshold;
            }
            if let Some(ref policy) = policy {
                config.missing_period_policy = MissingPeriodPolicy::from_str(policy)?;
            }
            if let Some(ref normalization) = normalization {
                config.weight_normalization = WeightNormalization::from_str(normalization)?;
            }
            config.strict = config.strict || strict;
            info!("Pipeline configuration: {}", config.describe());

            let series = csv_store::load_signal_table(&signals)?;
            let statistics = csv_store::load_statistics(&stats)?;

            let outcome = run_pipeline(&series, &statistics, &config)
                .context("Composite pipeline failed")?;

            csv_store::write_composite(&out, &outcome.composite)?;

            let comparison = match actual {
                Some(ref path) => {
                    let actual_returns = csv_store::load_actual_returns(path)?;
                    let cmp = Stats::compare_to_actual(&outcome.composite, &actual_returns);
                    if cmp.is_none() {
                        anyhow::bail!(
                            "Fewer than two periods overlap between the composite and {}",
                            path.display()
                        );
                    }
                    cmp
                }
                None => None,
            };

            let reporter = RunReporter::new(&report_dir);
            reporter.print_summary(&outcome, comparison.as_ref());
            reporter.generate_report(&outcome, &config.describe(), comparison);
        }
        Commands::Describe { signals } => {
            let series = csv_store::load_signal_table(&signals)?;
            print_describe(&series);
        }
    }

    Ok(())
}
