use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use alphamix::application::pipeline::{SignalDisposition, run_pipeline};
use alphamix::config::{MissingPeriodPolicy, PipelineConfig, WeightNormalization};
use alphamix::domain::errors::{AggregateError, PipelineError};
use alphamix::domain::performance::Stats;
use alphamix::infrastructure::csv_store;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("alphamix_flow_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

const SIGNAL_TABLE: &str = "date,a,b\n\
    2024-01-31,1,5\n\
    2024-02-29,2,4\n\
    2024-03-31,3,3\n\
    2024-04-30,4,2\n\
    2024-05-31,5,1\n";

const STATS_TABLE: &str = "signal,quality,t_stat\n\
    a,good,4.0\n\
    b,moderate,2.0\n";

#[test]
fn test_file_to_file_composite_flow() -> anyhow::Result<()> {
    init_tracing();
    let dir = make_temp_dir();
    let signals_path = dir.join("signals.csv");
    let stats_path = dir.join("stats.csv");
    let out_path = dir.join("composite.csv");
    fs::write(&signals_path, SIGNAL_TABLE)?;
    fs::write(&stats_path, STATS_TABLE)?;

    let series = csv_store::load_signal_table(&signals_path)?;
    let statistics = csv_store::load_statistics(&stats_path)?;
    let config = PipelineConfig {
        significance_threshold: 0.0,
        weight_normalization: WeightNormalization::SumToOne,
        ..PipelineConfig::default()
    };

    let outcome = run_pipeline(&series, &statistics, &config)?;
    csv_store::write_composite(&out_path, &outcome.composite)?;

    // b's Z-scores are the negation of a's, so with weights {2/3, 1/3} the
    // composite is z_a / 3. First period: (1 - 3) / sqrt(2.5) / 3.
    let expected_first = -2.0 / 2.5f64.sqrt() / 3.0;
    let contents = fs::read_to_string(&out_path)?;
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("date,composite"));

    let first_row = lines.next().expect("composite has at least one row");
    let mut fields = first_row.split(',');
    assert_eq!(fields.next(), Some("2024-01-31"));
    let first_value: f64 = fields.next().unwrap().parse()?;
    assert!(
        (first_value - expected_first).abs() < 1e-9,
        "Expected {}, got {}",
        expected_first,
        first_value
    );
    assert_eq!(contents.lines().count(), 6, "header plus five periods");
    Ok(())
}

#[test]
fn test_threshold_excludes_signal_end_to_end() -> anyhow::Result<()> {
    init_tracing();
    let dir = make_temp_dir();
    let signals_path = dir.join("signals.csv");
    let stats_path = dir.join("stats.csv");
    fs::write(&signals_path, SIGNAL_TABLE)?;
    fs::write(&stats_path, STATS_TABLE)?;

    let series = csv_store::load_signal_table(&signals_path)?;
    let statistics = csv_store::load_statistics(&stats_path)?;

    let unfiltered = run_pipeline(&series, &statistics, &PipelineConfig::default())?;
    let filtered = run_pipeline(
        &series,
        &statistics,
        &PipelineConfig {
            significance_threshold: 3.0,
            ..PipelineConfig::default()
        },
    )?;

    assert_eq!(unfiltered.included_count(), 2);
    assert_eq!(filtered.included_count(), 1);
    assert_ne!(
        unfiltered.composite.values(),
        filtered.composite.values(),
        "Dropping the sub-threshold signal must change the composite"
    );

    // With only signal a left at weight 4.0, the composite is 4 * z_a.
    let expected_first = 4.0 * -2.0 / 2.5f64.sqrt();
    let first = filtered.composite.values()[0];
    assert!((first - expected_first).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_actual_returns_comparison_flow() -> anyhow::Result<()> {
    init_tracing();
    let dir = make_temp_dir();
    let signals_path = dir.join("signals.csv");
    let stats_path = dir.join("stats.csv");
    let actual_path = dir.join("actual.csv");
    fs::write(&signals_path, SIGNAL_TABLE)?;
    fs::write(&stats_path, STATS_TABLE)?;
    // Rising returns, positively correlated with the upward-trending composite.
    fs::write(
        &actual_path,
        "date,value\n\
         2024-01-31,-0.02\n\
         2024-02-29,-0.01\n\
         2024-03-31,0.00\n\
         2024-04-30,0.01\n\
         2024-05-31,0.02\n",
    )?;

    let series = csv_store::load_signal_table(&signals_path)?;
    let statistics = csv_store::load_statistics(&stats_path)?;
    let actual = csv_store::load_actual_returns(&actual_path)?;
    let config = PipelineConfig {
        weight_normalization: WeightNormalization::SumToOne,
        ..PipelineConfig::default()
    };

    let outcome = run_pipeline(&series, &statistics, &config)?;
    let comparison =
        Stats::compare_to_actual(&outcome.composite, &actual).expect("periods overlap");

    assert_eq!(comparison.periods, 5);
    assert!(
        comparison.correlation > 0.999,
        "Composite tracks the linear return series, correlation {}",
        comparison.correlation
    );
    assert!(comparison.beta > 0.0);
    Ok(())
}

#[test]
fn test_mismatched_tables_are_audited() -> anyhow::Result<()> {
    init_tracing();
    let dir = make_temp_dir();
    let signals_path = dir.join("signals.csv");
    let stats_path = dir.join("stats.csv");
    fs::write(&signals_path, SIGNAL_TABLE)?;
    // c has no series; b has no statistic.
    fs::write(
        &stats_path,
        "signal,quality,t_stat\na,good,4.0\nc,good,3.0\n",
    )?;

    let series = csv_store::load_signal_table(&signals_path)?;
    let statistics = csv_store::load_statistics(&stats_path)?;

    let outcome = run_pipeline(&series, &statistics, &PipelineConfig::default())?;

    let disposition = |name: &str| {
        &outcome
            .audits
            .iter()
            .find(|a| a.name == name)
            .unwrap_or_else(|| panic!("no audit for {}", name))
            .disposition
    };
    assert!(matches!(disposition("b"), SignalDisposition::MissingStatistic));
    assert!(matches!(disposition("c"), SignalDisposition::MissingSeries));
    assert_eq!(outcome.included_count(), 1);
    Ok(())
}

#[test]
fn test_disjoint_periods_fail_under_drop_policy() -> anyhow::Result<()> {
    init_tracing();
    let dir = make_temp_dir();
    let signals_path = dir.join("signals.csv");
    let stats_path = dir.join("stats.csv");
    // Each signal observed in different months only.
    fs::write(
        &signals_path,
        "date,a,b\n\
         2024-01-31,1.0,\n\
         2024-02-29,2.0,\n\
         2024-03-31,,1.0\n\
         2024-04-30,,2.0\n",
    )?;
    fs::write(&stats_path, STATS_TABLE)?;

    let series = csv_store::load_signal_table(&signals_path)?;
    let statistics = csv_store::load_statistics(&stats_path)?;
    let config = PipelineConfig {
        missing_period_policy: MissingPeriodPolicy::Drop,
        ..PipelineConfig::default()
    };

    let result = run_pipeline(&series, &statistics, &config);

    assert!(matches!(
        result,
        Err(PipelineError::Aggregation(
            AggregateError::NoOverlappingPeriods { signal_count: 2 }
        ))
    ));

    // zero-fill keeps the union instead.
    let config = PipelineConfig {
        missing_period_policy: MissingPeriodPolicy::ZeroFill,
        ..PipelineConfig::default()
    };
    let outcome = run_pipeline(&series, &statistics, &config)?;
    assert_eq!(outcome.composite.len(), 4);
    Ok(())
}
