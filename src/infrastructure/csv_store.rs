//! Flat tabular file exchange: signal tables in, composite series out.
//!
//! All I/O happens here, once, before or after the pipeline runs; the
//! pipeline itself never touches the filesystem.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::series::{CompositeSeries, SignalSeries, SignalStatistic};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct ActualReturnRow {
    date: NaiveDate,
    value: f64,
}

#[derive(Debug, Serialize)]
struct CompositeRow {
    date: NaiveDate,
    composite: f64,
}

/// Load a wide signal table: a `date` column plus one numeric column per
/// signal, the header row giving signal names. Blank cells are missing
/// observations and simply absent from that signal's series.
pub fn load_signal_table(path: &Path) -> Result<Vec<SignalSeries>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open signal table {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(BufReader::new(file));

    let headers = rdr
        .headers()
        .with_context(|| format!("Failed to read header row of {}", path.display()))?
        .clone();
    let mut columns = headers.iter();
    match columns.next() {
        Some("date") => {}
        Some(other) => bail!(
            "Signal table {} must start with a 'date' column, found '{}'",
            path.display(),
            other
        ),
        None => bail!("Signal table {} has an empty header row", path.display()),
    }
    let names: Vec<String> = columns.map(|c| c.trim().to_string()).collect();
    if names.is_empty() {
        bail!("Signal table {} has no signal columns", path.display());
    }

    let mut observations: BTreeMap<usize, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for (row_idx, record) in rdr.records().enumerate() {
        let record = record
            .with_context(|| format!("Failed to read row {} of {}", row_idx + 2, path.display()))?;
        let date_field = record
            .get(0)
            .with_context(|| format!("Row {} of {} has no date", row_idx + 2, path.display()))?;
        let date = NaiveDate::parse_from_str(date_field.trim(), DATE_FORMAT).with_context(|| {
            format!(
                "Invalid date '{}' at row {} of {}",
                date_field,
                row_idx + 2,
                path.display()
            )
        })?;

        for (col, name) in names.iter().enumerate() {
            let field = record.get(col + 1).unwrap_or("").trim();
            if field.is_empty() {
                continue;
            }
            let value: f64 = field.parse().with_context(|| {
                format!("Invalid value '{}' for signal {} at {}", field, name, date)
            })?;
            observations.entry(col).or_default().push((date, value));
        }
    }

    let mut series = Vec::with_capacity(names.len());
    for (col, name) in names.iter().enumerate() {
        let obs = observations.remove(&col).unwrap_or_default();
        series.push(
            SignalSeries::new(name.clone(), obs)
                .with_context(|| format!("Invalid series for signal {}", name))?,
        );
    }

    info!(
        "Loaded {} signal series from {}",
        series.len(),
        path.display()
    );
    Ok(series)
}

/// Load the statistics table: one row per signal with columns
/// `signal,quality,t_stat`.
pub fn load_statistics(path: &Path) -> Result<Vec<SignalStatistic>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open statistics table {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(BufReader::new(file));

    let mut statistics = Vec::new();
    for (row_idx, result) in rdr.deserialize().enumerate() {
        let stat: SignalStatistic = result.with_context(|| {
            format!("Invalid statistic at row {} of {}", row_idx + 2, path.display())
        })?;
        if !stat.t_stat.is_finite() {
            bail!(
                "Non-finite T-statistic for signal {} in {}",
                stat.name,
                path.display()
            );
        }
        statistics.push(stat);
    }

    info!(
        "Loaded {} signal statistics from {}",
        statistics.len(),
        path.display()
    );
    Ok(statistics)
}

/// Load an actual-returns series (`date,value` columns) for comparison
/// against the composite.
pub fn load_actual_returns(path: &Path) -> Result<SignalSeries> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open actual-returns table {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(BufReader::new(file));

    let mut observations = Vec::new();
    for (row_idx, result) in rdr.deserialize().enumerate() {
        let row: ActualReturnRow = result.with_context(|| {
            format!("Invalid return at row {} of {}", row_idx + 2, path.display())
        })?;
        observations.push((row.date, row.value));
    }

    SignalSeries::new("actual_returns", observations)
        .with_context(|| format!("Invalid actual-returns series in {}", path.display()))
}

/// Write the composite as `date,composite` rows.
pub fn write_composite(path: &Path, composite: &CompositeSeries) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for &(date, value) in composite.points() {
        wtr.serialize(CompositeRow {
            date,
            composite: value,
        })
        .with_context(|| format!("Failed to write composite row for {}", date))?;
    }
    wtr.flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    info!(
        "Wrote composite over {} periods to {}",
        composite.len(),
        path.display()
    );
    Ok(())
}
