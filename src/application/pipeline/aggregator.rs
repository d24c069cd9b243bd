use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::config::MissingPeriodPolicy;
use crate::domain::errors::AggregateError;
use crate::domain::series::{CompositeSeries, SignalSeries};

/// Combine aligned Z-score series and their weights into one composite score
/// series: `composite[t] = sum_i weight_i * zscore_i[t]`.
///
/// The period index depends on the policy: `drop` keeps the intersection of
/// all contributing series' periods, `zero-fill` keeps the union with missing
/// observations contributing zero. An empty index is an explicit failure,
/// never an empty success. Stateless and idempotent.
pub fn aggregate(
    zscores: &[SignalSeries],
    weights: &[f64],
    policy: MissingPeriodPolicy,
) -> Result<CompositeSeries, AggregateError> {
    if zscores.len() != weights.len() {
        return Err(AggregateError::LengthMismatch {
            series: zscores.len(),
            weights: weights.len(),
        });
    }

    let index = period_index(zscores, policy);
    if index.is_empty() {
        return Err(AggregateError::NoOverlappingPeriods {
            signal_count: zscores.len(),
        });
    }

    let mut points = Vec::with_capacity(index.len());
    for date in index {
        let mut total = 0.0;
        for (series, weight) in zscores.iter().zip(weights) {
            if let Some(value) = series.value_on(date) {
                total += weight * value;
            }
        }
        points.push((date, total));
    }

    Ok(CompositeSeries::new(points))
}

fn period_index(zscores: &[SignalSeries], policy: MissingPeriodPolicy) -> Vec<NaiveDate> {
    match policy {
        MissingPeriodPolicy::Drop => {
            let mut iter = zscores.iter();
            let mut common: BTreeSet<NaiveDate> = match iter.next() {
                Some(first) => first.dates().collect(),
                None => return Vec::new(),
            };
            for series in iter {
                let dates: BTreeSet<NaiveDate> = series.dates().collect();
                common = common.intersection(&dates).copied().collect();
                if common.is_empty() {
                    break;
                }
            }
            common.into_iter().collect()
        }
        MissingPeriodPolicy::ZeroFill => {
            let mut all: BTreeSet<NaiveDate> = BTreeSet::new();
            for series in zscores {
                all.extend(series.dates());
            }
            all.into_iter().collect()
        }
    }
}
