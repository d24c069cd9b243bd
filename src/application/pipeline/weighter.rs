use crate::config::WeightNormalization;
use crate::domain::errors::WeightError;
use crate::domain::series::SignalStatistic;

/// Weight derived for one signal from its T-statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalWeight {
    pub name: String,
    pub t_stat: f64,
    pub weight: f64,
}

/// Result of weighting: signals that passed the significance filter with
/// their weights, and the statistics that were filtered out.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightingOutcome {
    pub weights: Vec<SignalWeight>,
    pub excluded: Vec<SignalStatistic>,
}

/// Derive a weight per signal from its T-statistic.
///
/// The weight is the T-statistic itself (sign preserved). Signals whose |T|
/// falls below `significance_threshold` are excluded before weighting. Under
/// `sum-to-one` every weight is divided by the sum of eligible |T| values, so
/// the magnitudes sum to one while signs survive. Deterministic: input order
/// is preserved and repeated calls yield identical output.
pub fn derive_weights(
    statistics: &[SignalStatistic],
    significance_threshold: f64,
    normalization: WeightNormalization,
) -> Result<WeightingOutcome, WeightError> {
    let (eligible, excluded): (Vec<SignalStatistic>, Vec<SignalStatistic>) = statistics
        .iter()
        .cloned()
        .partition(|s| s.t_stat.abs() >= significance_threshold);

    if eligible.is_empty() {
        return Err(WeightError::NoEligibleSignals {
            threshold: significance_threshold,
        });
    }

    let scale = match normalization {
        WeightNormalization::Raw => 1.0,
        WeightNormalization::SumToOne => {
            let sum: f64 = eligible.iter().map(|s| s.t_stat.abs()).sum();
            if sum < 1e-12 {
                return Err(WeightError::DegenerateWeightSum { sum });
            }
            sum
        }
    };

    let weights = eligible
        .into_iter()
        .map(|s| SignalWeight {
            weight: s.t_stat / scale,
            name: s.name,
            t_stat: s.t_stat,
        })
        .collect();

    Ok(WeightingOutcome { weights, excluded })
}
