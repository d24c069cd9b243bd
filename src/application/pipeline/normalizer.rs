use statrs::statistics::{Data, Distribution};

use crate::domain::errors::NormalizeError;
use crate::domain::series::SignalSeries;

/// Minimum observations for a defined sample standard deviation.
pub const MIN_OBSERVATIONS: usize = 2;

/// Convert a raw signal series into Z-scores over its full history.
///
/// Each observation becomes `(x - mean) / std_dev` using the sample mean and
/// sample standard deviation (n-1). A constant series has no defined Z-score
/// and is reported as such instead of dividing by zero. Pure function.
pub fn normalize(series: &SignalSeries) -> Result<SignalSeries, NormalizeError> {
    let len = series.len();
    if len < MIN_OBSERVATIONS {
        return Err(NormalizeError::TooFewObservations {
            name: series.name().to_string(),
            len,
            min: MIN_OBSERVATIONS,
        });
    }

    let values = series.values();
    let data = Data::new(values.clone());
    let mean = data.mean().ok_or(NormalizeError::TooFewObservations {
        name: series.name().to_string(),
        len,
        min: MIN_OBSERVATIONS,
    })?;
    let std_dev = data.std_dev().ok_or(NormalizeError::TooFewObservations {
        name: series.name().to_string(),
        len,
        min: MIN_OBSERVATIONS,
    })?;

    // A constant series can leave a residual std_dev under float rounding.
    if std_dev < 1e-12 {
        return Err(NormalizeError::ZeroVariance {
            name: series.name().to_string(),
            len,
        });
    }

    Ok(series.with_values(values.into_iter().map(|v| (v - mean) / std_dev)))
}
