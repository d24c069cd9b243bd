use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while constructing or validating a signal series
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("Duplicate period {date} in signal {name}")]
    DuplicatePeriod { name: String, date: NaiveDate },

    #[error("Non-finite observation in signal {name} at {date}")]
    NonFiniteObservation { name: String, date: NaiveDate },
}

/// Errors raised while normalizing a single signal series to Z-scores
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Signal {name} has zero variance over {len} observations; Z-score is undefined")]
    ZeroVariance { name: String, len: usize },

    #[error("Signal {name} has {len} observation(s); at least {min} required for a Z-score")]
    TooFewObservations { name: String, len: usize, min: usize },
}

/// Errors raised while deriving weights from signal statistics
#[derive(Debug, Error)]
pub enum WeightError {
    #[error("No signals remain after significance threshold {threshold}")]
    NoEligibleSignals { threshold: f64 },

    #[error("Cannot normalize weights to sum to one: |T| magnitudes sum to {sum}")]
    DegenerateWeightSum { sum: f64 },
}

/// Errors raised while aggregating Z-score series into a composite
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("No overlapping periods across {signal_count} signal(s)")]
    NoOverlappingPeriods { signal_count: usize },

    #[error("Series/weight count mismatch: {series} series, {weights} weights")]
    LengthMismatch { series: usize, weights: usize },
}

/// Pipeline-level failures returned to the caller; nothing here aborts the process
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Signal {name} rejected in strict mode: {reason}")]
    StrictRejection { name: String, reason: String },

    #[error("Weighting failed: {0}")]
    Weighting(#[from] WeightError),

    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] AggregateError),
}
