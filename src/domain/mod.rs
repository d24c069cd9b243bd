pub mod errors;
pub mod performance;
pub mod series;

pub use errors::{AggregateError, NormalizeError, PipelineError, SeriesError, WeightError};
pub use series::{CompositeSeries, SignalSeries, SignalStatistic};
