pub mod stats;

pub use stats::{ActualComparison, Stats};
