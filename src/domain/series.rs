use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::errors::SeriesError;

/// A named, date-indexed sequence of observations for one financial indicator.
///
/// Observations are sorted by period on construction and the series is
/// immutable afterwards. Duplicate periods and non-finite values are rejected
/// at the boundary so the pipeline never has to re-check them.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSeries {
    name: String,
    observations: Vec<(NaiveDate, f64)>,
}

impl SignalSeries {
    pub fn new(
        name: impl Into<String>,
        mut observations: Vec<(NaiveDate, f64)>,
    ) -> Result<Self, SeriesError> {
        let name = name.into();
        observations.sort_by(|a, b| a.0.cmp(&b.0));

        for window in observations.windows(2) {
            if window[0].0 == window[1].0 {
                return Err(SeriesError::DuplicatePeriod {
                    name,
                    date: window[0].0,
                });
            }
        }
        for &(date, value) in &observations {
            if !value.is_finite() {
                return Err(SeriesError::NonFiniteObservation { name, date });
            }
        }

        Ok(Self { name, observations })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[(NaiveDate, f64)] {
        &self.observations
    }

    /// Observation value for the given period, if the period is present.
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        self.observations
            .binary_search_by(|(d, _)| d.cmp(&date))
            .ok()
            .map(|idx| self.observations[idx].1)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.observations.iter().map(|(d, _)| *d)
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|(_, v)| *v).collect()
    }

    /// Build a same-named series with transformed values. Period index is
    /// preserved, so validity checks from construction still hold.
    pub(crate) fn with_values(&self, values: impl IntoIterator<Item = f64>) -> Self {
        let observations = self
            .observations
            .iter()
            .zip(values)
            .map(|(&(date, _), value)| (date, value))
            .collect();
        Self {
            name: self.name.clone(),
            observations,
        }
    }
}

/// Historical predictive significance of one signal, paired 1:1 with a
/// [`SignalSeries`] by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalStatistic {
    #[serde(rename = "signal")]
    pub name: String,
    pub quality: String,
    pub t_stat: f64,
}

/// The aggregated composite score over the aligned period index.
///
/// Derived and ephemeral: recomputed whenever inputs change, holds no
/// identity of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSeries {
    points: Vec<(NaiveDate, f64)>,
}

impl CompositeSeries {
    pub(crate) fn new(points: Vec<(NaiveDate, f64)>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by(|(d, _)| d.cmp(&date))
            .ok()
            .map(|idx| self.points[idx].1)
    }
}
