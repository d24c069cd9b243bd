use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::series::{CompositeSeries, SignalSeries};

/// Shared statistics utilities for comparing the composite against a
/// realized-returns series.
pub struct Stats;

/// Regression of the composite score on actual returns over the periods both
/// series cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualComparison {
    pub periods: usize,
    pub alpha: f64,
    pub beta: f64,
    pub correlation: f64,
}

impl Stats {
    /// Calculate Alpha and Beta of `composite` vs `actual` using linear
    /// regression, plus the Pearson correlation.
    ///
    /// Returns (alpha, beta, correlation). Degenerate inputs (fewer than two
    /// points, zero variance) yield zeros rather than NaN.
    pub fn alpha_beta(composite: &[f64], actual: &[f64]) -> (f64, f64, f64) {
        let n = composite.len().min(actual.len());
        if n < 2 {
            return (0.0, 0.0, 0.0);
        }

        let c = &composite[..n];
        let a = &actual[..n];

        let n_f = n as f64;
        let mean_c: f64 = c.iter().sum::<f64>() / n_f;
        let mean_a: f64 = a.iter().sum::<f64>() / n_f;

        let mut cov = 0.0;
        let mut var_a = 0.0;
        let mut var_c = 0.0;

        for i in 0..n {
            let diff_c = c[i] - mean_c;
            let diff_a = a[i] - mean_a;
            cov += diff_c * diff_a;
            var_a += diff_a * diff_a;
            var_c += diff_c * diff_c;
        }

        // Use sample covariance/variance (unbiased estimator)
        let n_minus_1 = (n - 1) as f64;
        cov /= n_minus_1;
        var_a /= n_minus_1;
        var_c /= n_minus_1;

        let beta = if var_a > 1e-12 { cov / var_a } else { 0.0 };
        let alpha = mean_c - beta * mean_a;

        let correlation = if var_a > 1e-12 && var_c > 1e-12 {
            cov / (var_a.sqrt() * var_c.sqrt())
        } else {
            0.0
        };

        (alpha, beta, correlation)
    }

    /// Align the composite with an actual-returns series on their common
    /// periods and regress one on the other. `None` when fewer than two
    /// periods overlap.
    pub fn compare_to_actual(
        composite: &CompositeSeries,
        actual: &SignalSeries,
    ) -> Option<ActualComparison> {
        let composite_dates: BTreeSet<NaiveDate> = composite.points().iter().map(|(d, _)| *d).collect();
        let common: Vec<NaiveDate> = actual
            .dates()
            .filter(|d| composite_dates.contains(d))
            .collect();

        if common.len() < 2 {
            return None;
        }

        let mut composite_values = Vec::with_capacity(common.len());
        let mut actual_values = Vec::with_capacity(common.len());
        for date in &common {
            composite_values.push(composite.value_on(*date)?);
            actual_values.push(actual.value_on(*date)?);
        }

        let (alpha, beta, correlation) = Self::alpha_beta(&composite_values, &actual_values);
        Some(ActualComparison {
            periods: common.len(),
            alpha,
            beta,
            correlation,
        })
    }
}
