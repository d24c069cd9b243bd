//! Composite-signal pipeline: Normalizer -> Weighter -> Aggregator.
//!
//! A single synchronous pass with no shared state; re-running with the same
//! inputs and configuration always produces the same output.

mod aggregator;
mod normalizer;
mod weighter;

pub use aggregator::aggregate;
pub use normalizer::{MIN_OBSERVATIONS, normalize};
pub use weighter::{SignalWeight, WeightingOutcome, derive_weights};

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::domain::errors::PipelineError;
use crate::domain::series::{CompositeSeries, SignalSeries, SignalStatistic};

/// Why a signal did or did not contribute to the composite.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalDisposition {
    Included { t_stat: f64, weight: f64 },
    /// Present in the series table but absent from the statistics table.
    MissingStatistic,
    /// Present in the statistics table but absent from the series table.
    MissingSeries,
    /// Zero variance or too few observations for a Z-score.
    Degenerate { reason: String },
    BelowThreshold { t_stat: f64 },
}

/// Per-signal outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalAudit {
    pub name: String,
    pub quality: Option<String>,
    pub disposition: SignalDisposition,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub composite: CompositeSeries,
    pub audits: Vec<SignalAudit>,
}

impl PipelineOutcome {
    pub fn included_count(&self) -> usize {
        self.audits
            .iter()
            .filter(|a| matches!(a.disposition, SignalDisposition::Included { .. }))
            .count()
    }
}

/// Run the full pipeline over a set of signal series and their statistics.
///
/// Signals that cannot participate (no matching statistic or series, zero
/// variance, too short) are skipped with a warning and recorded in the audit;
/// in strict mode the first such signal fails the run. Threshold exclusion is
/// configured filtering, not a data problem, so it never trips strict mode.
pub fn run_pipeline(
    series: &[SignalSeries],
    statistics: &[SignalStatistic],
    config: &PipelineConfig,
) -> Result<PipelineOutcome, PipelineError> {
    let series_names: HashSet<&str> = series.iter().map(|s| s.name()).collect();
    let stat_by_name: HashMap<&str, &SignalStatistic> =
        statistics.iter().map(|s| (s.name.as_str(), s)).collect();

    let mut dispositions: HashMap<String, SignalDisposition> = HashMap::new();
    let mut candidates: Vec<(SignalSeries, SignalStatistic)> = Vec::new();

    for s in series {
        let Some(stat) = stat_by_name.get(s.name()) else {
            warn!(
                "Signal {} has no entry in the statistics table; skipping",
                s.name()
            );
            if config.strict {
                return Err(PipelineError::StrictRejection {
                    name: s.name().to_string(),
                    reason: "no matching statistic".to_string(),
                });
            }
            dispositions.insert(s.name().to_string(), SignalDisposition::MissingStatistic);
            continue;
        };

        match normalize(s) {
            Ok(zscores) => candidates.push((zscores, (*stat).clone())),
            Err(err) => {
                warn!("Signal {} skipped: {}", s.name(), err);
                if config.strict {
                    return Err(PipelineError::StrictRejection {
                        name: s.name().to_string(),
                        reason: err.to_string(),
                    });
                }
                dispositions.insert(
                    s.name().to_string(),
                    SignalDisposition::Degenerate {
                        reason: err.to_string(),
                    },
                );
            }
        }
    }

    for stat in statistics {
        if !series_names.contains(stat.name.as_str()) {
            warn!(
                "Statistic for {} has no matching signal series; skipping",
                stat.name
            );
            if config.strict {
                return Err(PipelineError::StrictRejection {
                    name: stat.name.clone(),
                    reason: "no matching signal series".to_string(),
                });
            }
            dispositions.insert(stat.name.clone(), SignalDisposition::MissingSeries);
        }
    }

    let candidate_stats: Vec<SignalStatistic> =
        candidates.iter().map(|(_, stat)| stat.clone()).collect();
    let weighting = derive_weights(
        &candidate_stats,
        config.significance_threshold,
        config.weight_normalization,
    )?;

    for excluded in &weighting.excluded {
        info!(
            "Signal {} below significance threshold {} (T={}); excluded",
            excluded.name, config.significance_threshold, excluded.t_stat
        );
        dispositions.insert(
            excluded.name.clone(),
            SignalDisposition::BelowThreshold {
                t_stat: excluded.t_stat,
            },
        );
    }

    let weight_by_name: HashMap<&str, &SignalWeight> = weighting
        .weights
        .iter()
        .map(|w| (w.name.as_str(), w))
        .collect();

    let mut contributing = Vec::with_capacity(weighting.weights.len());
    let mut weights = Vec::with_capacity(weighting.weights.len());
    for (zscores, stat) in &candidates {
        if let Some(w) = weight_by_name.get(stat.name.as_str()) {
            contributing.push(zscores.clone());
            weights.push(w.weight);
            dispositions.insert(
                stat.name.clone(),
                SignalDisposition::Included {
                    t_stat: w.t_stat,
                    weight: w.weight,
                },
            );
        }
    }

    let composite = aggregate(&contributing, &weights, config.missing_period_policy)?;

    let mut audits: Vec<SignalAudit> = Vec::with_capacity(dispositions.len());
    for s in series {
        if let Some(disposition) = dispositions.remove(s.name()) {
            audits.push(SignalAudit {
                name: s.name().to_string(),
                quality: stat_by_name.get(s.name()).map(|st| st.quality.clone()),
                disposition,
            });
        }
    }
    for stat in statistics {
        if let Some(disposition) = dispositions.remove(stat.name.as_str()) {
            audits.push(SignalAudit {
                name: stat.name.clone(),
                quality: Some(stat.quality.clone()),
                disposition,
            });
        }
    }

    info!(
        "Composite built from {} of {} signal series over {} periods",
        weights.len(),
        series.len(),
        composite.len()
    );

    Ok(PipelineOutcome { composite, audits })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MissingPeriodPolicy, WeightNormalization};
    use chrono::NaiveDate;

    fn monthly_series(name: &str, values: &[f64]) -> SignalSeries {
        let observations = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                (
                    NaiveDate::from_ymd_opt(2024, i as u32 + 1, 1).unwrap(),
                    v,
                )
            })
            .collect();
        SignalSeries::new(name, observations).unwrap()
    }

    fn stat(name: &str, t_stat: f64) -> SignalStatistic {
        SignalStatistic {
            name: name.to_string(),
            quality: "good".to_string(),
            t_stat,
        }
    }

    fn disposition_of<'a>(outcome: &'a PipelineOutcome, name: &str) -> &'a SignalDisposition {
        &outcome
            .audits
            .iter()
            .find(|a| a.name == name)
            .unwrap_or_else(|| panic!("no audit for {}", name))
            .disposition
    }

    #[test]
    fn test_end_to_end_worked_example() {
        let series = vec![
            monthly_series("a", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            monthly_series("b", &[5.0, 4.0, 3.0, 2.0, 1.0]),
        ];
        let statistics = vec![stat("a", 4.0), stat("b", 2.0)];
        let config = PipelineConfig {
            significance_threshold: 0.0,
            weight_normalization: WeightNormalization::SumToOne,
            ..PipelineConfig::default()
        };

        let outcome = run_pipeline(&series, &statistics, &config).unwrap();

        assert!(matches!(
            disposition_of(&outcome, "a"),
            SignalDisposition::Included { weight, .. } if (weight - 2.0 / 3.0).abs() < 1e-9
        ));
        assert!(matches!(
            disposition_of(&outcome, "b"),
            SignalDisposition::Included { weight, .. } if (weight - 1.0 / 3.0).abs() < 1e-9
        ));

        // b's Z-scores are the negation of a's, so the composite collapses to
        // (2/3 - 1/3) * z_a. First period: z_a = -2 / sqrt(2.5).
        let z_first = -2.0 / 2.5f64.sqrt();
        let composite = outcome.composite;
        assert_eq!(composite.len(), 5);
        let first = composite.values()[0];
        assert!(
            (first - z_first / 3.0).abs() < 1e-9,
            "Expected {}, got {}",
            z_first / 3.0,
            first
        );
    }

    #[test]
    fn test_degenerate_signal_is_skipped_not_fatal() {
        let series = vec![
            monthly_series("flat", &[2.0, 2.0, 2.0]),
            monthly_series("trend", &[1.0, 2.0, 3.0]),
        ];
        let statistics = vec![stat("flat", 3.0), stat("trend", 2.0)];
        let config = PipelineConfig::default();

        let outcome = run_pipeline(&series, &statistics, &config).unwrap();

        assert!(matches!(
            disposition_of(&outcome, "flat"),
            SignalDisposition::Degenerate { .. }
        ));
        assert_eq!(outcome.included_count(), 1);
        assert_eq!(outcome.composite.len(), 3);
    }

    #[test]
    fn test_strict_mode_fails_on_degenerate_signal() {
        let series = vec![
            monthly_series("flat", &[2.0, 2.0, 2.0]),
            monthly_series("trend", &[1.0, 2.0, 3.0]),
        ];
        let statistics = vec![stat("flat", 3.0), stat("trend", 2.0)];
        let config = PipelineConfig {
            strict: true,
            ..PipelineConfig::default()
        };

        let result = run_pipeline(&series, &statistics, &config);

        assert!(matches!(
            result,
            Err(PipelineError::StrictRejection { ref name, .. }) if name == "flat"
        ));
    }

    #[test]
    fn test_name_mismatches_are_audited() {
        let series = vec![
            monthly_series("orphan_series", &[1.0, 2.0, 3.0]),
            monthly_series("trend", &[1.0, 2.0, 3.0]),
        ];
        let statistics = vec![stat("trend", 2.0), stat("orphan_stat", 1.0)];
        let config = PipelineConfig::default();

        let outcome = run_pipeline(&series, &statistics, &config).unwrap();

        assert!(matches!(
            disposition_of(&outcome, "orphan_series"),
            SignalDisposition::MissingStatistic
        ));
        assert!(matches!(
            disposition_of(&outcome, "orphan_stat"),
            SignalDisposition::MissingSeries
        ));
        assert_eq!(outcome.included_count(), 1);
    }

    #[test]
    fn test_threshold_filter_changes_composite() {
        let series = vec![
            monthly_series("a", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            monthly_series("b", &[2.0, 1.0, 4.0, 3.0, 5.0]),
        ];
        let statistics = vec![stat("a", 4.0), stat("b", 1.2)];

        let unfiltered = run_pipeline(&series, &statistics, &PipelineConfig::default()).unwrap();
        let filtered = run_pipeline(
            &series,
            &statistics,
            &PipelineConfig {
                significance_threshold: 2.0,
                ..PipelineConfig::default()
            },
        )
        .unwrap();

        assert!(matches!(
            disposition_of(&filtered, "b"),
            SignalDisposition::BelowThreshold { t_stat } if *t_stat == 1.2
        ));
        assert_ne!(
            unfiltered.composite.values(),
            filtered.composite.values(),
            "Dropping a sub-threshold signal must change the composite"
        );
    }

    #[test]
    fn test_no_overlapping_periods_is_explicit() {
        let jan = SignalSeries::new(
            "jan_only",
            vec![
                (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 1.0),
                (NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 2.0),
            ],
        )
        .unwrap();
        let feb = SignalSeries::new(
            "feb_only",
            vec![
                (NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), 1.0),
                (NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(), 2.0),
            ],
        )
        .unwrap();
        let statistics = vec![stat("jan_only", 2.0), stat("feb_only", 2.0)];
        let config = PipelineConfig {
            missing_period_policy: MissingPeriodPolicy::Drop,
            ..PipelineConfig::default()
        };

        let result = run_pipeline(&[jan, feb], &statistics, &config);

        assert!(matches!(
            result,
            Err(PipelineError::Aggregation(
                crate::domain::errors::AggregateError::NoOverlappingPeriods { signal_count: 2 }
            ))
        ));
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let series = vec![
            monthly_series("a", &[1.0, 2.0, 3.0, 4.0]),
            monthly_series("b", &[4.0, 1.0, 3.0, 2.0]),
        ];
        let statistics = vec![stat("a", 4.0), stat("b", 2.0)];
        let config = PipelineConfig {
            weight_normalization: WeightNormalization::SumToOne,
            ..PipelineConfig::default()
        };

        let first = run_pipeline(&series, &statistics, &config).unwrap();
        let second = run_pipeline(&series, &statistics, &config).unwrap();

        assert_eq!(first.composite, second.composite);
        assert_eq!(first.audits, second.audits);
    }
}
