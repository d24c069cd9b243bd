//! Configuration module for alphamix.
//!
//! Pipeline policies are loaded from environment variables with typed
//! defaults; the CLI may override any of them per invocation.

use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::str::FromStr;

/// How periods missing from one or more contributing series are treated
/// during aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPeriodPolicy {
    /// Keep only periods present in every contributing series.
    Drop,
    /// Keep the union of periods; a missing observation contributes zero.
    ZeroFill,
}

impl FromStr for MissingPeriodPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drop" => Ok(MissingPeriodPolicy::Drop),
            "zero-fill" | "zero_fill" => Ok(MissingPeriodPolicy::ZeroFill),
            _ => anyhow::bail!(
                "Invalid MISSING_PERIOD_POLICY: {}. Must be 'drop' or 'zero-fill'",
                s
            ),
        }
    }
}

impl fmt::Display for MissingPeriodPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingPeriodPolicy::Drop => write!(f, "drop"),
            MissingPeriodPolicy::ZeroFill => write!(f, "zero-fill"),
        }
    }
}

/// Whether derived weights are used as-is or rescaled to sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightNormalization {
    Raw,
    SumToOne,
}

impl FromStr for WeightNormalization {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(WeightNormalization::Raw),
            "sum-to-one" | "sum_to_one" => Ok(WeightNormalization::SumToOne),
            _ => anyhow::bail!(
                "Invalid WEIGHT_NORMALIZATION: {}. Must be 'raw' or 'sum-to-one'",
                s
            ),
        }
    }
}

impl fmt::Display for WeightNormalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightNormalization::Raw => write!(f, "raw"),
            WeightNormalization::SumToOne => write!(f, "sum-to-one"),
        }
    }
}

/// Pipeline configuration.
///
/// Every option recognized by the composite pipeline lives here; the
/// pipeline itself carries no hidden defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum |T-statistic| for a signal to participate in the composite.
    pub significance_threshold: f64,
    pub missing_period_policy: MissingPeriodPolicy,
    pub weight_normalization: WeightNormalization,
    /// In strict mode a single bad signal fails the whole run instead of
    /// being skipped with a warning.
    pub strict: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            significance_threshold: 0.0,
            missing_period_policy: MissingPeriodPolicy::Drop,
            weight_normalization: WeightNormalization::Raw,
            strict: false,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let significance_threshold = env_parse(
            "SIGNIFICANCE_THRESHOLD",
            defaults.significance_threshold,
        )
        .context("Failed to parse SIGNIFICANCE_THRESHOLD")?;

        let missing_period_policy = match env::var("MISSING_PERIOD_POLICY") {
            Ok(raw) => MissingPeriodPolicy::from_str(&raw)?,
            Err(_) => defaults.missing_period_policy,
        };

        let weight_normalization = match env::var("WEIGHT_NORMALIZATION") {
            Ok(raw) => WeightNormalization::from_str(&raw)?,
            Err(_) => defaults.weight_normalization,
        };

        let strict =
            env_parse("STRICT_MODE", defaults.strict).context("Failed to parse STRICT_MODE")?;

        Ok(Self {
            significance_threshold,
            missing_period_policy,
            weight_normalization,
            strict,
        })
    }

    /// One-line description for logs and reports.
    pub fn describe(&self) -> String {
        format!(
            "threshold={} policy={} normalization={} strict={}",
            self.significance_threshold,
            self.missing_period_policy,
            self.weight_normalization,
            self.strict
        )
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("Invalid value for {}: {}", key, raw)),
        Err(_) => Ok(default),
    }
}
