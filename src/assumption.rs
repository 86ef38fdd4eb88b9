//! Assumption names, severities and per-check results

use crate::error::GuardianError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A statistical precondition a test method relies on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssumptionName {
    Normality,
    VarianceHomogeneity,
    Independence,
    Outliers,
    SampleSize,
    Modality,
    Linearity,
    Homoscedasticity,
}

impl AssumptionName {
    pub const ALL: [AssumptionName; 8] = [
        AssumptionName::Normality,
        AssumptionName::VarianceHomogeneity,
        AssumptionName::Independence,
        AssumptionName::Outliers,
        AssumptionName::SampleSize,
        AssumptionName::Modality,
        AssumptionName::Linearity,
        AssumptionName::Homoscedasticity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssumptionName::Normality => "normality",
            AssumptionName::VarianceHomogeneity => "variance_homogeneity",
            AssumptionName::Independence => "independence",
            AssumptionName::Outliers => "outliers",
            AssumptionName::SampleSize => "sample_size",
            AssumptionName::Modality => "modality",
            AssumptionName::Linearity => "linearity",
            AssumptionName::Homoscedasticity => "homoscedasticity",
        }
    }
}

impl fmt::Display for AssumptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssumptionName {
    type Err = GuardianError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssumptionName::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| GuardianError::InvalidConfig {
                reason: format!("unknown assumption '{}'", s),
            })
    }
}

/// Graded violation level
///
/// Ordering is significant: `Critical > Warning > None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::None => "none",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Outcome of a single assumption check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub assumption: AssumptionName,
    pub satisfied: bool,
    pub severity: Severity,
    pub statistic: f64,
    pub p_value: Option<f64>,
    pub message: String,
    pub recommendation: String,
    /// Supporting statistics (variance ratio, R² improvement, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, f64>,
}

impl ValidationResult {
    /// Assumption holds
    pub fn pass(
        assumption: AssumptionName,
        statistic: f64,
        p_value: Option<f64>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            assumption,
            satisfied: true,
            severity: Severity::None,
            statistic,
            p_value,
            message: message.into(),
            recommendation: "No action needed.".to_string(),
            details: BTreeMap::new(),
        }
    }

    /// Assumption violated with the given severity
    ///
    /// A `Severity::None` here degrades to a pass so that `satisfied` can never
    /// disagree with `severity`.
    pub fn violation(
        assumption: AssumptionName,
        severity: Severity,
        statistic: f64,
        p_value: Option<f64>,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            assumption,
            satisfied: severity == Severity::None,
            severity,
            statistic,
            p_value,
            message: message.into(),
            recommendation: recommendation.into(),
            details: BTreeMap::new(),
        }
    }

    /// Data too small (or degenerate) for this check; reported, never blocking
    pub fn not_assessable(assumption: AssumptionName, reason: impl Into<String>) -> Self {
        Self::pass(assumption, 0.0, None, reason)
    }

    pub fn with_detail(mut self, name: &str, value: f64) -> Self {
        self.details.insert(name.to_string(), value);
        self
    }

    pub fn is_violation(&self) -> bool {
        !self.satisfied
    }
}

/// A check that did not finish inside the evaluation deadline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndeterminateCheck {
    pub assumption: AssumptionName,
    pub reason: String,
}
