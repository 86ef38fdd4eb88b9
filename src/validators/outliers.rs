// Outliers: Tukey fences per analysis sample

use super::Validator;
use crate::assumption::{AssumptionName, Severity, ValidationResult};
use crate::dataset::AnalysisContext;
use crate::descriptive::{quantile_sorted, sorted};
use crate::error::Result;
use crate::policy::OutlierPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct TukeyFences {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
    /// Indices (into the input) of values outside the fences
    pub flagged: Vec<usize>,
}

impl TukeyFences {
    pub fn proportion(&self, n: usize) -> f64 {
        if n == 0 {
            0.0
        } else {
            self.flagged.len() as f64 / n as f64
        }
    }
}

/// Fences at Q1 - k·IQR and Q3 + k·IQR; `None` below four values
pub fn tukey_fences(values: &[f64], k: f64) -> Option<TukeyFences> {
    if values.len() < 4 {
        return None;
    }
    let s = sorted(values);
    let q1 = quantile_sorted(&s, 0.25)?;
    let q3 = quantile_sorted(&s, 0.75)?;
    let iqr = q3 - q1;
    let lower = q1 - k * iqr;
    let upper = q3 + k * iqr;
    let flagged = values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v < lower || **v > upper)
        .map(|(i, _)| i)
        .collect();
    Some(TukeyFences {
        q1,
        q3,
        lower,
        upper,
        flagged,
    })
}

#[derive(Debug, Clone)]
pub struct OutlierDetector {
    policy: OutlierPolicy,
}

impl OutlierDetector {
    pub fn new(policy: OutlierPolicy) -> Self {
        Self { policy }
    }
}

impl Validator for OutlierDetector {
    fn assumption(&self) -> AssumptionName {
        AssumptionName::Outliers
    }

    fn validate(&self, ctx: &AnalysisContext) -> Result<ValidationResult> {
        let mut total_flagged = 0usize;
        // (proportion, count, sample)
        let mut worst: Option<(f64, usize, &str)> = None;

        for sample in &ctx.samples {
            let Some(fences) = tukey_fences(&sample.values, self.policy.iqr_multiplier) else {
                continue;
            };
            let proportion = fences.proportion(sample.len());
            total_flagged += fences.flagged.len();
            if worst.map_or(true, |(wp, ..)| proportion > wp) {
                worst = Some((proportion, fences.flagged.len(), &sample.name));
            }
        }

        let Some((proportion, count, name)) = worst else {
            return Ok(ValidationResult::not_assessable(
                AssumptionName::Outliers,
                "Outlier screening needs at least four observations per sample",
            ));
        };
        tracing::debug!(sample = name, proportion, count, "tukey fences");

        let severity = if proportion > self.policy.critical_proportion {
            Severity::Critical
        } else if proportion > self.policy.warning_proportion {
            Severity::Warning
        } else {
            Severity::None
        };

        let result = match severity {
            Severity::None if total_flagged == 0 => ValidationResult::pass(
                AssumptionName::Outliers,
                0.0,
                None,
                "No values outside the Tukey fences",
            ),
            Severity::None => ValidationResult::pass(
                AssumptionName::Outliers,
                proportion,
                None,
                format!(
                    "{} value(s) outside the Tukey fences, within tolerance ({:.1}% at most, in '{}')",
                    total_flagged,
                    proportion * 100.0,
                    name
                ),
            ),
            _ => ValidationResult::violation(
                AssumptionName::Outliers,
                severity,
                proportion,
                None,
                format!(
                    "{:.1}% of '{}' ({} value(s)) lies outside the Tukey fences (k={})",
                    proportion * 100.0,
                    name,
                    count,
                    self.policy.iqr_multiplier
                ),
                "Verify the flagged values for recording errors; otherwise use a rank-based test, trimmed means, or a robust estimator.",
            ),
        };

        Ok(result.with_detail("outlier_count", total_flagged as f64))
    }
}
