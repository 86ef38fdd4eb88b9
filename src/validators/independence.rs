// Independence: Ljung-Box portmanteau test at lag 1
//
// Observations are taken in the order supplied. A significant lag-1
// autocorrelation is a warning; a strong one (|r1| at or above the policy
// threshold) is critical.

use super::{format_p, Validator};
use crate::assumption::{AssumptionName, Severity, ValidationResult};
use crate::dataset::AnalysisContext;
use crate::descriptive::lag1_autocorrelation;
use crate::distributions::chi_square_sf;
use crate::error::Result;
use crate::policy::IndependencePolicy;

/// (lag-1 autocorrelation, Q, p-value against chi-square(1))
pub fn ljung_box_lag1(series: &[f64]) -> Option<(f64, f64, f64)> {
    let n = series.len();
    if n < 3 {
        return None;
    }
    let r1 = lag1_autocorrelation(series);
    let nf = n as f64;
    let q = nf * (nf + 2.0) * r1 * r1 / (nf - 1.0);
    Some((r1, q, chi_square_sf(q, 1.0)))
}

#[derive(Debug, Clone)]
pub struct IndependenceValidator {
    policy: IndependencePolicy,
}

impl IndependenceValidator {
    pub fn new(policy: IndependencePolicy) -> Self {
        Self { policy }
    }
}

impl Validator for IndependenceValidator {
    fn assumption(&self) -> AssumptionName {
        AssumptionName::Independence
    }

    fn validate(&self, ctx: &AnalysisContext) -> Result<ValidationResult> {
        // (|r1|, r1, q, p, sample)
        let mut worst: Option<(f64, f64, f64, f64, &str)> = None;
        let mut tested = 0usize;

        for sample in ctx.samples.iter().filter(|s| s.len() >= self.policy.min_n) {
            let Some((r1, q, p)) = ljung_box_lag1(&sample.values) else {
                continue;
            };
            tested += 1;
            if worst.map_or(true, |(_, _, _, wp, _)| p < wp) {
                worst = Some((r1.abs(), r1, q, p, &sample.name));
            }
        }

        let Some((abs_r1, r1, q, p, name)) = worst else {
            return Ok(ValidationResult::not_assessable(
                AssumptionName::Independence,
                format!(
                    "Independence check needs at least {} ordered observations",
                    self.policy.min_n
                ),
            ));
        };
        tracing::debug!(sample = name, r1, q, p, "ljung-box");

        let severity = if p >= ctx.alpha {
            Severity::None
        } else if abs_r1 >= self.policy.strong_autocorrelation {
            Severity::Critical
        } else {
            Severity::Warning
        };

        let result = if severity == Severity::None {
            ValidationResult::pass(
                AssumptionName::Independence,
                q,
                Some(p),
                format!(
                    "No serial dependence detected (lag-1 r={:.3}, Ljung-Box Q={:.3}, {})",
                    r1,
                    q,
                    format_p(p)
                ),
            )
        } else {
            ValidationResult::violation(
                AssumptionName::Independence,
                severity,
                q,
                Some(p),
                format!(
                    "Observations in '{}' are serially correlated (lag-1 r={:.3}, Ljung-Box Q={:.3}, {})",
                    name,
                    r1,
                    q,
                    format_p(p)
                ),
                "Check the sampling design for time order or clustering; use a time-series or mixed-effects model, or a block bootstrap.",
            )
        };

        Ok(result
            .with_detail("lag1_autocorrelation", r1)
            .with_detail("samples_tested", tested as f64))
    }
}
