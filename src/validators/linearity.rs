// Linearity: quadratic-vs-linear R² gain plus a Wald-Wolfowitz runs test
//
// Decision order (first match wins):
//   1. runs test significant and the policy lets it force critical -> critical
//   2. R² improvement above critical_improvement                   -> critical
//   3. R² improvement above warning_improvement                    -> warning
//   4. otherwise                                                  -> satisfied

use super::{format_p, Validator};
use crate::assumption::{AssumptionName, Severity, ValidationResult};
use crate::dataset::AnalysisContext;
use crate::descriptive::{median, PolynomialFit};
use crate::distributions::normal_two_sided_p;
use crate::error::{GuardianError, Result};
use crate::policy::LinearityPolicy;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunsTest {
    pub runs: usize,
    pub above: usize,
    pub below: usize,
    pub expected: f64,
    pub z: f64,
    pub p_value: f64,
}

/// Runs of signs around the median, in input order. Values equal to the
/// median are dropped. `None` when either side is empty.
pub fn runs_test(residuals: &[f64]) -> Option<RunsTest> {
    let m = median(residuals)?;
    let signs: Vec<bool> = residuals
        .iter()
        .filter(|r| **r != m)
        .map(|r| *r > m)
        .collect();

    let above = signs.iter().filter(|s| **s).count();
    let below = signs.len() - above;
    if above == 0 || below == 0 {
        return None;
    }
    let runs = 1 + signs.windows(2).filter(|w| w[0] != w[1]).count();

    let n1 = above as f64;
    let n2 = below as f64;
    let n = n1 + n2;
    let expected = 2.0 * n1 * n2 / n + 1.0;
    let variance = 2.0 * n1 * n2 * (2.0 * n1 * n2 - n1 - n2) / (n * n * (n - 1.0));
    let (z, p_value) = if variance > 0.0 {
        let z = (runs as f64 - expected) / variance.sqrt();
        (z, normal_two_sided_p(z))
    } else {
        (0.0, 1.0)
    };

    Some(RunsTest {
        runs,
        above,
        below,
        expected,
        z,
        p_value,
    })
}

/// Pairs reordered by ascending x
pub(super) fn sort_by_x(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut order: Vec<usize> = (0..x.len()).collect();
    order.sort_by(|&a, &b| x[a].total_cmp(&x[b]));
    (
        order.iter().map(|&i| x[i]).collect(),
        order.iter().map(|&i| y[i]).collect(),
    )
}

#[derive(Debug, Clone)]
pub struct LinearityValidator {
    policy: LinearityPolicy,
}

impl LinearityValidator {
    pub fn new(policy: LinearityPolicy) -> Self {
        Self { policy }
    }
}

impl Validator for LinearityValidator {
    fn assumption(&self) -> AssumptionName {
        AssumptionName::Linearity
    }

    fn validate(&self, ctx: &AnalysisContext) -> Result<ValidationResult> {
        let (x, y) = ctx.pairs().ok_or_else(|| GuardianError::IncompatibleDataset {
            assumption: AssumptionName::Linearity,
            expected: "paired x/y".to_string(),
        })?;

        if x.len() < self.policy.min_n {
            return Ok(ValidationResult::not_assessable(
                AssumptionName::Linearity,
                format!("Linearity check needs at least {} pairs", self.policy.min_n),
            ));
        }

        let (x, y) = sort_by_x(x, y);
        let (Some(linear), Some(quadratic)) =
            (PolynomialFit::linear(&x, &y), PolynomialFit::quadratic(&x, &y))
        else {
            return Ok(ValidationResult::not_assessable(
                AssumptionName::Linearity,
                "Linearity check needs at least three distinct x values",
            ));
        };

        let improvement = (quadratic.r_squared - linear.r_squared).max(0.0);
        let runs = runs_test(&linear.residuals);
        let runs_significant = runs.map_or(false, |r| r.p_value < ctx.alpha);
        tracing::debug!(
            linear_r2 = linear.r_squared,
            quadratic_r2 = quadratic.r_squared,
            improvement,
            runs_p = runs.map(|r| r.p_value),
            "linearity"
        );

        let runs_text = match runs {
            Some(r) => format!("runs={} (expected {:.1}), {}", r.runs, r.expected, format_p(r.p_value)),
            None => "runs test not applicable".to_string(),
        };

        let result = if runs_significant && self.policy.runs_test_forces_critical {
            ValidationResult::violation(
                AssumptionName::Linearity,
                Severity::Critical,
                improvement,
                runs.map(|r| r.p_value),
                format!("Residuals follow a systematic pattern ({})", runs_text),
                "The relationship is not linear: add polynomial or spline terms, transform the variables, or use a nonparametric method.",
            )
        } else if improvement > self.policy.critical_improvement {
            ValidationResult::violation(
                AssumptionName::Linearity,
                Severity::Critical,
                improvement,
                runs.map(|r| r.p_value),
                format!(
                    "A quadratic term raises R² by {:.3} ({:.3} -> {:.3})",
                    improvement, linear.r_squared, quadratic.r_squared
                ),
                "The relationship is clearly curved: model the curvature explicitly or transform the variables.",
            )
        } else if improvement > self.policy.warning_improvement {
            ValidationResult::violation(
                AssumptionName::Linearity,
                Severity::Warning,
                improvement,
                runs.map(|r| r.p_value),
                format!(
                    "Mild curvature: a quadratic term raises R² by {:.3} ({:.3} -> {:.3}); {}",
                    improvement, linear.r_squared, quadratic.r_squared, runs_text
                ),
                "Inspect the residual plot; consider a quadratic term or a transformation.",
            )
        } else {
            ValidationResult::pass(
                AssumptionName::Linearity,
                improvement,
                runs.map(|r| r.p_value),
                format!(
                    "Linear fit adequate (R²={:.3}, quadratic gain {:.3}; {})",
                    linear.r_squared, improvement, runs_text
                ),
            )
        };

        let mut result = result
            .with_detail("linear_r_squared", linear.r_squared)
            .with_detail("quadratic_r_squared", quadratic.r_squared)
            .with_detail("r_squared_improvement", improvement);
        if let Some(r) = runs {
            result = result
                .with_detail("runs", r.runs as f64)
                .with_detail("runs_z", r.z);
        }
        Ok(result)
    }
}
