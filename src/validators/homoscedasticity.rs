// Homoscedasticity: Breusch-Pagan LM test plus a split-half variance ratio
//
// Ratio thresholds default to φ (warning) and φ² (critical).

use super::linearity::sort_by_x;
use super::{format_p, Validator};
use crate::assumption::{AssumptionName, Severity, ValidationResult};
use crate::dataset::AnalysisContext;
use crate::descriptive::{negligible_spread, sample_variance, PolynomialFit};
use crate::distributions::chi_square_sf;
use crate::error::{GuardianError, Result};
use crate::policy::HomoscedasticityPolicy;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreuschPagan {
    pub lm: f64,
    pub p_value: f64,
    /// R² of the auxiliary regression of squared residuals on x
    pub r_squared: f64,
}

/// LM = n·R² of e² regressed on x, against chi-square(1)
pub fn breusch_pagan(x: &[f64], residuals: &[f64]) -> Option<BreuschPagan> {
    let squared: Vec<f64> = residuals.iter().map(|e| e * e).collect();
    let aux = PolynomialFit::linear(x, &squared)?;
    let r_squared = aux.r_squared.max(0.0);
    let lm = x.len() as f64 * r_squared;
    Some(BreuschPagan {
        lm,
        p_value: chi_square_sf(lm, 1.0),
        r_squared,
    })
}

/// Larger over smaller residual variance between the lower and upper halves
/// ordered by fitted value. The middle point is dropped for odd n.
pub fn half_variance_ratio(fitted: &[f64], residuals: &[f64]) -> Option<f64> {
    let n = fitted.len().min(residuals.len());
    let half = n / 2;
    if half < 2 {
        return None;
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| fitted[a].total_cmp(&fitted[b]));

    let lower: Vec<f64> = order[..half].iter().map(|&i| residuals[i]).collect();
    let upper: Vec<f64> = order[n - half..].iter().map(|&i| residuals[i]).collect();
    let (a, b) = (sample_variance(&lower), sample_variance(&upper));
    let (small, large) = if a <= b { (a, b) } else { (b, a) };

    if negligible_spread(large, residuals) {
        Some(1.0)
    } else if small <= f64::EPSILON * large {
        Some(f64::INFINITY)
    } else {
        Some(large / small)
    }
}

#[derive(Debug, Clone)]
pub struct HomoscedasticityValidator {
    policy: HomoscedasticityPolicy,
}

impl HomoscedasticityValidator {
    pub fn new(policy: HomoscedasticityPolicy) -> Self {
        Self { policy }
    }
}

impl Validator for HomoscedasticityValidator {
    fn assumption(&self) -> AssumptionName {
        AssumptionName::Homoscedasticity
    }

    fn validate(&self, ctx: &AnalysisContext) -> Result<ValidationResult> {
        let (x, y) = ctx.pairs().ok_or_else(|| GuardianError::IncompatibleDataset {
            assumption: AssumptionName::Homoscedasticity,
            expected: "paired x/y".to_string(),
        })?;

        let not_assessable = || {
            Ok(ValidationResult::not_assessable(
                AssumptionName::Homoscedasticity,
                format!(
                    "Homoscedasticity check needs at least {} pairs with varying x",
                    self.policy.min_n
                ),
            ))
        };
        if x.len() < self.policy.min_n {
            return not_assessable();
        }

        let (x, y) = sort_by_x(x, y);
        let Some(fit) = PolynomialFit::linear(&x, &y) else {
            return not_assessable();
        };
        let (Some(bp), Some(ratio)) = (
            breusch_pagan(&x, &fit.residuals),
            half_variance_ratio(&fit.fitted, &fit.residuals),
        ) else {
            return not_assessable();
        };
        tracing::debug!(lm = bp.lm, p = bp.p_value, ratio, "breusch-pagan");

        let severity = if bp.p_value < ctx.alpha || ratio > self.policy.critical_ratio {
            Severity::Critical
        } else if ratio > self.policy.warning_ratio {
            Severity::Warning
        } else {
            Severity::None
        };

        let summary = format!(
            "Breusch-Pagan LM={:.3}, {}; residual variance ratio {:.2}",
            bp.lm,
            format_p(bp.p_value),
            ratio
        );
        let result = match severity {
            Severity::None => ValidationResult::pass(
                AssumptionName::Homoscedasticity,
                bp.lm,
                Some(bp.p_value),
                format!("Residual spread is constant ({})", summary),
            ),
            _ => ValidationResult::violation(
                AssumptionName::Homoscedasticity,
                severity,
                bp.lm,
                Some(bp.p_value),
                format!("Residual spread changes with the fitted value ({})", summary),
                "Use heteroscedasticity-consistent (HC3) standard errors, weighted least squares, or a variance-stabilising transformation of y.",
            ),
        };

        let result = result.with_detail("bp_r_squared", bp.r_squared);
        Ok(if ratio.is_finite() {
            result.with_detail("variance_ratio", ratio)
        } else {
            result
        })
    }
}
