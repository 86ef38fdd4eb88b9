// Homogeneity of variance: Brown-Forsythe (median-centred Levene) test

use super::{format_p, robust_alternative, Validator};
use crate::assumption::{AssumptionName, Severity, ValidationResult};
use crate::dataset::AnalysisContext;
use crate::descriptive::{mean, median, negligible_spread, sample_variance};
use crate::distributions::f_sf;
use crate::error::Result;
use crate::family::TestFamily;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeveneTest {
    pub statistic: f64,
    pub p_value: f64,
    pub df_between: f64,
    pub df_within: f64,
}

/// Brown-Forsythe W over `groups`; groups with fewer than two values are
/// skipped. `None` when fewer than two groups remain.
pub fn brown_forsythe(groups: &[&[f64]]) -> Option<LeveneTest> {
    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .filter(|g| g.len() >= 2)
        .filter_map(|g| {
            let m = median(g)?;
            Some(g.iter().map(|v| (v - m).abs()).collect())
        })
        .collect();

    let k = deviations.len();
    if k < 2 {
        return None;
    }
    let total: usize = deviations.iter().map(Vec::len).sum();
    if total <= k {
        return None;
    }

    let group_means: Vec<f64> = deviations.iter().map(|z| mean(z)).collect();
    let grand_mean =
        deviations.iter().flat_map(|z| z.iter()).sum::<f64>() / total as f64;

    let between: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, zm)| z.len() as f64 * (zm - grand_mean).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, zm)| z.iter().map(|v| (v - zm).powi(2)).sum::<f64>())
        .sum();

    let df_between = (k - 1) as f64;
    let df_within = (total - k) as f64;

    let all: Vec<f64> = deviations.iter().flatten().copied().collect();
    let (statistic, p_value) = if negligible_spread(within, &all) {
        if negligible_spread(between, &all) {
            (0.0, 1.0)
        } else {
            (f64::INFINITY, 0.0)
        }
    } else {
        let w = df_within / df_between * between / within;
        (w, f_sf(w, df_between, df_within))
    };

    Some(LeveneTest {
        statistic,
        p_value,
        df_between,
        df_within,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VarianceHomogeneityValidator;

impl Validator for VarianceHomogeneityValidator {
    fn assumption(&self) -> AssumptionName {
        AssumptionName::VarianceHomogeneity
    }

    fn validate(&self, ctx: &AnalysisContext) -> Result<ValidationResult> {
        let groups: Vec<&[f64]> = ctx.samples.iter().map(|s| s.values.as_slice()).collect();
        let Some(test) = brown_forsythe(&groups) else {
            return Ok(ValidationResult::not_assessable(
                AssumptionName::VarianceHomogeneity,
                "Variance homogeneity needs at least two groups of two or more observations",
            ));
        };

        let variances: Vec<f64> = groups
            .iter()
            .filter(|g| g.len() >= 2)
            .map(|g| sample_variance(g))
            .collect();
        let max = variances.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = variances.iter().cloned().fold(f64::INFINITY, f64::min);
        let ratio = max / min;

        tracing::debug!(w = test.statistic, p = test.p_value, ratio, "brown-forsythe");

        let result = if test.p_value < ctx.alpha {
            let recommendation = match ctx.family {
                TestFamily::TTest => {
                    "Use Welch's t-test, which does not assume equal variances.".to_string()
                }
                TestFamily::Anova => {
                    "Use Welch's ANOVA or the Kruskal-Wallis test.".to_string()
                }
                family => format!("Consider {}.", robust_alternative(family)),
            };
            ValidationResult::violation(
                AssumptionName::VarianceHomogeneity,
                Severity::Critical,
                test.statistic,
                Some(test.p_value),
                format!(
                    "Group variances differ (Brown-Forsythe W={:.3}, {})",
                    test.statistic,
                    format_p(test.p_value)
                ),
                recommendation,
            )
        } else {
            ValidationResult::pass(
                AssumptionName::VarianceHomogeneity,
                test.statistic,
                Some(test.p_value),
                format!(
                    "Group variances are compatible (Brown-Forsythe W={:.3}, {})",
                    test.statistic,
                    format_p(test.p_value)
                ),
            )
        };

        let result = result
            .with_detail("df_between", test.df_between)
            .with_detail("df_within", test.df_within);
        Ok(if ratio.is_finite() {
            result.with_detail("variance_ratio", ratio)
        } else {
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_spreads_pass() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [11.0, 12.0, 13.0, 14.0, 15.0];
        let test = brown_forsythe(&[&a, &b]).unwrap();
        assert!(test.statistic.abs() < 1e-12);
        assert!((test.p_value - 1.0).abs() < 1e-9);
        assert_eq!(test.df_between, 1.0);
        assert_eq!(test.df_within, 8.0);
    }

    #[test]
    fn test_very_different_spreads_fail() {
        let narrow: Vec<f64> = (0..20).map(|i| (i % 5) as f64 * 0.1).collect();
        let wide: Vec<f64> = (0..20).map(|i| (i % 5) as f64 * 10.0).collect();
        let test = brown_forsythe(&[&narrow, &wide]).unwrap();
        assert!(test.p_value < 0.001, "p={}", test.p_value);
    }

    #[test]
    fn test_single_group_not_testable() {
        assert!(brown_forsythe(&[&[1.0, 2.0, 3.0]]).is_none());
        // Second group too small to contribute
        assert!(brown_forsythe(&[&[1.0, 2.0, 3.0], &[4.0]]).is_none());
    }

    #[test]
    fn test_constant_groups() {
        let test = brown_forsythe(&[&[1.0, 1.0, 1.0], &[5.0, 5.0, 5.0]]).unwrap();
        assert_eq!(test.p_value, 1.0);
    }
}
