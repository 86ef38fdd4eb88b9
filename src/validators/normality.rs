// Normality: Shapiro-Wilk (Royston 1992 weights, Royston 1995 p-values)
//
// Jarque-Bera takes over above the Shapiro-Wilk size limit. The visual aid
// (Q-Q + histogram) is closed-form and never estimates a density.

use super::{format_p, robust_alternative, Validator};
use crate::assumption::{AssumptionName, Severity, ValidationResult};
use crate::dataset::{AnalysisContext, NamedSample};
use crate::descriptive::{mean, negligible_spread, sorted};
use crate::diagnostics::{group_diagnostics, DiagnosticsOptions, GroupDiagnostics};
use crate::distributions::{chi_square_sf, normal_quantile, normal_sf};
use crate::error::Result;
use crate::policy::NormalityPolicy;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

const C1: [f64; 6] = [0.0, 0.221_157, -0.147_981, -2.071_190, 4.434_685, -2.706_056];
const C2: [f64; 6] = [0.0, 0.042_981, -0.293_762, -1.752_461, 5.682_633, -3.582_633];

fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapiroWilk {
    pub w: f64,
    pub p_value: f64,
}

/// Shapiro-Wilk W and its p-value; `None` for n < 3 or a constant sample
pub fn shapiro_wilk(values: &[f64]) -> Option<ShapiroWilk> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let x = sorted(values);
    let range = x[n - 1] - x[0];
    if range <= f64::EPSILON * x[0].abs().max(x[n - 1].abs()) {
        return None;
    }

    let nf = n as f64;
    let m: Vec<f64> = (1..=n)
        .map(|i| normal_quantile((i as f64 - 0.375) / (nf + 0.25)))
        .collect();

    let mut a = vec![0.0; n];
    if n == 3 {
        a[0] = -FRAC_1_SQRT_2;
        a[2] = FRAC_1_SQRT_2;
    } else {
        let summ2: f64 = m.iter().map(|v| v * v).sum();
        let ssumm2 = summ2.sqrt();
        let u = 1.0 / nf.sqrt();
        let an = poly(&C1, u) + m[n - 1] / ssumm2;

        if n > 5 {
            let an1 = poly(&C2, u) + m[n - 2] / ssumm2;
            let fac = ((summ2 - 2.0 * m[n - 1].powi(2) - 2.0 * m[n - 2].powi(2))
                / (1.0 - 2.0 * an.powi(2) - 2.0 * an1.powi(2)))
            .sqrt();
            a[n - 1] = an;
            a[0] = -an;
            a[n - 2] = an1;
            a[1] = -an1;
            for i in 2..n - 2 {
                a[i] = m[i] / fac;
            }
        } else {
            let fac = ((summ2 - 2.0 * m[n - 1].powi(2)) / (1.0 - 2.0 * an.powi(2))).sqrt();
            a[n - 1] = an;
            a[0] = -an;
            for i in 1..n - 1 {
                a[i] = m[i] / fac;
            }
        }
    }

    let xbar = mean(&x);
    let ssq: f64 = x.iter().map(|v| (v - xbar).powi(2)).sum();
    let b: f64 = a.iter().zip(&x).map(|(ai, xi)| ai * xi).sum();
    let w = (b * b / ssq).min(1.0);

    Some(ShapiroWilk {
        w,
        p_value: shapiro_p_value(w, n),
    })
}

fn shapiro_p_value(w: f64, n: usize) -> f64 {
    if w >= 1.0 {
        return 1.0;
    }
    let nf = n as f64;
    if n == 3 {
        let p = 6.0 / PI * (w.sqrt().asin() - 0.75_f64.sqrt().asin());
        return p.clamp(0.0, 1.0);
    }

    let y = (1.0 - w).ln();
    let z = if n <= 11 {
        let gamma = -2.273 + 0.459 * nf;
        if y >= gamma {
            return 0.0;
        }
        let y = -(gamma - y).ln();
        let mu = poly(&[0.5440, -0.39978, 0.025054, -6.714e-4], nf);
        let sigma = poly(&[1.3822, -0.77857, 0.062767, -0.0020322], nf).exp();
        (y - mu) / sigma
    } else {
        let u = nf.ln();
        let mu = poly(&[-1.5861, -0.31082, -0.083751, 0.0038915], u);
        let sigma = poly(&[-0.4803, -0.082676, 0.0030302], u).exp();
        (y - mu) / sigma
    };
    normal_sf(z).clamp(0.0, 1.0)
}

/// Jarque-Bera statistic and chi-square(2) p-value; `None` for constant data
pub fn jarque_bera(values: &[f64]) -> Option<(f64, f64)> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let m = mean(values);
    let nf = n as f64;
    let ss = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    if negligible_spread(ss, values) {
        return None;
    }
    let m2 = ss / nf;
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / nf;
    let m4 = values.iter().map(|v| (v - m).powi(4)).sum::<f64>() / nf;
    let skew = m3 / m2.powf(1.5);
    let kurt = m4 / (m2 * m2);
    let jb = nf / 6.0 * (skew * skew + (kurt - 3.0).powi(2) / 4.0);
    Some((jb, chi_square_sf(jb, 2.0)))
}

#[derive(Debug, Clone)]
pub struct NormalityValidator {
    policy: NormalityPolicy,
    diagnostics: DiagnosticsOptions,
}

impl NormalityValidator {
    pub fn new(policy: NormalityPolicy, diagnostics: DiagnosticsOptions) -> Self {
        Self {
            policy,
            diagnostics,
        }
    }

    /// Q-Q and histogram data for samples long enough to be worth plotting
    pub fn visual_aids(&self, samples: &[NamedSample]) -> Vec<GroupDiagnostics> {
        samples
            .iter()
            .filter(|s| s.len() >= self.policy.visual_aid_min_n)
            .map(|s| group_diagnostics(&s.name, &s.values, &self.diagnostics))
            .collect()
    }

    /// (statistic, p-value, test name) for one sample
    fn test_sample(&self, values: &[f64]) -> Option<(f64, f64, &'static str)> {
        if values.len() <= self.policy.shapiro_max_n {
            shapiro_wilk(values).map(|sw| (sw.w, sw.p_value, "Shapiro-Wilk W"))
        } else {
            jarque_bera(values).map(|(jb, p)| (jb, p, "Jarque-Bera"))
        }
    }
}

impl Validator for NormalityValidator {
    fn assumption(&self) -> AssumptionName {
        AssumptionName::Normality
    }

    fn validate(&self, ctx: &AnalysisContext) -> Result<ValidationResult> {
        let mut tested = 0usize;
        let mut failing: Vec<&str> = Vec::new();
        // (p, statistic, test, sample)
        let mut worst: Option<(f64, f64, &'static str, &str)> = None;

        for sample in &ctx.samples {
            let Some((stat, p, test)) = self.test_sample(&sample.values) else {
                continue;
            };
            tracing::debug!(sample = %sample.name, test, stat, p, "normality");
            tested += 1;
            if p < ctx.alpha {
                failing.push(&sample.name);
            }
            if worst.map_or(true, |(wp, ..)| p < wp) {
                worst = Some((p, stat, test, &sample.name));
            }
        }

        let Some((p, stat, test, name)) = worst else {
            return Ok(ValidationResult::not_assessable(
                AssumptionName::Normality,
                "Too few distinct observations to assess normality",
            ));
        };

        let result = if failing.is_empty() {
            ValidationResult::pass(
                AssumptionName::Normality,
                stat,
                Some(p),
                format!(
                    "No departure from normality detected ({} sample(s); weakest '{}': {}={:.4}, {})",
                    tested,
                    name,
                    test,
                    stat,
                    format_p(p)
                ),
            )
        } else {
            ValidationResult::violation(
                AssumptionName::Normality,
                Severity::Critical,
                stat,
                Some(p),
                format!(
                    "Sample(s) {} depart from normality ({}={:.4}, {} for '{}')",
                    failing
                        .iter()
                        .map(|n| format!("'{}'", n))
                        .collect::<Vec<_>>()
                        .join(", "),
                    test,
                    stat,
                    format_p(p),
                    name
                ),
                format!(
                    "Consider {}, a variance-stabilising transformation (log, Box-Cox), or bootstrap inference.",
                    robust_alternative(ctx.family)
                ),
            )
        };

        Ok(result
            .with_detail("samples_tested", tested as f64)
            .with_detail("samples_failing", failing.len() as f64))
    }
}
