//! Descriptive statistics and least-squares fits (f64)

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Unbiased sample variance (divides by n - 1); 0.0 below two values
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted(values);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) * 0.5)
    }
}

/// Quantile of already sorted data with linear interpolation (R-7)
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// True when a sum of squared deviations is rounding noise relative to the
/// sum of squares of the values themselves. Scale-free, so samples measured
/// in tiny units are never mistaken for constants.
pub fn negligible_spread(sum_sq_dev: f64, values: &[f64]) -> bool {
    let sum_sq: f64 = values.iter().map(|v| v * v).sum();
    sum_sq_dev <= f64::EPSILON * sum_sq
}

/// Lag-1 autocorrelation in input order, clamped to [-1, 1]
pub fn lag1_autocorrelation(series: &[f64]) -> f64 {
    if series.len() < 3 {
        return 0.0;
    }
    let m = mean(series);
    let denom: f64 = series.iter().map(|v| (v - m) * (v - m)).sum();
    if negligible_spread(denom, series) {
        return 0.0;
    }
    let num: f64 = series
        .windows(2)
        .map(|w| (w[0] - m) * (w[1] - m))
        .sum();
    (num / denom).clamp(-1.0, 1.0)
}

/// Coefficient of determination of `fitted` against `observed`
pub fn r_squared(observed: &[f64], fitted: &[f64]) -> f64 {
    let m = mean(observed);
    let ss_tot: f64 = observed.iter().map(|y| (y - m) * (y - m)).sum();
    if negligible_spread(ss_tot, observed) {
        return 0.0;
    }
    let ss_res: f64 = observed
        .iter()
        .zip(fitted)
        .map(|(y, f)| (y - f) * (y - f))
        .sum();
    1.0 - ss_res / ss_tot
}

/// Least-squares polynomial fit of y on x
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialFit {
    /// Coefficients in ascending power order, on the raw x scale
    pub coefficients: Vec<f64>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    pub r_squared: f64,
}

impl PolynomialFit {
    /// Fit a polynomial of `degree` (1 or 2). Returns `None` when the design
    /// matrix is singular (too few points, constant x, or fewer than three
    /// distinct x values for a quadratic).
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Option<Self> {
        if x.len() != y.len() || x.len() <= degree || !(1..=2).contains(&degree) {
            return None;
        }

        // Standardise x (z = (x - x̄)/s) so the normal equations are well
        // conditioned at any scale, solve, then expand back to raw powers
        let cx = mean(x);
        let ss: f64 = x.iter().map(|v| (v - cx) * (v - cx)).sum();
        if negligible_spread(ss, x) {
            return None;
        }
        let sx = (ss / x.len() as f64).sqrt();
        let terms = degree + 1;
        let mut ata = vec![vec![0.0; terms]; terms];
        let mut aty = vec![0.0; terms];
        for (&xi, &yi) in x.iter().zip(y) {
            let z = (xi - cx) / sx;
            let row: Vec<f64> = (0..terms).map(|p| z.powi(p as i32)).collect();
            for r in 0..terms {
                aty[r] += row[r] * yi;
                for c in 0..terms {
                    ata[r][c] += row[r] * row[c];
                }
            }
        }
        let standardised = solve_linear_system(ata, aty)?;

        // Coefficients in powers of (x - x̄)
        let centred: Vec<f64> = standardised
            .iter()
            .enumerate()
            .map(|(p, c)| c / sx.powi(p as i32))
            .collect();
        let coefficients = match degree {
            1 => vec![centred[0] - centred[1] * cx, centred[1]],
            _ => vec![
                centred[0] - centred[1] * cx + centred[2] * cx * cx,
                centred[1] - 2.0 * centred[2] * cx,
                centred[2],
            ],
        };

        let fitted: Vec<f64> = x
            .iter()
            .map(|&xi| {
                let z = (xi - cx) / sx;
                standardised
                    .iter()
                    .enumerate()
                    .map(|(p, c)| c * z.powi(p as i32))
                    .sum()
            })
            .collect();
        let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(yi, fi)| yi - fi).collect();
        let r_squared = r_squared(y, &fitted);

        Some(Self {
            coefficients,
            fitted,
            residuals,
            r_squared,
        })
    }

    pub fn linear(x: &[f64], y: &[f64]) -> Option<Self> {
        Self::fit(x, y, 1)
    }

    pub fn quadratic(x: &[f64], y: &[f64]) -> Option<Self> {
        Self::fit(x, y, 2)
    }
}

/// Gaussian elimination with partial pivoting
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(1.0);

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() <= 1e-12 * scale {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * solution[k]).sum();
        solution[row] = (b[row] - tail) / a[row][row];
    }
    Some(solution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        let v = [2.0, 4.0, 6.0, 8.0];
        assert_eq!(mean(&v), 5.0);
        // Sample variance: 20 / 3
        assert!((sample_variance(&v) - 20.0 / 3.0).abs() < 1e-12);
        assert_eq!(sample_variance(&[1.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_quantile_interpolates() {
        let s = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile_sorted(&s, 0.25), Some(2.0));
        assert_eq!(quantile_sorted(&s, 0.5), Some(3.0));
        assert_eq!(quantile_sorted(&[1.0, 2.0], 0.5), Some(1.5));
    }

    #[test]
    fn test_lag1_autocorrelation_trend_is_positive() {
        let trend: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert!(lag1_autocorrelation(&trend) > 0.8);

        let alternating: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!(lag1_autocorrelation(&alternating) < -0.8);

        assert_eq!(lag1_autocorrelation(&[3.0, 3.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn test_linear_fit_recovers_line() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 + 2.0 * v).collect();
        let fit = PolynomialFit::linear(&x, &y).unwrap();
        assert!((fit.coefficients[0] - 3.0).abs() < 1e-9);
        assert!((fit.coefficients[1] - 2.0).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!(fit.residuals.iter().all(|r| r.abs() < 1e-9));
    }

    #[test]
    fn test_quadratic_fit_on_squares() {
        let x: Vec<f64> = (1..=8).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();

        let lin = PolynomialFit::linear(&x, &y).unwrap();
        let quad = PolynomialFit::quadratic(&x, &y).unwrap();

        // SS_res = 168, SS_tot = 3570
        assert!((lin.r_squared - (1.0 - 168.0 / 3570.0)).abs() < 1e-9);
        assert!((quad.r_squared - 1.0).abs() < 1e-9);
        assert!((quad.coefficients[2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_quadratic_fit_at_micro_scale() {
        let x: Vec<f64> = (1..=8).map(|i| i as f64 * 1e-6).collect();
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();

        let lin = PolynomialFit::linear(&x, &y).unwrap();
        let quad = PolynomialFit::quadratic(&x, &y).unwrap();
        assert!((lin.r_squared - (1.0 - 168.0 / 3570.0)).abs() < 1e-9);
        assert!((quad.r_squared - 1.0).abs() < 1e-9);
        assert!((quad.coefficients[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_rejects_constant_x() {
        let x = [2.0; 6];
        let y = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert!(PolynomialFit::linear(&x, &y).is_none());
        assert!(PolynomialFit::quadratic(&[1.0, 2.0], &[1.0, 2.0]).is_none());
    }
}
