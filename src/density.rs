//! Reduced-resolution Gaussian kernel density estimation
//!
//! KDE is O(n · grid) and was the single largest latency cost of the
//! assumption checks, so the grid is capped at [`MAX_GRID_POINTS`] and callers
//! skip samples below their minimum size. Each grid evaluation bumps a
//! thread-local counter so tests can assert that latency-sensitive paths
//! (normality visual aids) never reach this code.

use crate::descriptive::{quantile_sorted, sample_variance, sorted};
use std::cell::Cell;
use std::f64::consts::PI;

pub const MAX_GRID_POINTS: usize = 50;

thread_local! {
    static GRID_EVALUATIONS: Cell<usize> = const { Cell::new(0) };
}

/// Number of KDE grid evaluations performed on the calling thread
pub fn evaluations_on_current_thread() -> usize {
    GRID_EVALUATIONS.with(|c| c.get())
}

/// Density curve sampled on an evenly spaced grid
#[derive(Debug, Clone, PartialEq)]
pub struct DensityCurve {
    pub grid: Vec<f64>,
    pub density: Vec<f64>,
    pub bandwidth: f64,
}

impl DensityCurve {
    /// Indices of local maxima whose height is at least `min_fraction` of the
    /// global maximum. Plateaus count once.
    pub fn peaks(&self, min_fraction: f64) -> Vec<usize> {
        let max = self.density.iter().cloned().fold(0.0_f64, f64::max);
        if max <= 0.0 {
            return Vec::new();
        }
        let floor = max * min_fraction;
        let d = &self.density;
        let mut peaks = Vec::new();
        let mut i = 0;
        while i < d.len() {
            // Extend across a plateau
            let mut j = i;
            while j + 1 < d.len() && d[j + 1] == d[i] {
                j += 1;
            }
            let left_lower = i == 0 || d[i - 1] < d[i];
            let right_lower = j + 1 == d.len() || d[j + 1] < d[j];
            if left_lower && right_lower && d[i] >= floor {
                peaks.push(i);
            }
            i = j + 1;
        }
        peaks
    }
}

/// Silverman's rule-of-thumb bandwidth; `None` for degenerate samples
pub fn silverman_bandwidth(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let sd = sample_variance(values).sqrt();
    let s = sorted(values);
    let iqr = quantile_sorted(&s, 0.75)? - quantile_sorted(&s, 0.25)?;
    let spread = if iqr > 0.0 { sd.min(iqr / 1.34) } else { sd };
    if spread <= 0.0 || !spread.is_finite() {
        return None;
    }
    Some(0.9 * spread * (values.len() as f64).powf(-0.2))
}

/// Evaluate a Gaussian KDE on `points` grid points (capped at
/// [`MAX_GRID_POINTS`]) spanning the data range padded by three bandwidths.
pub fn estimate(values: &[f64], points: usize) -> Option<DensityCurve> {
    let bandwidth = silverman_bandwidth(values)?;
    let points = points.clamp(2, MAX_GRID_POINTS);

    let lo = values.iter().cloned().fold(f64::INFINITY, f64::min) - 3.0 * bandwidth;
    let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max) + 3.0 * bandwidth;
    let step = (hi - lo) / (points - 1) as f64;

    let norm = 1.0 / (values.len() as f64 * bandwidth * (2.0 * PI).sqrt());
    let grid: Vec<f64> = (0..points).map(|i| lo + step * i as f64).collect();
    let density: Vec<f64> = grid
        .iter()
        .map(|&g| {
            values
                .iter()
                .map(|&v| {
                    let u = (g - v) / bandwidth;
                    (-0.5 * u * u).exp()
                })
                .sum::<f64>()
                * norm
        })
        .collect();

    GRID_EVALUATIONS.with(|c| c.set(c.get() + 1));

    Some(DensityCurve {
        grid,
        density,
        bandwidth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::normal_quantile;

    fn normal_scores(n: usize, shift: f64) -> Vec<f64> {
        (1..=n)
            .map(|i| normal_quantile((i as f64 - 0.5) / n as f64) + shift)
            .collect()
    }

    #[test]
    fn test_grid_is_capped() {
        let sample = normal_scores(100, 0.0);
        let curve = estimate(&sample, 200).unwrap();
        assert_eq!(curve.grid.len(), MAX_GRID_POINTS);
        assert_eq!(curve.density.len(), MAX_GRID_POINTS);
    }

    #[test]
    fn test_unimodal_sample_has_one_peak() {
        let curve = estimate(&normal_scores(60, 0.0), 50).unwrap();
        assert_eq!(curve.peaks(0.1).len(), 1);
    }

    #[test]
    fn test_well_separated_mixture_has_two_peaks() {
        let mut sample = normal_scores(40, -6.0);
        sample.extend(normal_scores(40, 6.0));
        let curve = estimate(&sample, 50).unwrap();
        assert_eq!(curve.peaks(0.1).len(), 2);
    }

    #[test]
    fn test_degenerate_sample_has_no_density() {
        assert!(estimate(&[1.0, 1.0, 1.0], 50).is_none());
        assert!(estimate(&[1.0], 50).is_none());
    }

    #[test]
    fn test_counter_tracks_evaluations() {
        let before = evaluations_on_current_thread();
        estimate(&normal_scores(30, 0.0), 50).unwrap();
        assert_eq!(evaluations_on_current_thread(), before + 1);
    }
}
