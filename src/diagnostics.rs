//! Diagnostic visualization payloads (histograms, Q-Q plots, residual plots)
//!
//! All plots are closed-form: sorting plus normal quantiles, O(n log n). No
//! kernel density estimate is computed here; see [`crate::density`] for the
//! one place that still estimates densities, at reduced resolution.
//!
//! Input shape is never guessed: a [`Dataset`] is already a tagged union, and
//! the JSON entry point ([`diagnostics_from_json`]) turns any unrecognized
//! shape into an empty payload instead of an error.

use crate::dataset::Dataset;
use crate::descriptive::{sorted, PolynomialFit};
use crate::distributions::normal_quantile;
use crate::family::TestFamily;
use aprender::stats::DescriptiveStats;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trueno::Vector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsOptions {
    pub max_bins: usize,
    pub max_qq_points: usize,
}

impl Default for DiagnosticsOptions {
    fn default() -> Self {
        Self {
            max_bins: 30,
            max_qq_points: 256,
        }
    }
}

/// Histogram with `counts.len() + 1` bin edges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Five-number summary plus moments, in f32 for chart payloads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub n: usize,
    pub mean: f32,
    /// Population standard deviation
    pub stddev: f32,
    pub min: f32,
    pub q1: f32,
    pub median: f32,
    pub q3: f32,
    pub max: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDiagnostics {
    pub name: String,
    pub summary: SampleSummary,
    pub histogram: Histogram,
    /// (theoretical quantile, sample quantile)
    pub qq_plot: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsPayload {
    pub histogram: Histogram,
    pub qq_plot: Vec<[f64; 2]>,
    /// (fitted, residual) for paired data under regression/correlation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub residual_plot: Vec<[f64; 2]>,
    pub groups: Vec<GroupDiagnostics>,
    /// Q-Q and histogram aids for the samples the normality check tested,
    /// limited to those of at least `normality.visual_aid_min_n` points
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normality_aids: Vec<GroupDiagnostics>,
}

impl DiagnosticsPayload {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
            && self.qq_plot.is_empty()
            && self.residual_plot.is_empty()
            && self.groups.is_empty()
            && self.normality_aids.is_empty()
    }
}

/// Sturges histogram capped at `max_bins`
pub fn histogram(values: &[f64], max_bins: usize) -> Histogram {
    if values.is_empty() || max_bins == 0 {
        return Histogram::default();
    }
    let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if hi - lo <= f64::EPSILON * lo.abs().max(hi.abs()) {
        return Histogram {
            edges: vec![lo - 0.5, hi + 0.5],
            counts: vec![values.len()],
        };
    }

    let sturges = ((values.len() as f64).log2().ceil() as usize + 1).max(1);
    let bins = sturges.min(max_bins);
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Histogram { edges, counts }
}

/// Normal Q-Q coordinates, evenly subsampled to at most `max_points`
pub fn qq_points(values: &[f64], max_points: usize) -> Vec<[f64; 2]> {
    let n = values.len();
    if n == 0 || max_points == 0 {
        return Vec::new();
    }
    let s = sorted(values);
    let point = |i: usize| [normal_quantile((i as f64 + 0.5) / n as f64), s[i]];

    if n <= max_points {
        return (0..n).map(point).collect();
    }
    if max_points == 1 {
        return vec![point(n / 2)];
    }
    let step = (n - 1) as f64 / (max_points - 1) as f64;
    let mut out: Vec<[f64; 2]> = Vec::with_capacity(max_points);
    let mut last = usize::MAX;
    for j in 0..max_points {
        let i = ((j as f64 * step).round() as usize).min(n - 1);
        if i != last {
            out.push(point(i));
            last = i;
        }
    }
    out
}

/// Summary statistics via trueno (moments) and aprender (quantiles)
pub fn summarize(values: &[f64]) -> SampleSummary {
    if values.is_empty() {
        return SampleSummary::default();
    }
    let narrow: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    let vec = Vector::from_slice(&narrow);
    let stats = DescriptiveStats::new(&vec);

    SampleSummary {
        n: values.len(),
        mean: vec.mean().unwrap_or_default(),
        stddev: vec.stddev().unwrap_or_default(),
        min: vec.min().unwrap_or_default(),
        q1: stats.quantile(0.25).unwrap_or_default(),
        median: stats.quantile(0.5).unwrap_or_default(),
        q3: stats.quantile(0.75).unwrap_or_default(),
        max: vec.max().unwrap_or_default(),
    }
}

pub fn group_diagnostics(name: &str, values: &[f64], options: &DiagnosticsOptions) -> GroupDiagnostics {
    GroupDiagnostics {
        name: name.to_string(),
        summary: summarize(values),
        histogram: histogram(values, options.max_bins),
        qq_plot: qq_points(values, options.max_qq_points),
    }
}

/// Build diagnostics for a dataset
///
/// Overall plots use the family's analysis view flattened into one combined
/// sample (groups are concatenated, paired data becomes residuals or
/// differences). Per-group plots use the data as supplied.
pub fn generate_diagnostics(
    dataset: &Dataset,
    family: Option<TestFamily>,
    options: &DiagnosticsOptions,
) -> DiagnosticsPayload {
    let analysis = match family {
        Some(f) => dataset.analysis_samples(f),
        None => dataset.raw_samples(),
    };
    let overall: Vec<f64> = analysis
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .collect();

    let groups = dataset
        .raw_samples()
        .iter()
        .map(|s| group_diagnostics(&s.name, &s.values, options))
        .collect();

    let residual_plot = match (dataset, family) {
        (Dataset::Paired { x, y }, Some(TestFamily::Regression | TestFamily::Correlation)) => {
            PolynomialFit::linear(x, y)
                .map(|fit| {
                    let pts: Vec<[f64; 2]> = fit
                        .fitted
                        .iter()
                        .zip(&fit.residuals)
                        .map(|(f, r)| [*f, *r])
                        .collect();
                    thin(pts, options.max_qq_points)
                })
                .unwrap_or_default()
        }
        _ => Vec::new(),
    };

    DiagnosticsPayload {
        histogram: histogram(&overall, options.max_bins),
        qq_plot: qq_points(&overall, options.max_qq_points),
        residual_plot,
        groups,
        normality_aids: Vec::new(),
    }
}

/// Diagnostics straight from caller JSON. Unrecognized shapes and empty
/// input yield an empty payload; this never fails.
pub fn diagnostics_from_json(
    value: &Value,
    family: Option<TestFamily>,
    options: &DiagnosticsOptions,
) -> DiagnosticsPayload {
    match Dataset::from_json(value) {
        Ok(dataset) => generate_diagnostics(&dataset, family, options),
        Err(e) => {
            tracing::warn!("Skipping diagnostics: {}", e);
            DiagnosticsPayload::empty()
        }
    }
}

fn thin(points: Vec<[f64; 2]>, max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points || max_points == 0 {
        return points;
    }
    let stride = points.len().div_ceil(max_points);
    points.into_iter().step_by(stride).collect()
}
