// Modality: peak count of a reduced-grid kernel density estimate

use super::Validator;
use crate::assumption::{AssumptionName, Severity, ValidationResult};
use crate::dataset::AnalysisContext;
use crate::density;
use crate::error::Result;
use crate::policy::ModalityPolicy;

#[derive(Debug, Clone)]
pub struct ModalityDetector {
    policy: ModalityPolicy,
}

impl ModalityDetector {
    pub fn new(policy: ModalityPolicy) -> Self {
        Self { policy }
    }

    /// Number of modes, or `None` when the sample is too small or degenerate
    pub fn count_modes(&self, values: &[f64]) -> Option<usize> {
        if values.len() < self.policy.min_n {
            return None;
        }
        let curve = density::estimate(values, self.policy.grid_points)?;
        Some(curve.peaks(self.policy.peak_fraction).len())
    }
}

impl Validator for ModalityDetector {
    fn assumption(&self) -> AssumptionName {
        AssumptionName::Modality
    }

    fn validate(&self, ctx: &AnalysisContext) -> Result<ValidationResult> {
        // (modes, sample)
        let mut worst: Option<(usize, &str)> = None;
        for sample in &ctx.samples {
            let Some(modes) = self.count_modes(&sample.values) else {
                continue;
            };
            tracing::debug!(sample = %sample.name, modes, "kde modes");
            if worst.map_or(true, |(m, _)| modes > m) {
                worst = Some((modes, &sample.name));
            }
        }

        let Some((modes, name)) = worst else {
            return Ok(ValidationResult::not_assessable(
                AssumptionName::Modality,
                format!(
                    "Modality check skipped: needs at least {} observations per sample",
                    self.policy.min_n
                ),
            ));
        };

        if modes >= 2 {
            Ok(ValidationResult::violation(
                AssumptionName::Modality,
                Severity::Warning,
                modes as f64,
                None,
                format!("'{}' appears to have {} modes", name, modes),
                "A multimodal distribution suggests a mixture of populations; look for an unmodelled grouping factor before comparing means.",
            ))
        } else {
            Ok(ValidationResult::pass(
                AssumptionName::Modality,
                modes as f64,
                None,
                "Distributions appear unimodal",
            ))
        }
    }
}
