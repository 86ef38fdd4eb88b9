// Sample size: smallest group against the policy floor

use super::Validator;
use crate::assumption::{AssumptionName, Severity, ValidationResult};
use crate::dataset::AnalysisContext;
use crate::error::Result;
use crate::policy::SampleSizePolicy;

#[derive(Debug, Clone)]
pub struct SampleSizeValidator {
    policy: SampleSizePolicy,
}

impl SampleSizeValidator {
    pub fn new(policy: SampleSizePolicy) -> Self {
        Self { policy }
    }
}

impl Validator for SampleSizeValidator {
    fn assumption(&self) -> AssumptionName {
        AssumptionName::SampleSize
    }

    fn validate(&self, ctx: &AnalysisContext) -> Result<ValidationResult> {
        let Some(smallest) = ctx.samples.iter().min_by_key(|s| s.len()) else {
            return Ok(ValidationResult::violation(
                AssumptionName::SampleSize,
                Severity::Critical,
                0.0,
                None,
                "No observations",
                "Collect data before testing.",
            ));
        };
        let n = smallest.len();
        let recommended = self.policy.recommended_for(ctx.family);

        let result = if n < self.policy.critical_floor {
            ValidationResult::violation(
                AssumptionName::SampleSize,
                Severity::Critical,
                n as f64,
                None,
                format!(
                    "'{}' has only {} observation(s); at least {} are required",
                    smallest.name, n, self.policy.critical_floor
                ),
                format!(
                    "Collect more data (at least {} per group recommended for {}).",
                    recommended, ctx.family
                ),
            )
        } else if n < recommended {
            ValidationResult::violation(
                AssumptionName::SampleSize,
                Severity::Warning,
                n as f64,
                None,
                format!(
                    "'{}' has {} observations, below the recommended {} for {}",
                    smallest.name, n, recommended, ctx.family
                ),
                "Results may be underpowered and assumption checks unreliable; consider collecting more data or using exact/permutation methods.",
            )
        } else {
            ValidationResult::pass(
                AssumptionName::SampleSize,
                n as f64,
                None,
                format!("Smallest group has {} observations (recommended {})", n, recommended),
            )
        };

        Ok(result.with_detail("recommended_min", recommended as f64))
    }
}
