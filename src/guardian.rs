// Guardian core: resolve requirements, run validators, compose the verdict
//
// The verdict is a pure function of (family, dataset, alpha, policy). Without
// a deadline every validator runs inline on the calling thread. With one,
// each validator runs on its own worker thread and reports over a channel;
// validators that miss the deadline are abandoned and recorded as
// indeterminate. Results are always assembled in requirement order, so
// scheduling never shows in the output.

use crate::assumption::{AssumptionName, IndeterminateCheck, Severity, ValidationResult};
use crate::dataset::{AnalysisContext, Dataset};
use crate::diagnostics::{generate_diagnostics, DiagnosticsPayload};
use crate::error::{GuardianError, Result};
use crate::family::{RequirementTable, TestFamily};
use crate::policy::GuardianPolicy;
use crate::validators::{NormalityValidator, Validator, ValidatorRegistry};
use crossbeam::channel::{bounded, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of one guardian evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianVerdict {
    pub test_family: TestFamily,
    pub alpha: f64,
    /// False whenever any check is critical
    pub can_proceed: bool,
    /// Failed checks, critical first, then in requirement order
    pub violations: Vec<ValidationResult>,
    /// Every completed check, in requirement order
    pub checks: Vec<ValidationResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indeterminate: Vec<IndeterminateCheck>,
    pub confidence_score: f64,
    pub diagnostics: DiagnosticsPayload,
    pub policy_fingerprint: String,
    pub elapsed_ms: u64,
}

impl GuardianVerdict {
    pub fn critical_count(&self) -> usize {
        self.count(Severity::Critical)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }

    pub fn check(&self, assumption: AssumptionName) -> Option<&ValidationResult> {
        self.checks.iter().find(|c| c.assumption == assumption)
    }
}

/// Per-call execution options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuardianOptions {
    /// Overall budget for the validators; `None` runs them inline
    pub deadline: Option<Duration>,
}

impl GuardianOptions {
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Guardian {
    table: RequirementTable,
    registry: ValidatorRegistry,
    policy: GuardianPolicy,
    fingerprint: String,
    options: GuardianOptions,
}

impl Guardian {
    /// Build a guardian, checking once that every assumption the table can
    /// require has a registered validator
    pub fn new(
        table: RequirementTable,
        registry: ValidatorRegistry,
        policy: GuardianPolicy,
    ) -> Result<Self> {
        policy.validate()?;
        registry.check_complete(&table, policy.minimal_checks)?;
        Ok(Self::unchecked(table, registry, policy))
    }

    /// Build without the completeness self-check; a missing validator then
    /// surfaces as `MissingValidator` from `evaluate`
    pub fn unchecked(
        table: RequirementTable,
        registry: ValidatorRegistry,
        policy: GuardianPolicy,
    ) -> Self {
        let fingerprint = policy.fingerprint();
        let options = GuardianOptions {
            deadline: policy.deadline_ms.map(Duration::from_millis),
        };
        Self {
            table,
            registry,
            policy,
            fingerprint,
            options,
        }
    }

    /// Built-in validators and the policy's requirement table
    pub fn from_policy(policy: GuardianPolicy) -> Result<Self> {
        let table = policy.requirement_table()?;
        let registry = ValidatorRegistry::standard(&policy);
        Self::new(table, registry, policy)
    }

    pub fn with_options(mut self, options: GuardianOptions) -> Self {
        self.options = options;
        self
    }

    pub fn policy(&self) -> &GuardianPolicy {
        &self.policy
    }

    pub fn options(&self) -> &GuardianOptions {
        &self.options
    }

    pub fn table(&self) -> &RequirementTable {
        &self.table
    }

    /// Assumptions checked for `family`, in evaluation order
    pub fn requirements(&self, family: TestFamily) -> Result<Vec<AssumptionName>> {
        self.table.resolve(family, self.policy.minimal_checks)
    }

    pub fn evaluate_named(&self, family: &str, dataset: Dataset, alpha: f64) -> Result<GuardianVerdict> {
        self.evaluate(family.parse()?, dataset, alpha)
    }

    /// Evaluate with the policy's default significance level
    pub fn evaluate_default(&self, family: TestFamily, dataset: Dataset) -> Result<GuardianVerdict> {
        self.evaluate(family, dataset, self.policy.significance_level)
    }

    pub fn evaluate(&self, family: TestFamily, dataset: Dataset, alpha: f64) -> Result<GuardianVerdict> {
        let start = Instant::now();

        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(GuardianError::InvalidConfig {
                reason: format!("alpha must be in (0, 1), got {}", alpha),
            });
        }
        let required = self.requirements(family)?;
        let validators = self.registry.resolve(family, &required)?;
        if !family.accepts(&dataset) {
            return Err(GuardianError::DatasetMismatch {
                family: family.as_str().to_string(),
                expected: family.expected_shape().to_string(),
            });
        }

        tracing::debug!(
            family = %family,
            shape = dataset.shape_name(),
            n = dataset.observations(),
            checks = validators.len(),
            "evaluating"
        );

        let mut diagnostics = generate_diagnostics(&dataset, Some(family), &self.policy.diagnostics);
        let ctx = AnalysisContext::new(family, alpha, dataset);
        if required.contains(&AssumptionName::Normality) {
            diagnostics.normality_aids =
                NormalityValidator::new(self.policy.normality.clone(), self.policy.diagnostics.clone())
                    .visual_aids(&ctx.samples);
        }

        let (checks, indeterminate) = match self.options.deadline {
            Some(budget) => run_with_deadline(&validators, ctx, budget)?,
            None => (run_inline(&validators, &ctx)?, Vec::new()),
        };

        let mut violations: Vec<ValidationResult> =
            checks.iter().filter(|c| c.is_violation()).cloned().collect();
        violations.sort_by_key(|v| Reverse(v.severity));

        let can_proceed = !checks.iter().any(|c| c.severity == Severity::Critical);
        let confidence_score = self.confidence(&checks, indeterminate.len());

        let verdict = GuardianVerdict {
            test_family: family,
            alpha,
            can_proceed,
            violations,
            checks,
            indeterminate,
            confidence_score,
            diagnostics,
            policy_fingerprint: self.fingerprint.clone(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            family = %family,
            can_proceed,
            confidence = confidence_score,
            critical = verdict.critical_count(),
            warnings = verdict.warning_count(),
            indeterminate = verdict.indeterminate.len(),
            elapsed_ms = verdict.elapsed_ms,
            "verdict"
        );
        Ok(verdict)
    }

    /// Product of per-result multipliers, clamped to [0, 1]
    fn confidence(&self, checks: &[ValidationResult], indeterminate: usize) -> f64 {
        let c = &self.policy.confidence;
        let score = checks.iter().fold(1.0, |acc, check| match check.severity {
            Severity::Critical => acc * c.critical_multiplier,
            Severity::Warning => acc * c.warning_multiplier,
            Severity::None => acc,
        }) * c.indeterminate_multiplier.powi(indeterminate as i32);
        score.clamp(0.0, 1.0)
    }
}

fn run_inline(validators: &[Arc<dyn Validator>], ctx: &AnalysisContext) -> Result<Vec<ValidationResult>> {
    validators
        .iter()
        .map(|v| {
            let result = v.validate(ctx)?;
            tracing::debug!(assumption = %result.assumption, severity = %result.severity, "check");
            Ok(result)
        })
        .collect()
}

fn run_with_deadline(
    validators: &[Arc<dyn Validator>],
    ctx: AnalysisContext,
    budget: Duration,
) -> Result<(Vec<ValidationResult>, Vec<IndeterminateCheck>)> {
    let deadline = Instant::now() + budget;
    let ctx = Arc::new(ctx);

    let receivers: Vec<_> = validators
        .iter()
        .map(|validator| {
            let (tx, rx) = bounded(1);
            let validator = Arc::clone(validator);
            let ctx = Arc::clone(&ctx);
            let spawned = thread::Builder::new()
                .name(format!("statguard-{}", validator.assumption()))
                .spawn(move || {
                    // The receiver may be gone if the deadline already passed
                    let _ = tx.send(validator.validate(&ctx));
                });
            if let Err(e) = spawned {
                tracing::warn!("Failed to spawn validator thread: {}", e);
            }
            rx
        })
        .collect();

    let mut checks = Vec::with_capacity(validators.len());
    let mut indeterminate = Vec::new();
    for (validator, rx) in validators.iter().zip(receivers) {
        let assumption = validator.assumption();
        match rx.recv_deadline(deadline) {
            Ok(result) => {
                let result = result?;
                tracing::debug!(assumption = %assumption, severity = %result.severity, "check");
                checks.push(result);
            }
            Err(RecvTimeoutError::Timeout) => {
                let e = GuardianError::ValidatorTimeout {
                    assumption,
                    budget_ms: budget.as_millis() as u64,
                };
                tracing::warn!("{}", e);
                indeterminate.push(IndeterminateCheck {
                    assumption,
                    reason: e.to_string(),
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("Validator for '{}' stopped without a result", assumption);
                indeterminate.push(IndeterminateCheck {
                    assumption,
                    reason: "validator stopped without producing a result".to_string(),
                });
            }
        }
    }
    Ok((checks, indeterminate))
}
