// Assumption validators and their registry
//
// Each validator checks one statistical precondition and returns a graded
// ValidationResult. Validators are pure: same context in, same result out,
// no interior state. They never panic on well-formed data; data too small for
// a statistic yields a satisfied "not assessable" result instead.
//
// The registry maps every AssumptionName to its implementation. A requirement
// without an implementation is a fatal configuration error (MissingValidator),
// never a silently skipped check.

mod homoscedasticity;
mod independence;
mod linearity;
mod modality;
mod normality;
mod outliers;
mod sample_size;
mod variance;

pub use homoscedasticity::{breusch_pagan, half_variance_ratio, BreuschPagan, HomoscedasticityValidator};
pub use independence::{ljung_box_lag1, IndependenceValidator};
pub use linearity::{runs_test, LinearityValidator, RunsTest};
pub use modality::ModalityDetector;
pub use normality::{jarque_bera, shapiro_wilk, NormalityValidator, ShapiroWilk};
pub use outliers::{tukey_fences, OutlierDetector, TukeyFences};
pub use sample_size::SampleSizeValidator;
pub use variance::{brown_forsythe, LeveneTest, VarianceHomogeneityValidator};

use crate::assumption::{AssumptionName, ValidationResult};
use crate::dataset::AnalysisContext;
use crate::error::{GuardianError, Result};
use crate::family::{RequirementTable, TestFamily};
use crate::policy::GuardianPolicy;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One assumption check
pub trait Validator: Send + Sync {
    fn assumption(&self) -> AssumptionName;

    fn validate(&self, ctx: &AnalysisContext) -> Result<ValidationResult>;
}

/// Assumption → validator
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: BTreeMap<AssumptionName, Arc<dyn Validator>>,
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("registered", &self.registered())
            .finish()
    }
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All eight built-in validators configured from `policy`
    pub fn standard(policy: &GuardianPolicy) -> Self {
        Self::new()
            .with(NormalityValidator::new(
                policy.normality.clone(),
                policy.diagnostics.clone(),
            ))
            .with(VarianceHomogeneityValidator)
            .with(IndependenceValidator::new(policy.independence.clone()))
            .with(OutlierDetector::new(policy.outliers.clone()))
            .with(SampleSizeValidator::new(policy.sample_size.clone()))
            .with(ModalityDetector::new(policy.modality.clone()))
            .with(LinearityValidator::new(policy.linearity.clone()))
            .with(HomoscedasticityValidator::new(policy.homoscedasticity.clone()))
    }

    /// Register a validator, returning any it replaced
    pub fn register(&mut self, validator: Arc<dyn Validator>) -> Option<Arc<dyn Validator>> {
        self.validators.insert(validator.assumption(), validator)
    }

    pub fn with<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.register(Arc::new(validator));
        self
    }

    pub fn without(mut self, assumption: AssumptionName) -> Self {
        self.validators.remove(&assumption);
        self
    }

    pub fn get(&self, assumption: AssumptionName) -> Option<&Arc<dyn Validator>> {
        self.validators.get(&assumption)
    }

    pub fn contains(&self, assumption: AssumptionName) -> bool {
        self.validators.contains_key(&assumption)
    }

    pub fn registered(&self) -> Vec<AssumptionName> {
        self.validators.keys().copied().collect()
    }

    /// Validators for `required`, in order; the first gap is fatal
    pub fn resolve(
        &self,
        family: TestFamily,
        required: &[AssumptionName],
    ) -> Result<Vec<Arc<dyn Validator>>> {
        required
            .iter()
            .map(|assumption| {
                self.validators
                    .get(assumption)
                    .cloned()
                    .ok_or_else(|| GuardianError::MissingValidator {
                        assumption: *assumption,
                        family: family.as_str().to_string(),
                    })
            })
            .collect()
    }

    /// Self-check: every assumption any family in `table` can require has an
    /// implementation
    pub fn check_complete(&self, table: &RequirementTable, minimal_checks: bool) -> Result<()> {
        for (family, assumption) in table.assumptions_in_use(minimal_checks) {
            if !self.contains(assumption) {
                return Err(GuardianError::MissingValidator {
                    assumption,
                    family: family.as_str().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Distribution-free alternative to suggest when parametric assumptions fail
pub(crate) fn robust_alternative(family: TestFamily) -> &'static str {
    match family {
        TestFamily::TTest | TestFamily::WelchTTest => "the Mann-Whitney U test",
        TestFamily::PairedTTest => "the Wilcoxon signed-rank test",
        TestFamily::Anova => "the Kruskal-Wallis test",
        TestFamily::Regression => "robust regression or bootstrap confidence intervals",
        TestFamily::Correlation => "Spearman's rank correlation",
        TestFamily::MannWhitney
        | TestFamily::Wilcoxon
        | TestFamily::KruskalWallis
        | TestFamily::Bootstrap => "bootstrap inference",
    }
}

pub(crate) fn format_p(p: f64) -> String {
    if p < 1e-4 {
        "p<0.0001".to_string()
    } else {
        format!("p={:.4}", p)
    }
}
