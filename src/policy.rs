// Guardian policy: every threshold the decision logic uses
//
// The verdict is a pure function of (test family, dataset, alpha, policy).
// Nothing is read from process state, so a freshly loaded policy always takes
// effect and two processes with the same policy file agree bit for bit. The
// policy fingerprint travels with each verdict to make that auditable.

use crate::assumption::AssumptionName;
use crate::diagnostics::DiagnosticsOptions;
use crate::error::GuardianError;
use crate::family::{RequirementTable, TestFamily};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const POLICY_VERSION: u32 = 1;

/// φ, the golden ratio; homoscedasticity variance-ratio thresholds are keyed to it
pub const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

/// Complete guardian configuration
///
/// # Example
/// ```
/// use statguard::policy::GuardianPolicy;
///
/// let policy = GuardianPolicy::default();
/// assert_eq!(policy.significance_level, 0.05);
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardianPolicy {
    pub version: u32,

    /// Default alpha when the caller supplies none
    pub significance_level: f64,

    /// Always run the independence check for robust families
    pub minimal_checks: bool,

    /// Overall evaluation deadline; `None` runs validators inline
    pub deadline_ms: Option<u64>,

    pub confidence: ConfidencePolicy,
    pub normality: NormalityPolicy,
    pub independence: IndependencePolicy,
    pub outliers: OutlierPolicy,
    pub sample_size: SampleSizePolicy,
    pub modality: ModalityPolicy,
    pub linearity: LinearityPolicy,
    pub homoscedasticity: HomoscedasticityPolicy,
    pub diagnostics: DiagnosticsOptions,

    /// Requirement overrides: family name → assumption names
    pub requirements: BTreeMap<String, Vec<String>>,
}

/// Per-result multipliers applied to the confidence score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidencePolicy {
    pub critical_multiplier: f64,
    pub warning_multiplier: f64,
    pub indeterminate_multiplier: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            critical_multiplier: 0.5,
            warning_multiplier: 0.85,
            indeterminate_multiplier: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalityPolicy {
    /// Samples shorter than this get no Q-Q/histogram visual aid
    pub visual_aid_min_n: usize,
    /// Shapiro-Wilk is used up to this size, Jarque-Bera above it
    pub shapiro_max_n: usize,
}

impl Default for NormalityPolicy {
    fn default() -> Self {
        Self {
            visual_aid_min_n: 20,
            shapiro_max_n: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndependencePolicy {
    pub min_n: usize,
    /// |lag-1 autocorrelation| at or above this escalates to critical
    pub strong_autocorrelation: f64,
}

impl Default for IndependencePolicy {
    fn default() -> Self {
        Self {
            min_n: 10,
            strong_autocorrelation: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierPolicy {
    /// Tukey fence multiplier k in Q1 - k·IQR, Q3 + k·IQR
    pub iqr_multiplier: f64,
    pub warning_proportion: f64,
    pub critical_proportion: f64,
}

impl Default for OutlierPolicy {
    fn default() -> Self {
        Self {
            iqr_multiplier: 1.5,
            warning_proportion: 0.05,
            critical_proportion: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleSizePolicy {
    pub critical_floor: usize,
    pub recommended_min: usize,
    /// Family name → recommended minimum per group
    pub per_family: BTreeMap<String, usize>,
}

impl Default for SampleSizePolicy {
    fn default() -> Self {
        let mut per_family = BTreeMap::new();
        per_family.insert(TestFamily::Regression.as_str().to_string(), 30);
        per_family.insert(TestFamily::Correlation.as_str().to_string(), 30);
        Self {
            critical_floor: 5,
            recommended_min: 20,
            per_family,
        }
    }
}

impl SampleSizePolicy {
    pub fn recommended_for(&self, family: TestFamily) -> usize {
        self.per_family
            .get(family.as_str())
            .copied()
            .unwrap_or(self.recommended_min)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalityPolicy {
    /// Density estimation is skipped below this size
    pub min_n: usize,
    pub grid_points: usize,
    /// Local maxima lower than this fraction of the global peak are ignored
    pub peak_fraction: f64,
}

impl Default for ModalityPolicy {
    fn default() -> Self {
        Self {
            min_n: 20,
            grid_points: crate::density::MAX_GRID_POINTS,
            peak_fraction: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearityPolicy {
    pub warning_improvement: f64,
    pub critical_improvement: f64,
    /// A significant runs test alone forces critical
    pub runs_test_forces_critical: bool,
    pub min_n: usize,
}

impl Default for LinearityPolicy {
    fn default() -> Self {
        Self {
            warning_improvement: 0.03,
            critical_improvement: 0.10,
            runs_test_forces_critical: true,
            min_n: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomoscedasticityPolicy {
    pub warning_ratio: f64,
    pub critical_ratio: f64,
    pub min_n: usize,
}

impl Default for HomoscedasticityPolicy {
    fn default() -> Self {
        Self {
            warning_ratio: GOLDEN_RATIO,
            critical_ratio: GOLDEN_RATIO * GOLDEN_RATIO,
            min_n: 8,
        }
    }
}

impl Default for GuardianPolicy {
    fn default() -> Self {
        Self {
            version: POLICY_VERSION,
            significance_level: 0.05,
            minimal_checks: true,
            deadline_ms: None,
            confidence: ConfidencePolicy::default(),
            normality: NormalityPolicy::default(),
            independence: IndependencePolicy::default(),
            outliers: OutlierPolicy::default(),
            sample_size: SampleSizePolicy::default(),
            modality: ModalityPolicy::default(),
            linearity: LinearityPolicy::default(),
            homoscedasticity: HomoscedasticityPolicy::default(),
            diagnostics: DiagnosticsOptions::default(),
            requirements: BTreeMap::new(),
        }
    }
}

impl GuardianPolicy {
    /// Stricter thresholds: blocks earlier, flags smaller departures
    ///
    /// Strict here means stricter about the assumptions, not about the
    /// analysis: the significance level rises to 0.10, so each assumption
    /// test rejects more readily and more data is flagged.
    pub fn strict() -> Self {
        Self {
            significance_level: 0.10,
            linearity: LinearityPolicy {
                warning_improvement: 0.02,
                critical_improvement: 0.05,
                ..LinearityPolicy::default()
            },
            outliers: OutlierPolicy {
                warning_proportion: 0.02,
                critical_proportion: 0.10,
                ..OutlierPolicy::default()
            },
            sample_size: SampleSizePolicy {
                critical_floor: 10,
                recommended_min: 30,
                ..SampleSizePolicy::default()
            },
            ..Self::default()
        }
    }

    /// Looser thresholds for exploratory work
    pub fn permissive() -> Self {
        Self {
            significance_level: 0.01,
            linearity: LinearityPolicy {
                warning_improvement: 0.05,
                critical_improvement: 0.20,
                runs_test_forces_critical: false,
                ..LinearityPolicy::default()
            },
            outliers: OutlierPolicy {
                iqr_multiplier: 3.0,
                warning_proportion: 0.10,
                critical_proportion: 0.25,
            },
            sample_size: SampleSizePolicy {
                critical_floor: 3,
                recommended_min: 10,
                per_family: BTreeMap::new(),
            },
            ..Self::default()
        }
    }

    /// Load and validate a policy from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid policy file {}", path.display()))
    }

    /// Parse and validate a policy from TOML; missing keys take defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let policy: Self = toml::from_str(content).context("Failed to parse policy TOML")?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize policy")
    }

    /// Check ranges and cross-field constraints
    pub fn validate(&self) -> std::result::Result<(), GuardianError> {
        let invalid = |reason: String| Err(GuardianError::InvalidConfig { reason });

        if self.version != POLICY_VERSION {
            return invalid(format!(
                "unsupported policy version {} (expected {})",
                self.version, POLICY_VERSION
            ));
        }
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return invalid(format!(
                "significance_level must be in (0, 1), got {}",
                self.significance_level
            ));
        }
        for (name, m) in [
            ("critical_multiplier", self.confidence.critical_multiplier),
            ("warning_multiplier", self.confidence.warning_multiplier),
            ("indeterminate_multiplier", self.confidence.indeterminate_multiplier),
        ] {
            if !(0.0..=1.0).contains(&m) {
                return invalid(format!("confidence.{} must be in [0, 1], got {}", name, m));
            }
        }
        if self.confidence.critical_multiplier > self.confidence.warning_multiplier {
            return invalid("confidence.critical_multiplier must not exceed warning_multiplier".into());
        }
        if self.normality.shapiro_max_n < 3 {
            return invalid("normality.shapiro_max_n must be >= 3".into());
        }
        if !(0.0..=1.0).contains(&self.independence.strong_autocorrelation) {
            return invalid("independence.strong_autocorrelation must be in [0, 1]".into());
        }
        if self.independence.min_n < 3 {
            return invalid("independence.min_n must be >= 3".into());
        }
        if self.outliers.iqr_multiplier <= 0.0 {
            return invalid("outliers.iqr_multiplier must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.outliers.warning_proportion)
            || !(0.0..=1.0).contains(&self.outliers.critical_proportion)
            || self.outliers.warning_proportion > self.outliers.critical_proportion
        {
            return invalid(
                "outliers proportions must be in [0, 1] with warning <= critical".into(),
            );
        }
        if self.sample_size.critical_floor > self.sample_size.recommended_min {
            return invalid("sample_size.critical_floor must not exceed recommended_min".into());
        }
        for name in self.sample_size.per_family.keys() {
            name.parse::<TestFamily>()
                .map_err(|_| GuardianError::InvalidConfig {
                    reason: format!("sample_size.per_family names unknown family '{}'", name),
                })?;
        }
        if self.modality.grid_points < 2 || self.modality.grid_points > crate::density::MAX_GRID_POINTS {
            return invalid(format!(
                "modality.grid_points must be in [2, {}], got {}",
                crate::density::MAX_GRID_POINTS,
                self.modality.grid_points
            ));
        }
        if !(0.0..1.0).contains(&self.modality.peak_fraction) {
            return invalid("modality.peak_fraction must be in [0, 1)".into());
        }
        if self.linearity.warning_improvement < 0.0
            || self.linearity.warning_improvement > self.linearity.critical_improvement
        {
            return invalid(
                "linearity improvements must be non-negative with warning <= critical".into(),
            );
        }
        if self.linearity.min_n < 4 {
            return invalid("linearity.min_n must be >= 4".into());
        }
        if self.homoscedasticity.warning_ratio < 1.0
            || self.homoscedasticity.warning_ratio > self.homoscedasticity.critical_ratio
        {
            return invalid(
                "homoscedasticity ratios must be >= 1 with warning <= critical".into(),
            );
        }
        if self.homoscedasticity.min_n < 4 {
            return invalid("homoscedasticity.min_n must be >= 4".into());
        }
        if self.diagnostics.max_bins == 0 || self.diagnostics.max_qq_points < 2 {
            return invalid("diagnostics.max_bins must be > 0 and max_qq_points >= 2".into());
        }
        self.requirement_table()?;
        Ok(())
    }

    /// Built-in requirement table with this policy's overrides applied
    pub fn requirement_table(&self) -> std::result::Result<RequirementTable, GuardianError> {
        let mut table = RequirementTable::builtin();
        for (family_name, assumptions) in &self.requirements {
            let family: TestFamily = family_name.parse()?;
            let parsed = assumptions
                .iter()
                .map(|a| a.parse::<AssumptionName>())
                .collect::<std::result::Result<Vec<_>, _>>()?;
            table.set(family, parsed);
        }
        Ok(table)
    }

    /// SHA-256 over the canonical JSON form, hex encoded
    pub fn fingerprint(&self) -> String {
        // Struct fields serialize in declaration order and maps are BTreeMaps,
        // so the JSON form is canonical.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = GuardianPolicy::default();
        assert_eq!(policy.significance_level, 0.05);
        assert!(policy.minimal_checks);
        assert_eq!(policy.modality.grid_points, 50);
        assert_eq!(policy.linearity.warning_improvement, 0.03);
        assert_eq!(policy.linearity.critical_improvement, 0.10);
        assert!((policy.homoscedasticity.critical_ratio - 2.618_034).abs() < 1e-6);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        assert!(GuardianPolicy::strict().validate().is_ok());
        assert!(GuardianPolicy::permissive().validate().is_ok());
        assert_eq!(GuardianPolicy::strict().significance_level, 0.10);
        assert!(!GuardianPolicy::permissive().linearity.runs_test_forces_critical);
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let toml = r#"
            significance_level = 0.01

            [linearity]
            warning_improvement = 0.05
        "#;
        let policy = GuardianPolicy::from_toml_str(toml).unwrap();
        assert_eq!(policy.significance_level, 0.01);
        assert_eq!(policy.linearity.warning_improvement, 0.05);
        assert_eq!(policy.linearity.critical_improvement, 0.10);
        assert_eq!(policy.outliers, OutlierPolicy::default());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_significance_level() {
        let mut policy = GuardianPolicy::default();
        policy.significance_level = 1.5;
        assert!(policy.validate().is_err());
        policy.significance_level = 0.0;
        assert!(policy.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_modality_grid_cannot_exceed_cap() {
        let mut policy = GuardianPolicy::default();
        policy.modality.grid_points = 200;
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("grid_points"));
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_inverted_linearity_thresholds_rejected() {
        let mut policy = GuardianPolicy::default();
        policy.linearity.warning_improvement = 0.2;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_requirement_overrides() {
        let toml = r#"
            [requirements]
            bootstrap = ["outliers"]
        "#;
        let policy = GuardianPolicy::from_toml_str(toml).unwrap();
        let table = policy.requirement_table().unwrap();
        assert_eq!(
            table.get(TestFamily::Bootstrap).unwrap(),
            &[AssumptionName::Outliers]
        );
    }

    #[test]
    fn test_requirement_override_with_unknown_names_rejected() {
        assert!(GuardianPolicy::from_toml_str("[requirements]\nz_test = [\"normality\"]").is_err());
        assert!(GuardianPolicy::from_toml_str("[requirements]\nt_test = [\"sphericity\"]").is_err());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = GuardianPolicy::default();
        let b = GuardianPolicy::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let c = GuardianPolicy::strict();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_toml_round_trip() {
        let policy = GuardianPolicy::strict();
        let text = policy.to_toml_string().unwrap();
        let parsed = GuardianPolicy::from_toml_str(&text).unwrap();
        assert_eq!(parsed, policy);
    }

    #[test]
    fn test_recommended_sample_size_per_family() {
        let policy = SampleSizePolicy::default();
        assert_eq!(policy.recommended_for(TestFamily::Regression), 30);
        assert_eq!(policy.recommended_for(TestFamily::TTest), 20);
    }
}
