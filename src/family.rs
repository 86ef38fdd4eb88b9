//! Test families and the requirement table
//!
//! Maps each test family to the ordered list of assumptions it must satisfy.
//! Robust and non-parametric families map to a reduced or empty list: that is
//! an explicit exemption, recorded here, not an omission.

use crate::assumption::AssumptionName;
use crate::dataset::Dataset;
use crate::error::{GuardianError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestFamily {
    TTest,
    WelchTTest,
    PairedTTest,
    MannWhitney,
    Wilcoxon,
    KruskalWallis,
    Bootstrap,
    Anova,
    Regression,
    Correlation,
}

impl TestFamily {
    pub const ALL: [TestFamily; 10] = [
        TestFamily::TTest,
        TestFamily::WelchTTest,
        TestFamily::PairedTTest,
        TestFamily::MannWhitney,
        TestFamily::Wilcoxon,
        TestFamily::KruskalWallis,
        TestFamily::Bootstrap,
        TestFamily::Anova,
        TestFamily::Regression,
        TestFamily::Correlation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestFamily::TTest => "t_test",
            TestFamily::WelchTTest => "welch_t_test",
            TestFamily::PairedTTest => "paired_t_test",
            TestFamily::MannWhitney => "mann_whitney",
            TestFamily::Wilcoxon => "wilcoxon",
            TestFamily::KruskalWallis => "kruskal_wallis",
            TestFamily::Bootstrap => "bootstrap",
            TestFamily::Anova => "anova",
            TestFamily::Regression => "regression",
            TestFamily::Correlation => "correlation",
        }
    }

    /// Non-parametric or resampling methods with relaxed requirements
    pub fn is_robust(&self) -> bool {
        matches!(
            self,
            TestFamily::MannWhitney
                | TestFamily::Wilcoxon
                | TestFamily::KruskalWallis
                | TestFamily::Bootstrap
        )
    }

    /// Human-readable description of the dataset shape this family takes
    pub fn expected_shape(&self) -> &'static str {
        match self {
            TestFamily::TTest | TestFamily::WelchTTest | TestFamily::MannWhitney => {
                "a single sample or exactly two groups"
            }
            TestFamily::PairedTTest | TestFamily::Wilcoxon => "paired x/y (or a sample of differences)",
            TestFamily::Anova | TestFamily::KruskalWallis => "two or more groups",
            TestFamily::Regression | TestFamily::Correlation => "paired x/y",
            TestFamily::Bootstrap => "any",
        }
    }

    pub fn accepts(&self, dataset: &Dataset) -> bool {
        match self {
            TestFamily::TTest | TestFamily::WelchTTest | TestFamily::MannWhitney => match dataset {
                Dataset::Single(_) => true,
                Dataset::Groups(groups) => groups.len() == 2,
                Dataset::Paired { .. } => false,
            },
            TestFamily::PairedTTest | TestFamily::Wilcoxon => {
                matches!(dataset, Dataset::Paired { .. } | Dataset::Single(_))
            }
            TestFamily::Anova | TestFamily::KruskalWallis => {
                matches!(dataset, Dataset::Groups(g) if g.len() >= 2)
            }
            TestFamily::Regression | TestFamily::Correlation => {
                matches!(dataset, Dataset::Paired { .. })
            }
            TestFamily::Bootstrap => true,
        }
    }
}

impl fmt::Display for TestFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestFamily {
    type Err = GuardianError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        TestFamily::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| GuardianError::UnknownTestFamily {
                name: s.to_string(),
            })
    }
}

/// Test family → ordered required assumptions
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementTable {
    entries: BTreeMap<TestFamily, Vec<AssumptionName>>,
}

impl Default for RequirementTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RequirementTable {
    /// Built-in requirement sets
    pub fn builtin() -> Self {
        use AssumptionName as A;

        let mut entries = BTreeMap::new();
        entries.insert(
            TestFamily::TTest,
            vec![A::SampleSize, A::Normality, A::VarianceHomogeneity, A::Independence, A::Outliers],
        );
        entries.insert(
            TestFamily::WelchTTest,
            vec![A::SampleSize, A::Normality, A::Independence, A::Outliers],
        );
        entries.insert(
            TestFamily::PairedTTest,
            vec![A::SampleSize, A::Normality, A::Independence, A::Outliers],
        );
        entries.insert(
            TestFamily::Anova,
            vec![
                A::SampleSize,
                A::Normality,
                A::VarianceHomogeneity,
                A::Independence,
                A::Outliers,
                A::Modality,
            ],
        );
        entries.insert(
            TestFamily::Regression,
            vec![
                A::SampleSize,
                A::Linearity,
                A::Homoscedasticity,
                A::Normality,
                A::Independence,
                A::Outliers,
            ],
        );
        entries.insert(
            TestFamily::Correlation,
            vec![A::SampleSize, A::Linearity, A::Normality, A::Outliers],
        );
        entries.insert(TestFamily::MannWhitney, vec![A::Independence]);
        entries.insert(TestFamily::Wilcoxon, vec![A::Independence]);
        entries.insert(TestFamily::KruskalWallis, vec![A::Independence]);
        entries.insert(TestFamily::Bootstrap, vec![]);

        Self { entries }
    }

    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Replace (or add) the requirement list for one family
    pub fn set(&mut self, family: TestFamily, assumptions: Vec<AssumptionName>) {
        let mut seen = BTreeSet::new();
        let deduped = assumptions.into_iter().filter(|a| seen.insert(*a)).collect();
        self.entries.insert(family, deduped);
    }

    pub fn remove(&mut self, family: TestFamily) {
        self.entries.remove(&family);
    }

    /// Declared requirements for `family`, exactly as registered
    pub fn get(&self, family: TestFamily) -> Result<&[AssumptionName]> {
        self.entries
            .get(&family)
            .map(Vec::as_slice)
            .ok_or_else(|| GuardianError::UnknownTestFamily {
                name: family.as_str().to_string(),
            })
    }

    /// Requirements to actually check for `family`. Under minimal checks,
    /// robust families always get the independence check.
    pub fn resolve(&self, family: TestFamily, minimal_checks: bool) -> Result<Vec<AssumptionName>> {
        let mut required = self.get(family)?.to_vec();
        if minimal_checks
            && family.is_robust()
            && !required.contains(&AssumptionName::Independence)
        {
            required.push(AssumptionName::Independence);
        }
        Ok(required)
    }

    pub fn families(&self) -> impl Iterator<Item = TestFamily> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TestFamily, &[AssumptionName])> + '_ {
        self.entries.iter().map(|(f, a)| (*f, a.as_slice()))
    }

    /// Every assumption some family may require (including the minimal
    /// independence check for robust families)
    pub fn assumptions_in_use(&self, minimal_checks: bool) -> BTreeSet<(TestFamily, AssumptionName)> {
        let mut out = BTreeSet::new();
        for family in self.families() {
            if let Ok(required) = self.resolve(family, minimal_checks) {
                for assumption in required {
                    out.insert((family, assumption));
                }
            }
        }
        out
    }
}
