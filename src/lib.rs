//! Statguard - statistical assumption guardian
//!
//! Before a statistical test runs, the guardian checks the assumptions that
//! test family depends on (normality, equal variances, independence, ...),
//! grades every violation, and decides whether the analysis may proceed. The
//! decision is a pure function of the test family, the dataset, alpha and an
//! explicit [`policy::GuardianPolicy`].
//!
//! ```
//! use statguard::dataset::Dataset;
//! use statguard::family::TestFamily;
//! use statguard::guardian::Guardian;
//! use statguard::policy::GuardianPolicy;
//!
//! let guardian = Guardian::from_policy(GuardianPolicy::default()).unwrap();
//! let data = Dataset::single(vec![1.0, 2.0, 3.0]).unwrap();
//! let verdict = guardian.evaluate(TestFamily::TTest, data, 0.05).unwrap();
//! // Three observations are below the sample-size floor
//! assert!(!verdict.can_proceed);
//! ```

pub mod assumption;
pub mod cli;
pub mod dataset;
pub mod density;
pub mod descriptive;
pub mod diagnostics;
pub mod distributions;
pub mod error;
pub mod family;
pub mod guardian;
pub mod policy;
pub mod report;
pub mod request;
pub mod validators;

pub use assumption::{AssumptionName, IndeterminateCheck, Severity, ValidationResult};
pub use dataset::{AnalysisContext, Dataset, NamedSample};
pub use error::{GuardianError, Result};
pub use family::{RequirementTable, TestFamily};
pub use guardian::{Guardian, GuardianOptions, GuardianVerdict};
pub use policy::GuardianPolicy;
