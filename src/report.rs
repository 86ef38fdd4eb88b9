// Human-readable verdict report

use crate::assumption::Severity;
use crate::guardian::GuardianVerdict;

impl GuardianVerdict {
    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        if self.can_proceed {
            report.push_str(&format!("✅ PROCEED: {}\n\n", self.test_family));
        } else {
            report.push_str(&format!(
                "❌ BLOCKED: {} ({} critical violation(s))\n\n",
                self.test_family,
                self.critical_count()
            ));
        }
        report.push_str(&format!(
            "Significance level: {} ({}% confidence)\n",
            self.alpha,
            (1.0 - self.alpha) * 100.0
        ));
        report.push_str(&format!("Confidence score: {:.2}\n", self.confidence_score));
        report.push_str(&format!("Checks run: {}\n", self.checks.len()));

        if !self.violations.is_empty() {
            report.push_str(&format!("\n⚠️  Violations ({}):\n", self.violations.len()));
            for v in &self.violations {
                let marker = match v.severity {
                    Severity::Critical => "CRITICAL",
                    Severity::Warning => "WARNING ",
                    Severity::None => "        ",
                };
                report.push_str(&format!("  [{}] {}: {}\n", marker, v.assumption, v.message));
                report.push_str(&format!("             → {}\n", v.recommendation));
            }
        }

        if !self.indeterminate.is_empty() {
            report.push_str(&format!(
                "\n⏱️  Indeterminate ({}):\n",
                self.indeterminate.len()
            ));
            for check in &self.indeterminate {
                report.push_str(&format!("  {}: {}\n", check.assumption, check.reason));
            }
        }

        let passed: Vec<_> = self.checks.iter().filter(|c| c.satisfied).collect();
        if !passed.is_empty() {
            report.push_str("\n📊 Passing checks:\n");
            for c in passed {
                report.push_str(&format!("  {}: {}\n", c.assumption, c.message));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use crate::dataset::Dataset;
    use crate::family::TestFamily;
    use crate::guardian::Guardian;
    use crate::policy::GuardianPolicy;

    #[test]
    fn test_blocked_report_lists_violations() {
        let guardian = Guardian::from_policy(GuardianPolicy::default()).unwrap();
        let verdict = guardian
            .evaluate(TestFamily::TTest, Dataset::single(vec![1.0, 2.0, 3.0]).unwrap(), 0.05)
            .unwrap();
        let report = verdict.to_report_string();
        assert!(report.starts_with("❌ BLOCKED: t_test"));
        assert!(report.contains("[CRITICAL] sample_size"));
        assert!(report.contains("Confidence score: 0.50"));
    }

    #[test]
    fn test_proceed_report() {
        let guardian = Guardian::from_policy(GuardianPolicy::default()).unwrap();
        let verdict = guardian
            .evaluate(TestFamily::Bootstrap, Dataset::single(vec![1.0, 2.0]).unwrap(), 0.05)
            .unwrap();
        let report = verdict.to_report_string();
        assert!(report.starts_with("✅ PROCEED: bootstrap"));
        assert!(!report.contains("Violations"));
    }
}
