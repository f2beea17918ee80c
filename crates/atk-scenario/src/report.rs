//! Scenario run reports

use serde::Serialize;
use std::fmt::Write as _;

/// Verdict of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    /// Every declaration, run and expectation succeeded
    Passed,

    /// Something fatal happened
    Failed,
}

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Display name
    pub name: String,

    /// File path or `<inline>`
    pub origin: String,

    /// Namespace targets were discovered in
    pub namespace: String,

    /// Verdict
    pub status: ScenarioStatus,

    /// Fatal error, if failed
    pub error: Option<String>,

    /// Non-fatal problems (teardown failures)
    pub warnings: Vec<String>,

    /// Declared interceptions
    pub mocks: usize,

    /// Verified expectations
    pub expectations: usize,

    /// Intercepted calls of the last run
    pub calls: usize,

    /// Rejected calls of the last run
    pub rejections: usize,

    /// Wall-clock duration
    pub duration_ms: u64,
}

impl ScenarioReport {
    /// Check if the scenario passed
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }
}

/// Outcome of a scenario suite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Per-scenario outcomes, in run order
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    /// Check if every scenario passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }

    /// Number of passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.passed()).count()
    }

    /// Number of failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.scenarios.len() - self.passed_count()
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== ATK Scenario Report ===\n\n");
        let _ = writeln!(report, "Scenarios: {}", self.scenarios.len());
        let _ = writeln!(report, "Passed: {}", self.passed_count());
        let _ = writeln!(report, "Failed: {}", self.failed_count());

        if !self.scenarios.is_empty() {
            report.push_str("\n=== Scenarios ===\n");
            for (i, s) in self.scenarios.iter().enumerate() {
                let _ = writeln!(
                    report,
                    "{}. [{}] {} ({}, {} mock(s), {} expectation(s), {} call(s), {}ms)",
                    i + 1,
                    if s.passed() { "PASS" } else { "FAIL" },
                    s.name,
                    s.namespace,
                    s.mocks,
                    s.expectations,
                    s.calls,
                    s.duration_ms
                );
                if let Some(error) = &s.error {
                    let _ = writeln!(report, "   error: {error}");
                }
                for warning in &s.warnings {
                    let _ = writeln!(report, "   warning: {warning}");
                }
            }
        }

        let _ = write!(
            report,
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        );

        report
    }

    /// Render as pretty JSON
    ///
    /// # Errors
    /// Serialization failure.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(name: &str, status: ScenarioStatus) -> ScenarioReport {
        ScenarioReport {
            name: name.to_string(),
            origin: "<inline>".to_string(),
            namespace: "demo.prompt".to_string(),
            status,
            error: (status == ScenarioStatus::Failed)
                .then(|| "assertion mismatch: expected 2, got 1".to_string()),
            warnings: Vec::new(),
            mocks: 4,
            expectations: 3,
            calls: 4,
            rejections: 0,
            duration_ms: 1,
        }
    }

    #[test]
    fn empty_report_passes() {
        let report = RunReport::default();
        assert!(report.passed());
        assert!(report.generate_text().contains("=== Result: PASS ==="));
    }

    #[test]
    fn text_report_lists_failures() {
        let report = RunReport {
            scenarios: vec![
                scenario("chain", ScenarioStatus::Passed),
                scenario("count", ScenarioStatus::Failed),
            ],
        };
        assert!(!report.passed());
        assert_eq!(report.failed_count(), 1);

        let text = report.generate_text();
        assert!(text.contains("1. [PASS] chain"));
        assert!(text.contains("2. [FAIL] count"));
        assert!(text.contains("expected 2, got 1"));
        assert!(text.contains("=== Result: FAIL ==="));
    }

    #[test]
    fn json_report_uses_lowercase_status() {
        let report = RunReport {
            scenarios: vec![scenario("chain", ScenarioStatus::Passed)],
        };
        let json = report.to_json().unwrap();
        assert!(json.contains("\"status\": \"passed\""));
    }
}
