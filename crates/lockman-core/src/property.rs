//! Property verification types for the lock-coordination engine's invariants.
//!
//! Every property checked by an [`invariants`](crate::invariants) function
//! maps back to one of the universal invariants the engine must uphold
//! across every strategy, regardless of which admission rules that strategy
//! applies.

/// Result of checking a single invariant against a strategy's observed
/// state.
#[derive(Debug, Clone)]
pub struct PropertyResult {
    /// Human-readable invariant name (e.g., "ExclusivityOfCommit").
    pub name: &'static str,

    /// Whether the invariant holds.
    pub holds: bool,

    /// Description of the violation, if the invariant doesn't hold.
    pub violation: Option<String>,
}

impl PropertyResult {
    /// Create a passing result.
    #[must_use]
    pub fn pass(name: &'static str) -> Self {
        debug_assert!(!name.is_empty(), "invariant name must not be empty");
        Self {
            name,
            holds: true,
            violation: None,
        }
    }

    /// Create a failing result.
    #[must_use]
    pub fn fail(name: &'static str, violation: String) -> Self {
        debug_assert!(!name.is_empty(), "invariant name must not be empty");
        debug_assert!(!violation.is_empty(), "violation description must not be empty");
        Self {
            name,
            holds: false,
            violation: Some(violation),
        }
    }

    /// Format as a single-line status for logging.
    #[must_use]
    pub fn format_status(&self) -> String {
        if self.holds {
            format!("[PASS] {}", self.name)
        } else {
            format!(
                "[FAIL] {}: {}",
                self.name,
                self.violation.as_deref().unwrap_or("unknown")
            )
        }
    }
}

/// Implemented by anything that can check its own invariants on demand:
/// a strategy, an [`crate::state::IndexedLockState`], or a composite of both.
pub trait PropertyChecker {
    /// Check all invariants and return one result per invariant. Even
    /// passing invariants are included for completeness.
    fn check_all(&self) -> Vec<PropertyResult>;

    /// Verify all invariants, returning the first failure.
    fn verify_all(&self) -> Result<(), PropertyResult> {
        for result in self.check_all() {
            if !result.holds {
                return Err(result);
            }
        }
        Ok(())
    }

    /// Whether every invariant holds.
    fn all_hold(&self) -> bool {
        self.check_all().iter().all(|r| r.holds)
    }

    /// A summary of all invariant check results.
    fn summary(&self) -> PropertySummary {
        let results = self.check_all();
        let passed = results.iter().filter(|r| r.holds).count() as u64;
        let failed = results.iter().filter(|r| !r.holds).count() as u64;
        let total = results.len() as u64;

        debug_assert!(passed + failed == total);

        PropertySummary {
            passed,
            failed,
            total,
            results,
        }
    }
}

/// Summary of invariant check results.
#[derive(Debug, Clone)]
pub struct PropertySummary {
    pub passed: u64,
    pub failed: u64,
    pub total: u64,
    pub results: Vec<PropertyResult>,
}

impl PropertySummary {
    /// Format as a multi-line report string.
    #[must_use]
    pub fn format_report(&self) -> String {
        let mut report = format!(
            "Invariant Check Summary: {}/{} passed\n",
            self.passed, self.total
        );
        for result in &self.results {
            report.push_str(&result.format_status());
            report.push('\n');
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_result_has_no_violation() {
        let result = PropertyResult::pass("ExclusivityOfCommit");
        assert!(result.holds);
        assert!(result.violation.is_none());
    }

    #[test]
    fn fail_result_carries_a_violation() {
        let result = PropertyResult::fail("OrderPreservation", "entry reordered".to_string());
        assert!(!result.holds);
        assert!(result.violation.is_some());
    }

    #[test]
    fn format_status_tags_pass_and_fail() {
        assert!(PropertyResult::pass("X").format_status().contains("[PASS]"));
        assert!(PropertyResult::fail("X", "y".into())
            .format_status()
            .contains("[FAIL]"));
    }

    struct AlwaysPasses;
    impl PropertyChecker for AlwaysPasses {
        fn check_all(&self) -> Vec<PropertyResult> {
            vec![PropertyResult::pass("A"), PropertyResult::pass("B")]
        }
    }

    struct OneFails;
    impl PropertyChecker for OneFails {
        fn check_all(&self) -> Vec<PropertyResult> {
            vec![
                PropertyResult::pass("A"),
                PropertyResult::fail("B", "broke".into()),
            ]
        }
    }

    #[test]
    fn summary_counts_pass_and_fail() {
        let summary = AlwaysPasses.summary();
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 0);
        assert!(AlwaysPasses.all_hold());

        let summary = OneFails.summary();
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert!(!OneFails.all_hold());
        assert!(OneFails.verify_all().is_err());
    }
}
