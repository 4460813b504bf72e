//! Exact-match result checking and the pass/fail tally.
//!
//! The [`Oracle`] is the only writer of the [`ResultTally`]. Every check and
//! every timeout leaves one [`Finding`] behind, so the tally always equals
//! the number of pass and fail findings.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Timeout;
use crate::time::SimTime;

/// A value observed on the device interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Observed {
    /// A data word.
    Word(u32),
    /// A single flag.
    Bit(bool),
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observed::Word(w) => write!(f, "{w:#x}"),
            Observed::Bit(b) => write!(f, "{b}"),
        }
    }
}

/// One recorded outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// A check matched its expectation.
    Pass {
        /// Check label.
        name: String,
        /// The value seen.
        actual: Observed,
        /// When the check ran.
        time: SimTime,
    },
    /// A check did not match its expectation.
    Mismatch {
        /// Check label.
        name: String,
        /// The value the check required.
        expected: Observed,
        /// The value seen.
        actual: Observed,
        /// When the check ran.
        time: SimTime,
    },
    /// A bounded wait ran out of attempts.
    Timeout {
        /// The exhausted wait.
        timeout: Timeout,
        /// When the wait gave up.
        time: SimTime,
    },
}

impl Finding {
    /// Whether this finding counts as a failure.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Finding::Pass { .. })
    }

    /// The sample at which the finding was recorded.
    pub fn time(&self) -> SimTime {
        match self {
            Finding::Pass { time, .. }
            | Finding::Mismatch { time, .. }
            | Finding::Timeout { time, .. } => *time,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Pass {
                name,
                actual: Observed::Bit(_),
                ..
            } => write!(f, "[PASS] {name}"),
            Finding::Pass { name, actual, .. } => write!(f, "[PASS] {name} got={actual}"),
            Finding::Mismatch {
                name,
                expected,
                actual,
                ..
            } => write!(f, "[FAIL] {name} expected={expected} got={actual}"),
            Finding::Timeout { timeout, .. } => write!(f, "[TIMEOUT] {timeout}"),
        }
    }
}

/// Pass/fail counters for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTally {
    /// Checks that matched.
    pub passed: u32,
    /// Mismatches and timeouts.
    pub failed: u32,
}

impl ResultTally {
    /// Process exit code: 0 iff nothing failed.
    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 {
            0
        } else {
            1
        }
    }

    /// Every recorded outcome.
    pub fn total(&self) -> u32 {
        self.passed + self.failed
    }
}

impl fmt::Display for ResultTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} passed, {} failed", self.passed, self.failed)
    }
}

/// Compares observations and accumulates findings.
#[derive(Debug, Default)]
pub struct Oracle {
    tally: ResultTally,
    findings: Vec<Finding>,
}

impl Oracle {
    /// An oracle with an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact comparison of two words. Returns whether they matched.
    pub fn check(&mut self, time: SimTime, name: &str, actual: u32, expected: u32) -> bool {
        self.compare(time, name, Observed::Word(actual), Observed::Word(expected))
    }

    /// Exact comparison of two flags. Returns whether they matched.
    pub fn check_bool(&mut self, time: SimTime, name: &str, actual: bool, expected: bool) -> bool {
        self.compare(time, name, Observed::Bit(actual), Observed::Bit(expected))
    }

    fn compare(&mut self, time: SimTime, name: &str, actual: Observed, expected: Observed) -> bool {
        let matched = actual == expected;
        let finding = if matched {
            Finding::Pass {
                name: name.to_string(),
                actual,
                time,
            }
        } else {
            Finding::Mismatch {
                name: name.to_string(),
                expected,
                actual,
                time,
            }
        };
        self.push(finding);
        matched
    }

    /// Records an exhausted wait as a failure.
    pub fn record_timeout(&mut self, time: SimTime, timeout: Timeout) {
        self.push(Finding::Timeout { timeout, time });
    }

    fn push(&mut self, finding: Finding) {
        if finding.is_failure() {
            self.tally.failed += 1;
            warn!(time = %finding.time(), "{finding}");
        } else {
            self.tally.passed += 1;
            info!(time = %finding.time(), "{finding}");
        }
        self.findings.push(finding);
    }

    /// Current counters.
    pub fn tally(&self) -> ResultTally {
        self.tally
    }

    /// Findings in the order they were recorded.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Consumes the oracle, returning the tally and every finding in order.
    pub fn into_parts(self) -> (ResultTally, Vec<Finding>) {
        (self.tally, self.findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WaitTarget;

    const T: SimTime = SimTime::ZERO;

    #[test]
    fn matching_word_passes() {
        let mut oracle = Oracle::new();
        assert!(oracle.check(T, "read back", 0xDEAD_BEEF, 0xDEAD_BEEF));
        assert_eq!(oracle.tally(), ResultTally { passed: 1, failed: 0 });
        assert_eq!(oracle.findings()[0].to_string(), "[PASS] read back got=0xdeadbeef");
    }

    #[test]
    fn mismatched_word_fails() {
        let mut oracle = Oracle::new();
        assert!(!oracle.check(T, "erased", 0x0, 0xFFFF_FFFF));
        assert_eq!(oracle.tally().failed, 1);
        assert_eq!(
            oracle.findings()[0].to_string(),
            "[FAIL] erased expected=0xffffffff got=0x0"
        );
    }

    #[test]
    fn bool_checks() {
        let mut oracle = Oracle::new();
        assert!(oracle.check_bool(T, "busy", true, true));
        assert!(!oracle.check_bool(T, "idle", true, false));
        assert_eq!(oracle.findings()[0].to_string(), "[PASS] busy");
        assert_eq!(oracle.findings()[1].to_string(), "[FAIL] idle expected=false got=true");
    }

    #[test]
    fn timeout_counts_as_failure() {
        let mut oracle = Oracle::new();
        oracle.record_timeout(
            T,
            Timeout {
                target: WaitTarget::Status,
                budget: 50000,
            },
        );
        assert_eq!(oracle.tally(), ResultTally { passed: 0, failed: 1 });
        assert_eq!(
            oracle.findings()[0].to_string(),
            "[TIMEOUT] status never asserted within 50000 cycles"
        );
    }

    #[test]
    fn tally_matches_findings() {
        let mut oracle = Oracle::new();
        oracle.check(T, "a", 1, 1);
        oracle.check(T, "b", 1, 2);
        oracle.check_bool(T, "c", false, false);
        let (tally, findings) = oracle.into_parts();
        let failures = findings.iter().filter(|f| f.is_failure()).count() as u32;
        assert_eq!(tally.failed, failures);
        assert_eq!(tally.total() as usize, findings.len());
    }

    #[test]
    fn exit_code_from_tally() {
        assert_eq!(ResultTally::default().exit_code(), 0);
        assert_eq!(ResultTally { passed: 13, failed: 0 }.exit_code(), 0);
        assert_eq!(ResultTally { passed: 13, failed: 1 }.exit_code(), 1);
    }

    #[test]
    fn finding_serializes_with_kind_tag() {
        let finding = Finding::Mismatch {
            name: "word".into(),
            expected: Observed::Word(1),
            actual: Observed::Word(2),
            time: SimTime::from_samples(40),
        };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["kind"], "mismatch");
        assert_eq!(json["expected"], 1);
        assert_eq!(json["time"], 40);
        let back: Finding = serde_json::from_value(json).unwrap();
        assert_eq!(back, finding);
    }
}
