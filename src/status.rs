use crate::types::TestState;
use std::fmt;
use tracing::warn;

/// An expected state read from an expectation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedState {
    Known(TestState),
    /// Token we could not map; kept as written so it never matches.
    Unrecognized(String),
}

impl ExpectedState {
    pub fn matches(&self, observed: TestState) -> bool {
        matches!(self, ExpectedState::Known(state) if *state == observed)
    }
}

impl fmt::Display for ExpectedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedState::Known(state) => write!(f, "{state}"),
            ExpectedState::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

/// Maps the human spellings of a test status to a canonical state.
///
/// Matching is exact and case-sensitive: "fail" is failed, "Fail" is not.
pub fn normalize(raw: &str) -> ExpectedState {
    let state = match raw {
        "passing" | "pass" | "passes" | "passed" => TestState::Passed,
        "failing" | "fail" | "fails" | "failed" => TestState::Failed,
        "pend" | "pending" => TestState::Pending,
        "skip" | "skipping" | "skipped" => TestState::Skipped,
        _ => {
            warn!("unknown test state name \"{raw}\"");
            return ExpectedState::Unrecognized(raw.to_string());
        }
    };
    ExpectedState::Known(state)
}
