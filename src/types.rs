use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Final state of a single test as reported by the runner.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TestState {
    Passed,
    Failed,
    Pending,
    Skipped,
}

impl TestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestState::Passed => "passed",
            TestState::Failed => "failed",
            TestState::Pending => "pending",
            TestState::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Crashed,
    Unknown(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TestResult {
    // outer suite -> inner suite -> test name
    pub title: Vec<String>,
    pub state: TestState,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(from = "RawSpecRun")]
pub struct SpecRun {
    pub relative_path: Vec<String>,
    pub tests: Vec<TestResult>,
}

impl SpecRun {
    pub fn new(relative: &str, tests: Vec<TestResult>) -> Self {
        Self {
            relative_path: split_relative(relative),
            tests,
        }
    }
}

fn split_relative(relative: &str) -> Vec<String> {
    relative
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawSpecRun {
    spec: RawSpec,
    #[serde(default)]
    tests: Option<Vec<TestResult>>,
}

#[derive(Debug, Deserialize)]
struct RawSpec {
    relative: String,
}

impl From<RawSpecRun> for SpecRun {
    fn from(raw: RawSpecRun) -> Self {
        SpecRun::new(&raw.spec.relative, raw.tests.unwrap_or_default())
    }
}

/// Outcome of one complete run, in the shape of the Cypress module API result.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub failures: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub total_failed: u64,
    #[serde(default)]
    pub total_passed: u64,
    #[serde(default)]
    pub total_pending: u64,
    #[serde(default)]
    pub runs: Vec<SpecRun>,
}

impl RunResult {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Explicit status if the runner reported one, otherwise inferred from `failures`.
    pub fn status(&self) -> RunStatus {
        match self.status.as_deref() {
            Some("finished") => RunStatus::Completed,
            Some("failed") => RunStatus::Crashed,
            Some(other) => RunStatus::Unknown(other.to_string()),
            None if self.failures.as_ref().is_some_and(is_truthy) => RunStatus::Crashed,
            None => RunStatus::Completed,
        }
    }

    pub fn tests(&self) -> impl Iterator<Item = (&SpecRun, &TestResult)> {
        self.runs
            .iter()
            .flat_map(|run| run.tests.iter().map(move |test| (run, test)))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
