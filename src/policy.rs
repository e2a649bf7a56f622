use crate::status::{normalize, ExpectedState};
use crate::tree::ExpectationTree;
use crate::types::{RunResult, TestState};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Count-based checks; any combination may be requested at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountExpectations {
    pub passing: Option<u64>,
    pub min_passing: Option<u64>,
    pub failing: Option<u64>,
    pub pending: Option<u64>,
}

/// An expectation file together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedExpectations {
    pub source: PathBuf,
    pub tree: ExpectationTree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectationPolicy {
    Counts(CountExpectations),
    /// Keyed by test title; unlisted tests must pass.
    Lenient(NamedExpectations),
    /// Keyed by spec file path then title; every test must be listed.
    Strict(NamedExpectations),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountCheck {
    Failing,
    Passing,
    MinPassing,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    /// The test was not listed, so it had to pass.
    Implicit,
    Declared(ExpectedState),
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Implicit => f.write_str("passed"),
            Expected::Declared(state) => write!(f, "{state}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMismatch {
    pub title: Vec<String>,
    pub expected: Expected,
    pub actual: TestState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The runner itself failed (e.g. the browser crashed).
    Crashed { message: Option<String> },
    UnknownStatus { status: String },
    /// Failed tests while no `--failing` count was requested.
    UnexpectedFailures { failed: u64 },
    Count {
        check: CountCheck,
        expected: u64,
        actual: u64,
    },
    Lenient {
        source: PathBuf,
        mismatches: Vec<TestMismatch>,
        missing: Vec<Vec<String>>,
    },
    /// A test ran that the strict expectation file does not list.
    Undeclared { source: PathBuf, path: Vec<String> },
    StateMismatch(TestMismatch),
    /// Listed tests that never ran.
    Missing { paths: Vec<Vec<String>> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(Failure),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// Checks run in a fixed order: failing, passing, min-passing, pending.
/// The first one that does not hold decides the verdict.
pub fn check_counts(expect: &CountExpectations, run: &RunResult) -> Verdict {
    debug!(
        "test totals failed={} passed={} pending={}",
        run.total_failed, run.total_passed, run.total_pending
    );

    match expect.failing {
        Some(n) if run.total_failed != n => {
            return count_failure(CountCheck::Failing, n, run.total_failed);
        }
        Some(_) => {}
        None if run.total_failed > 0 => {
            return Verdict::Fail(Failure::UnexpectedFailures {
                failed: run.total_failed,
            });
        }
        None => {}
    }

    if let Some(n) = expect.passing {
        if run.total_passed != n {
            return count_failure(CountCheck::Passing, n, run.total_passed);
        }
    }

    if let Some(n) = expect.min_passing {
        if run.total_passed < n {
            return count_failure(CountCheck::MinPassing, n, run.total_passed);
        }
    }

    if let Some(n) = expect.pending {
        if run.total_pending != n {
            return count_failure(CountCheck::Pending, n, run.total_pending);
        }
    }

    Verdict::Pass
}

fn count_failure(check: CountCheck, expected: u64, actual: u64) -> Verdict {
    Verdict::Fail(Failure::Count {
        check,
        expected,
        actual,
    })
}

/// Matches every test by its title. Tests missing from the file must pass.
/// All mismatches and all never-run expectations are collected before
/// deciding.
pub fn check_lenient(named: &NamedExpectations, run: &RunResult) -> Verdict {
    let mut residual = named.tree.clone();
    let mut mismatches = Vec::new();

    for (_, test) in run.tests() {
        let title = &test.title;
        let Some(raw) = residual.remove(title) else {
            warn_on_group(named, title);
            debug!("missing expected state for test {:?}", title);
            if test.state != TestState::Passed {
                mismatches.push(TestMismatch {
                    title: title.clone(),
                    expected: Expected::Implicit,
                    actual: test.state,
                });
            }
            continue;
        };

        let expected = normalize(&raw);
        debug!("test \"{}\" should have status \"{}\"", title.join(" / "), expected);
        if !expected.matches(test.state) {
            mismatches.push(TestMismatch {
                title: title.clone(),
                expected: Expected::Declared(expected),
                actual: test.state,
            });
        }
    }

    residual.prune_empty();
    let missing = residual.leaf_paths();
    if mismatches.is_empty() && missing.is_empty() {
        return Verdict::Pass;
    }
    Verdict::Fail(Failure::Lenient {
        source: named.source.clone(),
        mismatches,
        missing,
    })
}

fn warn_on_group(named: &NamedExpectations, path: &[String]) {
    if named.tree.ends_on_group(path) {
        warn!(
            "expected a status for test \"{}\" in {}, found a group",
            path.join(" / "),
            named.source.display()
        );
    }
}

/// Matches every test by spec path plus title and stops at the first
/// problem: an unlisted test, a wrong state, or a listed test that never ran.
pub fn check_strict(named: &NamedExpectations, run: &RunResult) -> Verdict {
    let mut residual = named.tree.clone();

    for (spec, test) in run.tests() {
        let full_path: Vec<String> = spec
            .relative_path
            .iter()
            .chain(test.title.iter())
            .cloned()
            .collect();

        let Some(raw) = residual.remove(&full_path) else {
            warn_on_group(named, &full_path);
            return Verdict::Fail(Failure::Undeclared {
                source: named.source.clone(),
                path: full_path,
            });
        };

        let expected = normalize(&raw);
        debug!("test \"{}\" should have status \"{}\"", full_path.join(" / "), expected);
        if !expected.matches(test.state) {
            return Verdict::Fail(Failure::StateMismatch(TestMismatch {
                title: test.title.clone(),
                expected: Expected::Declared(expected),
                actual: test.state,
            }));
        }
    }

    residual.prune_empty();
    if residual.is_empty() {
        Verdict::Pass
    } else {
        Verdict::Fail(Failure::Missing {
            paths: residual.leaf_paths(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SpecRun, TestResult};

    fn test(title: &[&str], state: TestState) -> TestResult {
        TestResult {
            title: title.iter().map(|s| s.to_string()).collect(),
            state,
        }
    }

    fn totals(failed: u64, passed: u64, pending: u64) -> RunResult {
        RunResult {
            status: Some("finished".into()),
            total_failed: failed,
            total_passed: passed,
            total_pending: pending,
            ..Default::default()
        }
    }

    fn named(json: &str) -> NamedExpectations {
        NamedExpectations {
            source: PathBuf::from("expected.json"),
            tree: ExpectationTree::from_json_str(json).unwrap(),
        }
    }

    fn run_of(specs: Vec<SpecRun>) -> RunResult {
        RunResult {
            status: Some("finished".into()),
            runs: specs,
            ..Default::default()
        }
    }

    #[test]
    fn exact_passing() {
        let expect = CountExpectations {
            passing: Some(3),
            ..Default::default()
        };
        assert!(check_counts(&expect, &totals(0, 3, 2)).is_pass());
        assert_eq!(
            check_counts(&expect, &totals(0, 2, 0)),
            Verdict::Fail(Failure::Count {
                check: CountCheck::Passing,
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn unexpected_failures_come_first() {
        let expect = CountExpectations {
            passing: Some(3),
            ..Default::default()
        };
        assert_eq!(
            check_counts(&expect, &totals(2, 1, 0)),
            Verdict::Fail(Failure::UnexpectedFailures { failed: 2 })
        );
    }

    #[test]
    fn requested_failures_are_accepted() {
        let expect = CountExpectations {
            failing: Some(2),
            passing: Some(1),
            ..Default::default()
        };
        assert!(check_counts(&expect, &totals(2, 1, 0)).is_pass());
        assert_eq!(
            check_counts(&expect, &totals(1, 5, 0)),
            Verdict::Fail(Failure::Count {
                check: CountCheck::Failing,
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn min_passing_is_inclusive() {
        let expect = CountExpectations {
            min_passing: Some(5),
            ..Default::default()
        };
        assert!(check_counts(&expect, &totals(0, 5, 0)).is_pass());
        assert!(check_counts(&expect, &totals(0, 9, 0)).is_pass());
        assert_eq!(
            check_counts(&expect, &totals(0, 4, 0)),
            Verdict::Fail(Failure::Count {
                check: CountCheck::MinPassing,
                expected: 5,
                actual: 4
            })
        );
    }

    #[test]
    fn first_failing_check_wins() {
        let expect = CountExpectations {
            passing: Some(3),
            pending: Some(1),
            ..Default::default()
        };
        assert!(matches!(
            check_counts(&expect, &totals(0, 2, 0)),
            Verdict::Fail(Failure::Count {
                check: CountCheck::Passing,
                ..
            })
        ));
        assert!(matches!(
            check_counts(&expect, &totals(0, 3, 0)),
            Verdict::Fail(Failure::Count {
                check: CountCheck::Pending,
                ..
            })
        ));
    }

    #[test]
    fn lenient_all_matched() {
        let expect = named(r#"{"Suite A": {"test 1": "pass", "test 2": "fail"}}"#);
        let run = run_of(vec![SpecRun::new(
            "spec.js",
            vec![
                test(&["Suite A", "test 1"], TestState::Passed),
                test(&["Suite A", "test 2"], TestState::Failed),
            ],
        )]);
        assert_eq!(check_lenient(&expect, &run), Verdict::Pass);
    }

    #[test]
    fn lenient_unlisted_test_must_pass() {
        let expect = named(r#"{"Suite A": {"test 1": "pass"}}"#);
        let run = run_of(vec![SpecRun::new(
            "spec.js",
            vec![
                test(&["Suite A", "test 1"], TestState::Passed),
                test(&["Suite A", "extra ok"], TestState::Passed),
                test(&["Suite A", "extra bad"], TestState::Failed),
            ],
        )]);
        let Verdict::Fail(Failure::Lenient {
            mismatches,
            missing,
            ..
        }) = check_lenient(&expect, &run)
        else {
            panic!("expected a lenient failure");
        };
        assert_eq!(
            mismatches,
            vec![TestMismatch {
                title: vec!["Suite A".into(), "extra bad".into()],
                expected: Expected::Implicit,
                actual: TestState::Failed,
            }]
        );
        assert!(missing.is_empty());
    }

    #[test]
    fn lenient_reports_every_mismatch_and_missing_test() {
        let expect = named(
            r#"{"Suite A": {"test 1": "fail", "test 2": "pending", "test 3": "pass"}}"#,
        );
        let run = run_of(vec![SpecRun::new(
            "spec.js",
            vec![
                test(&["Suite A", "test 1"], TestState::Passed),
                test(&["Suite A", "test 2"], TestState::Passed),
            ],
        )]);
        let Verdict::Fail(Failure::Lenient {
            mismatches,
            missing,
            ..
        }) = check_lenient(&expect, &run)
        else {
            panic!("expected a lenient failure");
        };
        // keeps going after the first mismatch
        assert_eq!(mismatches.len(), 2);
        assert_eq!(missing, vec![vec!["Suite A".to_string(), "test 3".to_string()]]);
    }

    #[test]
    fn lenient_does_not_touch_the_callers_tree() {
        let expect = named(r#"{"Suite A": {"test 1": "pass"}}"#);
        let run = run_of(vec![SpecRun::new(
            "spec.js",
            vec![test(&["Suite A", "test 1"], TestState::Passed)],
        )]);
        assert!(check_lenient(&expect, &run).is_pass());
        assert_eq!(expect.tree.lookup(&["Suite A", "test 1"]), Some("pass"));
    }

    #[test]
    fn lenient_group_in_place_of_status_counts_as_unlisted() {
        let run = run_of(vec![SpecRun::new(
            "spec.js",
            vec![
                test(&["Suite A", "test 1"], TestState::Passed),
                test(&["Suite A", "test 2"], TestState::Failed),
            ],
        )]);
        // an empty group is pruned away, so only the implicit rule applies
        let expect = named(r#"{"Suite A": {"test 1": {}, "test 2": {}}}"#);
        assert!(expect.tree.ends_on_group(&["Suite A", "test 1"]));
        let Verdict::Fail(Failure::Lenient {
            mismatches,
            missing,
            ..
        }) = check_lenient(&expect, &run)
        else {
            panic!("expected lenient failure");
        };
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].expected, Expected::Implicit);
        assert!(missing.is_empty());

        // a non-empty group still has leaves that never ran
        let expect = named(r#"{"Suite A": {"test 1": {"deeper": "pass"}}}"#);
        let Verdict::Fail(Failure::Lenient { missing, .. }) = check_lenient(&expect, &run) else {
            panic!("expected lenient failure");
        };
        assert_eq!(
            missing,
            vec![vec!["Suite A".to_string(), "test 1".to_string(), "deeper".to_string()]]
        );
    }

    #[test]
    fn strict_keys_by_spec_path() {
        let expect = named(
            r#"{"cypress": {"e2e": {"spec.js": {"Suite A": {"test 1": "passed", "test 2": "skipped"}}}}}"#,
        );
        let run = run_of(vec![SpecRun::new(
            "cypress/e2e/spec.js",
            vec![
                test(&["Suite A", "test 1"], TestState::Passed),
                test(&["Suite A", "test 2"], TestState::Skipped),
            ],
        )]);
        assert_eq!(check_strict(&expect, &run), Verdict::Pass);
    }

    #[test]
    fn strict_stops_at_first_undeclared_test() {
        let expect = named(r#"{"spec.js": {"Suite A": {"test 2": "fail"}}}"#);
        let run = run_of(vec![SpecRun::new(
            "spec.js",
            vec![
                test(&["Suite A", "test 1"], TestState::Passed),
                // would be a mismatch too, but is never looked at
                test(&["Suite A", "test 2"], TestState::Passed),
            ],
        )]);
        assert_eq!(
            check_strict(&expect, &run),
            Verdict::Fail(Failure::Undeclared {
                source: PathBuf::from("expected.json"),
                path: vec!["spec.js".into(), "Suite A".into(), "test 1".into()],
            })
        );
    }

    #[test]
    fn strict_stops_at_first_mismatch() {
        let expect = named(r#"{"spec.js": {"Suite A": {"test 1": "fail", "test 2": "fail"}}}"#);
        let run = run_of(vec![SpecRun::new(
            "spec.js",
            vec![
                test(&["Suite A", "test 1"], TestState::Passed),
                test(&["Suite A", "test 2"], TestState::Passed),
            ],
        )]);
        assert_eq!(
            check_strict(&expect, &run),
            Verdict::Fail(Failure::StateMismatch(TestMismatch {
                title: vec!["Suite A".into(), "test 1".into()],
                expected: Expected::Declared(ExpectedState::Known(TestState::Failed)),
                actual: TestState::Passed,
            }))
        );
    }

    #[test]
    fn strict_reports_tests_that_never_ran() {
        let expect = named(r#"{"spec.js": {"Suite A": {"test 1": "pass"}}, "other.js": {"t": "pass"}}"#);
        let run = run_of(vec![SpecRun::new(
            "spec.js",
            vec![test(&["Suite A", "test 1"], TestState::Passed)],
        )]);
        assert_eq!(
            check_strict(&expect, &run),
            Verdict::Fail(Failure::Missing {
                paths: vec![vec!["other.js".into(), "t".into()]],
            })
        );
    }

    #[test]
    fn unrecognized_status_degrades_to_mismatch() {
        let expect = named(r#"{"Suite A": {"test 1": "Pass"}}"#);
        let run = run_of(vec![SpecRun::new(
            "spec.js",
            vec![test(&["Suite A", "test 1"], TestState::Passed)],
        )]);
        let Verdict::Fail(Failure::Lenient { mismatches, .. }) = check_lenient(&expect, &run) else {
            panic!("expected a lenient failure");
        };
        assert_eq!(
            mismatches[0].expected,
            Expected::Declared(ExpectedState::Unrecognized("Pass".into()))
        );
    }
}
