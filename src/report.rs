use crate::policy::{CountCheck, Expected, Failure, TestMismatch, Verdict};
use colored::Colorize;
use std::ffi::OsString;
use std::io::IsTerminal;

pub const SUPPORT_URL: &str = env!("CARGO_PKG_REPOSITORY");

const PREFIX: &str = "cypress-expect:";

fn title(path: &[String]) -> String {
    path.join(" / ")
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "test" } else { "tests" }
}

fn render_mismatch(m: &TestMismatch) -> String {
    match &m.expected {
        Expected::Implicit => format!(
            "{} expected implicitly the test \"{}\" to pass, got {}\n",
            PREFIX.bold(),
            title(&m.title),
            m.actual
        ),
        Expected::Declared(state) => format!(
            "{} expected the test \"{}\" to be {}, got {}\n",
            PREFIX.bold(),
            title(&m.title),
            state,
            m.actual
        ),
    }
}

fn render_missing(paths: &[Vec<String>]) -> String {
    let mut out = format!("{} expected to find the following tests\n", PREFIX.bold());
    for path in paths {
        out.push_str(&format!("* {}\n", title(path)));
    }
    out
}

/// Human-readable diagnostic for a failed verdict.
pub fn render_failure(failure: &Failure) -> String {
    let error = "ERROR:".red().bold();
    match failure {
        Failure::Crashed { message } => {
            let message = message
                .as_deref()
                .unwrap_or("the test run crashed without a message");
            format!("{message}\n")
        }
        Failure::UnknownStatus { status } => {
            let p = PREFIX.red().bold();
            format!(
                "{p} unknown run status \"{status}\"\n\
                 {p} not sure how to proceed\n\
                 {p} seek help at {SUPPORT_URL}\n\
                 {p} exiting with an error\n"
            )
        }
        Failure::UnexpectedFailures { failed } => format!("{failed} test(s) failed\n"),
        Failure::Count {
            check,
            expected,
            actual,
        } => match check {
            CountCheck::Failing => {
                format!("{error} expected {expected} failing tests, got {actual}\n")
            }
            CountCheck::Passing => {
                format!("{error} expected {expected} passing tests, got {actual}\n")
            }
            CountCheck::MinPassing => {
                format!("{error} expected at least {expected} passing tests, got {actual}\n")
            }
            CountCheck::Pending => {
                format!("{error} expected {expected} pending tests, got {actual}\n")
            }
        },
        Failure::Lenient {
            source,
            mismatches,
            missing,
        } => {
            let mut out = String::new();
            for m in mismatches {
                out.push_str(&render_mismatch(m));
            }
            if !mismatches.is_empty() {
                out.push_str(&format!(
                    "{} {} {} did not match the expected state from {}\n",
                    PREFIX.bold(),
                    mismatches.len(),
                    plural(mismatches.len()),
                    source.display()
                ));
            }
            if !missing.is_empty() {
                out.push_str(&render_missing(missing));
            }
            out
        }
        Failure::Undeclared { source, path } => format!(
            "{} missing expected result for test \"{}\" from file {}\n",
            PREFIX.bold(),
            title(path),
            source.display()
        ),
        Failure::StateMismatch(m) => render_mismatch(m),
        Failure::Missing { paths } => render_missing(paths),
    }
}

/// Process exit status for a verdict. Unexpected failures exit with the
/// number of failed tests (capped at 255); every other failure exits 1.
pub fn exit_code(verdict: &Verdict) -> i32 {
    match verdict {
        Verdict::Pass => 0,
        Verdict::Fail(Failure::UnexpectedFailures { failed }) => (*failed).clamp(1, 255) as i32,
        Verdict::Fail(_) => 1,
    }
}

/// Whether to colour text written to a stream. `CLICOLOR_FORCE` wins over
/// `NO_COLOR`; otherwise colour only when the stream is a terminal.
pub fn color_for(stream: &impl IsTerminal) -> bool {
    wants_color(
        std::env::var_os("CLICOLOR_FORCE"),
        std::env::var_os("NO_COLOR"),
        stream.is_terminal(),
    )
}

fn wants_color(force: Option<OsString>, no_color: Option<OsString>, terminal: bool) -> bool {
    if force.is_some_and(|v| !v.is_empty() && v != "0") {
        return true;
    }
    if no_color.is_some_and(|v| !v.is_empty()) {
        return false;
    }
    terminal
}

/// Prints the diagnostic (if any) to stderr and returns the exit status.
pub fn print_verdict(verdict: &Verdict) -> i32 {
    if let Verdict::Fail(failure) = verdict {
        eprint!("{}", render_failure(failure));
    }
    exit_code(verdict)
}
