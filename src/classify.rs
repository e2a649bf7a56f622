use crate::policy::{Failure, Verdict};
use crate::types::{RunResult, RunStatus};
use tracing::debug;

/// Decides whether the run finished at all before any expectation is checked.
pub fn classify(run: &RunResult) -> Verdict {
    let status = run.status();
    debug!("run status {:?}", status);
    match status {
        RunStatus::Completed => Verdict::Pass,
        RunStatus::Crashed => Verdict::Fail(Failure::Crashed {
            message: run.message.clone(),
        }),
        RunStatus::Unknown(status) => Verdict::Fail(Failure::UnknownStatus { status }),
    }
}
