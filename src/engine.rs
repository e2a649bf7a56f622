use crate::classify::classify;
use crate::policy::{check_counts, check_lenient, check_strict, ExpectationPolicy, Verdict};
use crate::runner::Runner;
use crate::types::RunResult;
use anyhow::Result;
use tracing::debug;

/// Classifies the run, then applies the selected policy if it completed.
pub fn evaluate(run: &RunResult, policy: &ExpectationPolicy) -> Verdict {
    if let Verdict::Fail(failure) = classify(run) {
        return Verdict::Fail(failure);
    }
    match policy {
        ExpectationPolicy::Counts(counts) => check_counts(counts, run),
        ExpectationPolicy::Lenient(named) => check_lenient(named, run),
        ExpectationPolicy::Strict(named) => check_strict(named, run),
    }
}

/// Hands `runner_args` to the runner, awaits the run and checks it.
pub async fn run_and_evaluate<R: Runner>(
    runner: &R,
    runner_args: Vec<String>,
    policy: &ExpectationPolicy,
) -> Result<Verdict> {
    let options = runner.parse_run_arguments(runner_args)?;
    let run = runner.run(options).await?;
    debug!("test runs {:?}", run.runs);
    Ok(evaluate(&run, policy))
}
