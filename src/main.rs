use clap::error::ErrorKind;
use colored::control::set_override as set_color_override;
use colored::Colorize;
use cypress_expect::cli::{render_clap_error, Invocation};
use cypress_expect::engine::run_and_evaluate;
use cypress_expect::report::{color_for, print_verdict};
use cypress_expect::runner::{CypressRunner, SavedRunner};
use std::process::exit;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn fail(err: anyhow::Error) -> ! {
    eprintln!("{} {err:#}", "error:".red().bold());
    exit(1);
}

#[tokio::main]
async fn main() {
    // RUST_LOG overrides; without it only warnings (e.g. unknown status names) show
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cypress_expect=warn"));
    // Diagnostics go to stderr, so its terminal decides colour
    let color = color_for(&std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .init();
    set_color_override(color);

    let invocation = match Invocation::parse_from(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(error) => {
            if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                set_color_override(color_for(&std::io::stdout()));
            }
            let (text, code) = render_clap_error(&error);
            if code == 0 {
                println!("{}", text.trim_end());
            } else {
                eprint!("{text}");
            }
            exit(code);
        }
    };

    // Expectation files are read before anything runs
    let policy = invocation.cli.policy().unwrap_or_else(|err| fail(err));
    debug!("selected policy {:?}", policy);

    let verdict = match &invocation.cli.results_json {
        Some(path) => {
            let runner = SavedRunner { path: path.clone() };
            run_and_evaluate(&runner, invocation.runner_args, &policy).await
        }
        None => {
            let runner = CypressRunner::from_env();
            run_and_evaluate(&runner, invocation.runner_args, &policy).await
        }
    };

    match verdict {
        Ok(verdict) => exit(print_verdict(&verdict)),
        Err(err) => fail(err),
    }
}
