use crate::policy::{CountExpectations, ExpectationPolicy, NamedExpectations};
use crate::report::SUPPORT_URL;
use crate::tree::ExpectationTree;
use anyhow::Result;
use clap::{error::ErrorKind, value_parser, ArgGroup, CommandFactory, Parser};
use colored::Colorize;
use regex::Regex;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

// Flags we own that take a value; everything else goes to the runner.
const VALUE_FLAGS: &[&str] = &[
    "--passing",
    "--min-passing",
    "--failing",
    "--pending",
    "--expect",
    "--expect-exactly",
    "--results-json",
];

const SWITCHES: &[&str] = &["-h", "--help", "-V", "--version"];

#[derive(Parser, Debug, Clone)]
#[command(
    name = "cypress-expect",
    version,
    about = "Runs Cypress and fails unless the test outcomes match what you expect",
    after_help = "Any other argument is passed to `cypress run` unchanged.",
    group(
        ArgGroup::new("expectation")
            .required(true)
            .multiple(true)
            .args(["passing", "min_passing", "failing", "pending", "expect", "expect_exactly"])
    )
)]
pub struct Cli {
    /// Exact number of tests that must pass
    #[arg(
        long,
        value_name = "N",
        value_parser = value_parser!(u64).range(1..),
        conflicts_with = "min_passing"
    )]
    pub passing: Option<u64>,

    /// Minimum number of tests that must pass
    #[arg(long, value_name = "N", value_parser = value_parser!(u64).range(1..))]
    pub min_passing: Option<u64>,

    /// Exact number of tests that must fail
    #[arg(long, value_name = "N", value_parser = value_parser!(u64).range(1..))]
    pub failing: Option<u64>,

    /// Exact number of pending tests
    #[arg(long, value_name = "N", value_parser = value_parser!(u64).range(1..))]
    pub pending: Option<u64>,

    /// JSON file with expected test statuses keyed by suite and test title
    #[arg(
        long,
        value_name = "FILE",
        value_parser = readable_file,
        conflicts_with_all = ["passing", "min_passing", "failing", "pending", "expect_exactly"]
    )]
    pub expect: Option<PathBuf>,

    /// JSON file listing every test by spec file path, suite and title
    #[arg(
        long,
        value_name = "FILE",
        value_parser = readable_file,
        conflicts_with_all = ["passing", "min_passing", "failing", "pending"]
    )]
    pub expect_exactly: Option<PathBuf>,

    /// Check a saved Cypress run result instead of running Cypress
    #[arg(long, value_name = "FILE", value_parser = readable_file)]
    pub results_json: Option<PathBuf>,
}

fn readable_file(raw: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(raw);
    if !path.is_file() {
        return Err(format!("cannot find file \"{raw}\""));
    }
    File::open(&path).map_err(|e| format!("cannot read file \"{raw}\": {e}"))?;
    Ok(path)
}

impl Cli {
    pub fn counts(&self) -> CountExpectations {
        CountExpectations {
            passing: self.passing,
            min_passing: self.min_passing,
            failing: self.failing,
            pending: self.pending,
        }
    }

    /// Selects the policy, reading the expectation file when one was given.
    pub fn policy(&self) -> Result<ExpectationPolicy> {
        if let Some(path) = &self.expect {
            return Ok(ExpectationPolicy::Lenient(load_named(path)?));
        }
        if let Some(path) = &self.expect_exactly {
            return Ok(ExpectationPolicy::Strict(load_named(path)?));
        }
        Ok(ExpectationPolicy::Counts(self.counts()))
    }
}

fn load_named(path: &Path) -> Result<NamedExpectations> {
    let tree = ExpectationTree::from_path(path)?;
    debug!("expected test statuses {:?}", tree);
    Ok(NamedExpectations {
        source: path.to_path_buf(),
        tree,
    })
}

/// Our validated flags plus the arguments meant for the runner.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub cli: Cli,
    pub runner_args: Vec<String>,
}

impl Invocation {
    /// Parses the arguments that follow the program name.
    pub fn parse_from<I, S>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let split = split_args(args);
        debug!("own args {:?}, runner args {:?}", split.ours, split.runner);
        let cli = Cli::try_parse_from(std::iter::once("cypress-expect".to_string()).chain(split.ours))?;
        Ok(Self {
            cli,
            runner_args: split.runner,
        })
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SplitArgs {
    pub ours: Vec<String>,
    pub runner: Vec<String>,
}

/// Pulls our flags (`--flag value` or `--flag=value`) out of the argument
/// list, keeping the rest in their original order.
pub fn split_args<I, S>(args: I) -> SplitArgs
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut split = SplitArgs::default();
    let mut iter = args.into_iter().map(Into::into);
    while let Some(arg) = iter.next() {
        let (name, inline_value) = match arg.split_once('=') {
            Some((name, _)) => (name, true),
            None => (arg.as_str(), false),
        };
        if VALUE_FLAGS.contains(&name) {
            split.ours.push(arg);
            if !inline_value {
                if let Some(value) = iter.next() {
                    split.ours.push(value);
                }
            }
        } else if SWITCHES.contains(&arg.as_str()) {
            split.ours.push(arg);
        } else {
            split.runner.push(arg);
        }
    }
    split
}

/// Make option flags bold in help and usage text
fn format_flags_bold(text: &str) -> String {
    match Regex::new(r"(?m)^(\s*)((?:-\w, )?--[\w-]+)") {
        Ok(flag_regex) => flag_regex
            .replace_all(text, |caps: &regex::Captures| {
                format!("{}{}", &caps[1], caps[2].bold())
            })
            .into_owned(),
        Err(_) => text.to_string(),
    }
}

pub fn render_help() -> String {
    let mut cmd = Cli::command();
    format_flags_bold(&cmd.render_long_help().to_string())
}

/// Text for a clap error plus the exit status to use.
/// Help and version exit 0; every validation error exits 1.
pub fn render_clap_error(error: &clap::Error) -> (String, i32) {
    match error.kind() {
        ErrorKind::DisplayHelp => (render_help(), 0),
        ErrorKind::DisplayVersion => (error.to_string(), 0),
        _ => {
            let msg = error
                .to_string()
                .replace("error:", &"error:".red().bold().to_string());
            let msg = format_flags_bold(&msg);
            (format!("{}\nsee {SUPPORT_URL}#options\n", msg.trim_end()), 1)
        }
    }
}
