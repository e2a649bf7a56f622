use crate::types::RunResult;
use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Environment variable naming the Node.js executable used to drive Cypress.
pub const NODE_ENV: &str = "CYPRESS_EXPECT_NODE";

const RESULTS_ENV: &str = "CYPRESS_EXPECT_RESULTS";

// Runs Cypress through its module API and saves the run result as JSON.
const DRIVER: &str = r#"
const fs = require('fs')
const cypress = require('cypress')
cypress.cli
  .parseRunArguments(process.argv.slice(1))
  .then((options) => cypress.run(options))
  .then((results) => {
    fs.writeFileSync(process.env.CYPRESS_EXPECT_RESULTS, JSON.stringify(results))
  })
  .catch((e) => {
    console.error(e)
    process.exit(1)
  })
"#;

/// Something that executes the tests and hands back one run result.
#[allow(async_fn_in_trait)]
pub trait Runner {
    type Options;

    /// Turns the arguments we did not recognise into runner options.
    fn parse_run_arguments(&self, args: Vec<String>) -> Result<Self::Options>;

    async fn run(&self, options: Self::Options) -> Result<RunResult>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CypressRunOptions {
    pub argv: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CypressRunner {
    pub node: String,
}

impl CypressRunner {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var(NODE_ENV).unwrap_or_else(|_| "node".to_string()))
    }

    fn validate(&self) -> Result<PathBuf> {
        which::which(&self.node).map_err(|e| {
            anyhow!(
                "Node.js executable '{}' not found or not executable ({e}). Install Node.js or set {NODE_ENV}.",
                self.node
            )
        })
    }
}

impl Runner for CypressRunner {
    type Options = CypressRunOptions;

    fn parse_run_arguments(&self, mut args: Vec<String>) -> Result<CypressRunOptions> {
        if args.first().map(String::as_str) != Some("cypress") {
            args.insert(0, "cypress".to_string());
        }
        if args.get(1).map(String::as_str) != Some("run") {
            args.insert(1, "run".to_string());
        }
        debug!("parsing Cypress CLI {:?}", args);
        Ok(CypressRunOptions { argv: args })
    }

    async fn run(&self, options: CypressRunOptions) -> Result<RunResult> {
        let node = self.validate()?;
        let results = tempfile::Builder::new()
            .prefix("cypress-expect-")
            .suffix(".json")
            .tempfile()
            .context("create temporary results file")?;

        debug!("running {} with {:?}", node.display(), options.argv);
        let status = Command::new(&node)
            .arg("-e")
            .arg(DRIVER)
            .arg("--")
            .args(&options.argv)
            .env(RESULTS_ENV, results.path())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .with_context(|| format!("failed to start '{}'", node.display()))?;
        if !status.success() {
            bail!("Cypress driver exited with {status}");
        }

        let raw = tokio::fs::read_to_string(results.path())
            .await
            .with_context(|| format!("read run results {}", results.path().display()))?;
        if raw.trim().is_empty() {
            bail!("Cypress finished without reporting run results");
        }
        RunResult::from_json(&raw).context("decode Cypress run results")
    }
}

/// Replays a run result saved to disk instead of running anything.
#[derive(Debug, Clone)]
pub struct SavedRunner {
    pub path: PathBuf,
}

impl Runner for SavedRunner {
    type Options = ();

    fn parse_run_arguments(&self, args: Vec<String>) -> Result<()> {
        if !args.is_empty() {
            warn!("ignoring runner arguments {:?} when reading saved results", args);
        }
        Ok(())
    }

    async fn run(&self, _options: ()) -> Result<RunResult> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("read run results {}", self.path.display()))?;
        RunResult::from_json(&raw)
            .with_context(|| format!("decode run results {}", self.path.display()))
    }
}
