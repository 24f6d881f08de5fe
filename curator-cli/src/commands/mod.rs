pub mod diff;
pub mod generate;
pub mod log;
pub mod publish;
pub mod review;
pub mod rollback;
pub mod serve;
pub mod status;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};

use curator_core::config::CuratorConfig;
use curator_core::workspace::BatchRef;
use curator_core::{CuratorError, CuratorService};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the review API over HTTP
    Serve(serve::ServeArgs),
    /// List projects and the review state of their batches
    Status(status::StatusArgs),
    /// Show published versions, newest first
    Log(log::LogArgs),
    /// Restore the working tree to an earlier version
    Rollback(rollback::RollbackArgs),
    /// Return the working tree to the mainline version
    Reset(rollback::ResetArgs),
    /// Publish a batch's candidate graph and record a commit
    Publish(publish::PublishArgs),
    /// Run the candidate-generation job for a batch
    Generate(generate::GenerateArgs),
    /// Mark a batch as reviewed by one party
    Review(review::ReviewArgs),
    /// Compare a batch's candidate graph against its base
    Diff(diff::DiffArgs),
}

pub async fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Serve(args) => serve::run(args).await,
        Command::Status(args) => status::run(&args),
        Command::Log(args) => log::run(args).await,
        Command::Rollback(args) => rollback::run(args).await,
        Command::Reset(args) => rollback::reset(args).await,
        Command::Publish(args) => publish::run(args).await,
        Command::Generate(args) => generate::run(args).await,
        Command::Review(args) => review::run(&args),
        Command::Diff(args) => diff::run(&args),
    }
}

/// Repository selection shared by every command.
#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// Path to the curated git repository (default: current directory)
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
    /// Config file (default: curator.toml at the repository root, if present)
    #[arg(long, env = "CURATOR_CONFIG")]
    pub config: Option<PathBuf>,
}

impl RepoArgs {
    pub fn open(&self) -> anyhow::Result<CuratorService> {
        let root = std::fs::canonicalize(&self.repo)
            .with_context(|| format!("Cannot resolve path: {}", self.repo.display()))?;
        let config = match &self.config {
            Some(path) => CuratorConfig::load(path),
            None => CuratorConfig::load_or_default(&root),
        }
        .map_err(CuratorError::from)?;
        Ok(CuratorService::open(&root, config))
    }
}

/// `<project> <batch>` positional pair.
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Project id
    pub project: String,
    /// Batch id
    pub batch: String,
}

impl BatchArgs {
    pub fn batch_ref(&self) -> anyhow::Result<BatchRef> {
        Ok(BatchRef::new(self.project.as_str(), self.batch.as_str())?)
    }
}
