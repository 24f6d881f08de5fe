//! Candidate-generation job collaborator.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::JobsSection;
use crate::error::JobError;
use crate::workspace::BatchRef;

/// What to generate: one batch, identified both logically and on disk.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub batch: BatchRef,
    pub batch_dir: PathBuf,
}

/// Output of a successful job run.
#[derive(Debug, Clone, Default)]
pub struct JobOutcome {
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// Opaque batch job producing `kg_candidate.dot` inside the batch directory.
#[async_trait]
pub trait BatchJobRunner: Send + Sync + std::fmt::Debug {
    async fn run(&self, spec: &JobSpec) -> Result<JobOutcome, JobError>;
}

/// Runs the configured program with the batch directory as last argument.
#[derive(Debug, Clone)]
pub struct ProcessJobRunner {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl ProcessJobRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
        }
    }

    /// Build from the `[jobs]` section; relative script paths resolve
    /// against `working_dir`.
    pub fn from_config(jobs: &JobsSection, working_dir: impl Into<PathBuf>) -> Self {
        Self::new(jobs.program.clone(), jobs.args.clone(), working_dir)
    }
}

#[async_trait]
impl BatchJobRunner for ProcessJobRunner {
    async fn run(&self, spec: &JobSpec) -> Result<JobOutcome, JobError> {
        let start = Instant::now();
        debug!(program = %self.program, batch = %spec.batch, "Starting candidate job");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&spec.batch_dir)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| JobError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            warn!(batch = %spec.batch, status = %output.status, "Candidate job failed");
            return Err(JobError::Failed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        if !stderr.trim().is_empty() {
            debug!(batch = %spec.batch, stderr = %stderr.trim(), "Candidate job stderr");
        }

        let duration = start.elapsed();
        info!(batch = %spec.batch, duration = ?duration, "Candidate job finished");
        Ok(JobOutcome {
            stdout,
            stderr,
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(dir: &std::path::Path) -> JobSpec {
        JobSpec {
            batch: BatchRef::new("acme", "b1").unwrap(),
            batch_dir: dir.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn batch_dir_is_the_last_argument() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = ProcessJobRunner::new(
            "sh",
            vec!["-c".into(), "echo digraph > \"$0/kg_candidate.dot\"".into()],
            tmp.path(),
        );
        let outcome = runner.run(&spec(tmp.path())).await.unwrap();
        assert!(outcome.stderr.is_empty());
        let text = std::fs::read_to_string(tmp.path().join("kg_candidate.dot")).unwrap();
        assert_eq!(text.trim(), "digraph");
    }

    #[tokio::test]
    async fn non_zero_exit_is_failure_with_stderr() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = ProcessJobRunner::new(
            "sh",
            vec!["-c".into(), "echo broken >&2; exit 3".into()],
            tmp.path(),
        );
        match runner.run(&spec(tmp.path())).await {
            Err(JobError::Failed { stderr, .. }) => assert_eq!(stderr, "broken"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = ProcessJobRunner::new("definitely-not-a-real-program-xyz", vec![], tmp.path());
        assert!(matches!(
            runner.run(&spec(tmp.path())).await,
            Err(JobError::Spawn { .. })
        ));
    }
}
