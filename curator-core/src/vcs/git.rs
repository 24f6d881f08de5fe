use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use gix::bstr::ByteSlice;
use tokio::process::Command;
use tracing::{debug, info};

use super::{VersionControlClient, validate_ref};
use crate::error::VcsError;
use crate::types::Commit;

/// [`VersionControlClient`] over a git working tree.
///
/// History is read in-process with `gix`. Staging, committing, and checkout
/// go through the `git` binary with argv arguments.
#[derive(Debug, Clone)]
pub struct GitClient {
    root: PathBuf,
}

impl GitClient {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn git<I, S>(&self, args: I) -> Result<std::process::Output, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(output)
    }
}

fn failure_text(output: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        // `git commit` reports "nothing to commit" on stdout.
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr
    }
}

#[async_trait]
impl VersionControlClient for GitClient {
    async fn commit(&self, paths: &[PathBuf], message: &str) -> Result<String, VcsError> {
        let mut add = vec![OsStr::new("add"), OsStr::new("--")];
        add.extend(paths.iter().map(|p| p.as_os_str()));
        let output = self.git(add).await?;
        if !output.status.success() {
            return Err(VcsError::Commit(failure_text(&output)));
        }

        // Restricted to `paths`; anything else staged stays in the index.
        let mut commit = vec![
            OsStr::new("commit"),
            OsStr::new("-m"),
            OsStr::new(message),
            OsStr::new("--"),
        ];
        commit.extend(paths.iter().map(|p| p.as_os_str()));
        let output = self.git(commit).await?;
        if !output.status.success() {
            return Err(VcsError::Commit(failure_text(&output)));
        }

        let output = self.git(["rev-parse", "HEAD"]).await?;
        if !output.status.success() {
            return Err(VcsError::Commit(failure_text(&output)));
        }
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!(commit = %id, files = paths.len(), "Committed");
        Ok(id)
    }

    async fn checkout(&self, reference: &str) -> Result<(), VcsError> {
        validate_ref(reference)?;
        let output = self.git(["checkout", reference, "--"]).await?;
        if !output.status.success() {
            return Err(VcsError::Checkout {
                reference: reference.to_string(),
                message: failure_text(&output),
            });
        }
        info!(reference, "Checked out");
        Ok(())
    }

    async fn log(&self) -> Result<Vec<Commit>, VcsError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || read_history(&root))
            .await
            .map_err(|e| VcsError::Repository(format!("history task failed: {e}")))?
    }
}

fn read_history(root: &Path) -> Result<Vec<Commit>, VcsError> {
    let repo = gix::open(root).map_err(|e| VcsError::Repository(e.to_string()))?;
    let head = repo.head().map_err(|e| VcsError::Repository(e.to_string()))?;
    if head.is_unborn() {
        debug!("HEAD is unborn, history is empty");
        return Ok(Vec::new());
    }
    let head = repo
        .head_commit()
        .map_err(|e| VcsError::Repository(e.to_string()))?;

    let walk = head
        .ancestors()
        .all()
        .map_err(|e| VcsError::Repository(e.to_string()))?;

    let mut commits = Vec::new();
    for info in walk {
        let info = info.map_err(|e| VcsError::Repository(e.to_string()))?;
        let commit = repo
            .find_commit(info.id)
            .map_err(|e| VcsError::Repository(e.to_string()))?;

        let author = commit
            .author()
            .map_err(|e| VcsError::Repository(format!("bad author encoding: {e}")))?;
        let timestamp = author
            .time()
            .map_or_else(|_| Utc::now(), |t| gix_time_to_chrono(&t));

        commits.push(Commit {
            id: info.id.to_string(),
            author: author.name.to_string(),
            timestamp,
            message: commit.message_raw_sloppy().to_string().trim_end().to_string(),
            changed_paths: changed_paths(&repo, &commit)?,
        });
    }
    Ok(commits)
}

/// Paths touched by `commit` relative to its first parent.
fn changed_paths(repo: &gix::Repository, commit: &gix::Commit<'_>) -> Result<Vec<String>, VcsError> {
    let tree = commit
        .tree()
        .map_err(|e| VcsError::Repository(e.to_string()))?;

    let parent_tree = commit
        .parent_ids()
        .next()
        .and_then(|parent_id| parent_id.object().ok()?.try_into_commit().ok()?.tree().ok());

    let base = match parent_tree {
        Some(ref parent) => parent,
        None => &repo.empty_tree(),
    };

    let mut platform = base
        .changes()
        .map_err(|e| VcsError::Repository(e.to_string()))?;
    platform.options(|opts| {
        opts.track_path();
    });

    let mut paths = Vec::new();
    platform
        .for_each_to_obtain_tree(&tree, |change| {
            use gix::object::tree::diff::Change;
            let location = match change {
                Change::Addition { location, .. }
                | Change::Deletion { location, .. }
                | Change::Modification { location, .. }
                | Change::Rewrite { location, .. } => location,
            };
            paths.push(location.to_path_lossy().to_string_lossy().into_owned());
            Ok::<_, std::convert::Infallible>(std::ops::ControlFlow::Continue(()))
        })
        .map_err(|e| VcsError::Repository(format!("diff error: {e}")))?;

    Ok(paths)
}

fn gix_time_to_chrono(time: &gix::date::Time) -> DateTime<Utc> {
    Utc.timestamp_opt(time.seconds, 0)
        .single()
        .unwrap_or_else(Utc::now)
}
