//! Publish pipeline: metadata, merged-graph artifact, one commit.
//!
//! The steps run in order and nothing is undone when a later step fails. A
//! failed or timed-out commit after the writes surfaces as
//! [`CuratorError::UncommittedPublish`] listing the files left dirty.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::VcsSection;
use crate::error::{CuratorError, Result, VcsError};
use crate::graph::write_dot;
use crate::timeout::bounded;
use crate::types::Graph;
use crate::vcs::VersionControlClient;
use crate::workspace::{BatchRef, Workspace};

/// What a successful publish recorded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReceipt {
    pub batch: BatchRef,
    pub commit_id: String,
    pub message: String,
    pub staged: Vec<PathBuf>,
}

/// Commit message for a publish: the marker, a space, then the comment with
/// embedded double quotes backslash-escaped.
pub fn commit_message(prefix: &str, comment: &str) -> String {
    format!("{prefix} {}", comment.replace('"', "\\\""))
}

#[derive(Debug, Clone)]
pub struct PublishPipeline {
    workspace: Workspace,
    vcs: Arc<dyn VersionControlClient>,
    commit_prefix: String,
    timeout: Duration,
}

impl PublishPipeline {
    pub fn new(workspace: Workspace, vcs: Arc<dyn VersionControlClient>, settings: &VcsSection) -> Self {
        Self {
            workspace,
            vcs,
            commit_prefix: settings.commit_prefix.clone(),
            timeout: settings.timeout(),
        }
    }

    pub async fn publish(&self, batch: &BatchRef, candidate: &Graph, comment: &str) -> Result<PublishReceipt> {
        // 1. metadata
        let mut metadata = self.workspace.read_batch_metadata(batch)?;
        if metadata.is_published {
            info!(batch = %batch, "Re-publishing batch");
        }
        metadata.mark_published(comment, Utc::now());
        let metadata_path = self.workspace.write_batch_metadata(batch, &metadata)?;

        // 2-3. serialize and overwrite the project's merged graph
        let dot = write_dot(candidate);
        let merged = self.workspace.merged_graph(batch.project_id())?;
        merged.write(&dot)?;

        // 4. stage and commit
        let mut staged = vec![self.workspace.relative(merged.path()).to_path_buf()];
        for path in self.workspace.batch_artifacts(batch)? {
            staged.push(self.workspace.relative(&path).to_path_buf());
        }
        let message = commit_message(&self.commit_prefix, comment);

        let outcome = bounded("commit", self.timeout, self.vcs.commit(&staged, &message)).await;
        let source = match outcome {
            Ok(commit_id) => {
                info!(
                    batch = %batch,
                    commit = %commit_id,
                    nodes = candidate.node_count(),
                    edges = candidate.edge_count(),
                    "Batch published"
                );
                return Ok(PublishReceipt {
                    batch: batch.clone(),
                    commit_id,
                    message,
                    staged,
                });
            }
            Err(CuratorError::Vcs(source)) => source,
            // The abandoned commit may or may not have landed; the files are
            // written either way.
            Err(CuratorError::Timeout { operation, after }) => VcsError::TimedOut { operation, after },
            Err(e) => return Err(e),
        };
        warn!(
            batch = %batch,
            metadata = %metadata_path.display(),
            error = %source,
            "Publish wrote artifacts but the commit failed; working tree is dirty"
        );
        Err(CuratorError::UncommittedPublish { paths: staged, source })
    }
}
