//! Version history listing and whole-tree restore.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::config::VcsSection;
use crate::error::{CuratorError, Result};
use crate::timeout::bounded;
use crate::types::Commit;
use crate::vcs::{VersionControlClient, validate_ref};

/// A completed checkout. Every in-memory graph store is stale afterwards and
/// must be reloaded from disk; unsaved edits are gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Restored {
    pub reference: String,
    pub reload_required: bool,
}

impl Restored {
    fn new(reference: &str) -> Self {
        Self {
            reference: reference.to_string(),
            reload_required: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VersionService {
    vcs: Arc<dyn VersionControlClient>,
    mainline_ref: String,
    timeout: Duration,
}

impl VersionService {
    pub fn new(vcs: Arc<dyn VersionControlClient>, settings: &VcsSection) -> Self {
        Self {
            vcs,
            mainline_ref: settings.mainline_ref.clone(),
            timeout: settings.timeout(),
        }
    }

    /// History, newest first. No commits yet is an empty list.
    pub async fn list_versions(&self) -> Result<Vec<Commit>> {
        bounded("log", self.timeout, self.vcs.log()).await
    }

    /// Check out `commit_id` for the entire working tree.
    pub async fn rollback(&self, commit_id: &str) -> Result<Restored> {
        let commit_id = commit_id.trim();
        if commit_id.is_empty() {
            return Err(CuratorError::Validation("missing commitId".into()));
        }
        validate_ref(commit_id)?;
        bounded("checkout", self.timeout, self.vcs.checkout(commit_id)).await?;
        info!(commit = %commit_id, "Rolled back working tree");
        Ok(Restored::new(commit_id))
    }

    /// Check out the configured mainline reference. This is whatever that
    /// reference points at, which need not be the newest commit in the log.
    pub async fn reset_to_latest(&self) -> Result<Restored> {
        bounded("checkout", self.timeout, self.vcs.checkout(&self.mainline_ref)).await?;
        info!(reference = %self.mainline_ref, "Reset working tree to mainline");
        Ok(Restored::new(&self.mainline_ref))
    }

    pub fn mainline_ref(&self) -> &str {
        &self.mainline_ref
    }
}
