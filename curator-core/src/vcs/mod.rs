//! Version-control collaborator.
//!
//! The core never builds command strings: it talks to history through
//! [`VersionControlClient`], whose arguments are plain data.

pub mod git;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::VcsError;
use crate::types::Commit;

pub use git::GitClient;

/// Narrow interface over the versioned filesystem.
#[async_trait]
pub trait VersionControlClient: Send + Sync + std::fmt::Debug {
    /// Stage `paths` and record one commit. Returns the new commit id.
    async fn commit(&self, paths: &[PathBuf], message: &str) -> Result<String, VcsError>;

    /// Check out `reference` for the whole working tree.
    async fn checkout(&self, reference: &str) -> Result<(), VcsError>;

    /// History reachable from the current checkout, newest first.
    /// A repository without commits yields an empty list.
    async fn log(&self) -> Result<Vec<Commit>, VcsError>;
}

/// Reject references that are empty or could be parsed as an option.
pub fn validate_ref(reference: &str) -> Result<(), VcsError> {
    let trimmed = reference.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('-')
        || trimmed.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(VcsError::InvalidRef(reference.to_string()));
    }
    Ok(())
}
