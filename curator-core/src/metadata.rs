//! Batch and project metadata documents (`metadata.json`, `project.json`).
//!
//! Both types keep unknown keys in `extra` so a rewrite never drops fields
//! written by other tools.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CuratorError;

/// Per-party review flags. Length is fixed when the batch is created and a
/// flag only ever moves from `false` to `true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewFlags(Vec<bool>);

impl ReviewFlags {
    /// `parties` reviewers, none of whom has reviewed yet.
    pub fn pending(parties: usize) -> Self {
        Self(vec![false; parties])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn is_complete(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|r| *r)
    }

    /// Mark `party` (1-based) as having reviewed. Marking twice is a no-op.
    pub fn mark(&mut self, party: usize) -> Result<(), CuratorError> {
        let len = self.0.len();
        match party.checked_sub(1).and_then(|i| self.0.get_mut(i)) {
            Some(flag) => {
                *flag = true;
                Ok(())
            }
            None => Err(CuratorError::Validation(format!(
                "invalid party number {party}: batch has {len} review part{}",
                if len == 1 { "y" } else { "ies" }
            ))),
        }
    }
}

impl From<Vec<bool>> for ReviewFlags {
    fn from(flags: Vec<bool>) -> Self {
        Self(flags)
    }
}

/// Contents of a batch's `metadata.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_reviewed: ReviewFlags,
    #[serde(default)]
    pub comment_message: String,
    #[serde(default)]
    pub reviewer: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_path: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl BatchMetadata {
    /// Fresh metadata for a new batch with `parties` reviewers.
    pub fn new(title: impl Into<String>, parties: usize) -> Self {
        Self {
            title: title.into(),
            is_reviewed: ReviewFlags::pending(parties),
            ..Self::default()
        }
    }

    /// Record a publish. Safe to repeat: each call overwrites the comment
    /// and the date.
    pub fn mark_published(&mut self, comment: &str, at: DateTime<Utc>) {
        self.is_published = true;
        comment.clone_into(&mut self.comment_message);
        self.published_date = Some(at);
    }
}

/// Contents of a project's `project.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub original_filename: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
