//! Curator core library: knowledge-graph review, publish, and version history.
//!
//! A batch pairs a frozen base graph with an editable candidate
//! ([`slot::ReviewSlot`]). Edits flow through the reactive
//! [`graph::GraphStore`], driven by [`edit::EditController`]. Accepted
//! candidates go through [`publish::PublishPipeline`] into the project's
//! merged graph and a commit; [`versions::VersionService`] lists and restores
//! history. [`service::CuratorService`] ties these to a working tree.

pub mod config;
pub mod edit;
pub mod error;
pub mod graph;
pub mod jobs;
pub mod metadata;
pub mod publish;
pub mod review;
pub mod service;
pub mod slot;
pub mod timeout;
pub mod types;
pub mod vcs;
pub mod versions;
pub mod workspace;

pub use error::{CuratorError, ErrorKind, Result};
pub use service::CuratorService;
