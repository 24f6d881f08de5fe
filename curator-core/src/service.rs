//! Service facade shared by the HTTP surface and the CLI.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::CuratorConfig;
use crate::error::{CuratorError, Result};
use crate::jobs::{BatchJobRunner, JobOutcome, JobSpec, ProcessJobRunner};
use crate::metadata::BatchMetadata;
use crate::publish::{PublishPipeline, PublishReceipt};
use crate::review::update_review_status;
use crate::slot::ReviewSlot;
use crate::timeout::bounded;
use crate::types::{Commit, Graph, GraphComparison};
use crate::vcs::{GitClient, VersionControlClient};
use crate::versions::{Restored, VersionService};
use crate::workspace::{BatchRef, BatchSummary, ProjectSummary, Workspace};

/// Everything a reviewer sees for one batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchView {
    pub metadata: BatchMetadata,
    pub kg_data: Option<Graph>,
    /// `None` when the candidate has not been generated yet.
    pub kg_candidate_data: Option<Graph>,
}

#[derive(Debug, Clone)]
pub struct CuratorService {
    config: CuratorConfig,
    workspace: Workspace,
    jobs: Arc<dyn BatchJobRunner>,
    publisher: PublishPipeline,
    versions: VersionService,
}

impl CuratorService {
    /// Service over a git working tree at `root`, with the configured job.
    pub fn open(root: &Path, config: CuratorConfig) -> Self {
        let vcs = Arc::new(GitClient::new(root));
        let jobs = Arc::new(ProcessJobRunner::from_config(&config.jobs, root));
        Self::with_collaborators(root, config, vcs, jobs)
    }

    pub fn with_collaborators(
        root: &Path,
        config: CuratorConfig,
        vcs: Arc<dyn VersionControlClient>,
        jobs: Arc<dyn BatchJobRunner>,
    ) -> Self {
        let workspace = Workspace::from_config(root, &config);
        let publisher = PublishPipeline::new(workspace.clone(), Arc::clone(&vcs), &config.vcs);
        let versions = VersionService::new(vcs, &config.vcs);
        Self {
            config,
            workspace,
            jobs,
            publisher,
            versions,
        }
    }

    pub fn config(&self) -> &CuratorConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    // ── Reads ──────────────────────────────────────────────────────

    pub fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        self.workspace.list_projects()
    }

    pub fn list_batches(&self, project_id: &str) -> Result<Vec<BatchSummary>> {
        self.workspace.list_batches(project_id)
    }

    /// The batch's candidate graph; `NotFound` when not generated yet.
    pub fn candidate_graph(&self, batch: &BatchRef) -> Result<Graph> {
        self.workspace
            .read_candidate(batch)?
            .ok_or_else(|| CuratorError::NotFound(format!("candidate graph for batch {batch}")))
    }

    pub fn batch_view(&self, batch: &BatchRef) -> Result<BatchView> {
        self.workspace.ensure_batch(batch)?;
        Ok(BatchView {
            metadata: self.workspace.read_batch_metadata(batch)?,
            kg_data: self.workspace.read_base(batch)?,
            kg_candidate_data: self.workspace.read_candidate(batch)?,
        })
    }

    /// The project's published graph; `NotFound` before the first publish.
    pub fn merged_graph(&self, project_id: &str) -> Result<Graph> {
        self.workspace
            .merged_graph(project_id)?
            .read()?
            .ok_or_else(|| CuratorError::NotFound(format!("merged graph for project {project_id}")))
    }

    pub fn compare(&self, batch: &BatchRef) -> Result<GraphComparison> {
        ReviewSlot::open(&self.workspace, batch)?
            .compare()
            .ok_or_else(|| CuratorError::NotFound(format!("candidate graph for batch {batch}")))
    }

    pub async fn list_versions(&self) -> Result<Vec<Commit>> {
        self.versions.list_versions().await
    }

    // ── Mutations ──────────────────────────────────────────────────

    /// Run the external job that writes `kg_candidate.dot` for `batch`.
    pub async fn generate_candidate(&self, batch: &BatchRef) -> Result<JobOutcome> {
        let batch_dir = self.workspace.ensure_batch(batch)?;
        info!(batch = %batch, "Generating candidate graph");
        let spec = JobSpec {
            batch: batch.clone(),
            batch_dir,
        };
        let outcome = bounded("candidate generation", self.config.jobs.timeout(), self.jobs.run(&spec)).await?;
        if self.workspace.read_candidate(batch)?.is_none() {
            warn!(batch = %batch, "Job succeeded but produced no candidate graph");
        }
        Ok(outcome)
    }

    pub async fn publish(&self, batch: &BatchRef, candidate: &Graph, comment: &str) -> Result<PublishReceipt> {
        self.publisher.publish(batch, candidate, comment).await
    }

    pub fn update_review_status(&self, batch: &BatchRef, party: usize) -> Result<BatchMetadata> {
        update_review_status(&self.workspace, batch, party)
    }

    pub async fn rollback(&self, commit_id: &str) -> Result<Restored> {
        self.versions.rollback(commit_id).await
    }

    pub async fn reset_to_latest(&self) -> Result<Restored> {
        self.versions.reset_to_latest().await
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{JobError, VcsError};
    use crate::metadata::ProjectMetadata;
    use crate::types::{Edge, Node};

    #[derive(Debug)]
    struct NoVcs;

    #[async_trait]
    impl VersionControlClient for NoVcs {
        async fn commit(&self, _: &[PathBuf], _: &str) -> std::result::Result<String, VcsError> {
            Ok("c1".into())
        }
        async fn checkout(&self, _: &str) -> std::result::Result<(), VcsError> {
            Ok(())
        }
        async fn log(&self) -> std::result::Result<Vec<Commit>, VcsError> {
            Ok(Vec::new())
        }
    }

    /// Writes a fixed candidate, like the real generator.
    #[derive(Debug)]
    struct FixedJob;

    #[async_trait]
    impl BatchJobRunner for FixedJob {
        async fn run(&self, spec: &JobSpec) -> std::result::Result<JobOutcome, JobError> {
            std::fs::write(
                spec.batch_dir.join("kg_candidate.dot"),
                "digraph { node1 [label=\"Node 1\"]; node1 -> node2; }",
            )
            .map_err(|source| JobError::Spawn {
                program: "fixed".into(),
                source,
            })?;
            Ok(JobOutcome::default())
        }
    }

    fn fixture() -> (tempfile::TempDir, CuratorService, BatchRef) {
        let tmp = tempfile::tempdir().unwrap();
        let service = CuratorService::with_collaborators(
            tmp.path(),
            CuratorConfig::default(),
            Arc::new(NoVcs),
            Arc::new(FixedJob),
        );
        let ws = service.workspace();
        ws.create_project("acme", &ProjectMetadata::default()).unwrap();
        let batch = BatchRef::new("acme", "b1").unwrap();
        let base = Graph::from_parts(
            [Node::new("node1", "Node 1"), Node::new("node3", "Node 3")],
            [Edge::new("e", "node1", "node3", "")],
        )
        .unwrap();
        ws.create_batch(&batch, &BatchMetadata::new("First", 2), Some(&base))
            .unwrap();
        (tmp, service, batch)
    }

    #[tokio::test]
    async fn generate_then_view_and_compare() {
        let (_tmp, service, batch) = fixture();
        assert!(matches!(
            service.candidate_graph(&batch),
            Err(CuratorError::NotFound(_))
        ));
        assert!(service.batch_view(&batch).unwrap().kg_candidate_data.is_none());

        service.generate_candidate(&batch).await.unwrap();

        let candidate = service.candidate_graph(&batch).unwrap();
        assert_eq!(candidate.node("node2").unwrap().label, "node2");
        let cmp = service.compare(&batch).unwrap();
        assert_eq!(cmp.added_nodes, vec!["node2"]);
        assert_eq!(cmp.removed_nodes, vec!["node3"]);
    }

    #[tokio::test]
    async fn generating_for_missing_batch_is_not_found() {
        let (_tmp, service, _batch) = fixture();
        let ghost = BatchRef::new("acme", "ghost").unwrap();
        assert!(matches!(
            service.generate_candidate(&ghost).await,
            Err(CuratorError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn merged_graph_appears_after_publish() {
        let (_tmp, service, batch) = fixture();
        assert!(matches!(
            service.merged_graph("acme"),
            Err(CuratorError::NotFound(_))
        ));
        let graph = Graph::from_parts([Node::new("n1", "n1")], []).unwrap();
        service.publish(&batch, &graph, "ok").await.unwrap();
        assert_eq!(service.merged_graph("acme").unwrap(), graph);
    }
}
