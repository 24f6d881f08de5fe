//! On-disk layout of projects and batches inside the versioned working tree.
//!
//! ```text
//! <root>/<projects_dir>/<project>/project.json
//!                                 merged_graph.dot
//!                                 batches/<batch>/metadata.json
//!                                                 kg.dot
//!                                                 kg_candidate.dot
//! ```
//!
//! Every identifier is checked against `[A-Za-z0-9_-]+` before it touches a
//! path.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::config::CuratorConfig;
use crate::error::{CuratorError, Result};
use crate::graph::{parse_dot, write_dot};
use crate::metadata::{BatchMetadata, ProjectMetadata};
use crate::types::Graph;

pub const PROJECT_METADATA_FILE: &str = "project.json";
pub const MERGED_GRAPH_FILE: &str = "merged_graph.dot";
pub const BATCHES_DIR: &str = "batches";
pub const BATCH_METADATA_FILE: &str = "metadata.json";
pub const BASE_GRAPH_FILE: &str = "kg.dot";
pub const CANDIDATE_GRAPH_FILE: &str = "kg_candidate.dot";

/// Reject anything but ASCII letters, digits, `_` and `-`.
pub fn validate_id(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CuratorError::Validation(format!("missing {kind}")));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CuratorError::Validation(format!("invalid {kind}: {value:?}")));
    }
    Ok(())
}

/// A validated (project, batch) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRef {
    project_id: String,
    batch_id: String,
}

impl BatchRef {
    pub fn new(project_id: impl Into<String>, batch_id: impl Into<String>) -> Result<Self> {
        let project_id = project_id.into();
        let batch_id = batch_id.into();
        validate_id("projectId", &project_id)?;
        validate_id("batchId", &batch_id)?;
        Ok(Self {
            project_id,
            batch_id,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }
}

impl std::fmt::Display for BatchRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.project_id, self.batch_id)
    }
}

/// The single published graph of one project, shared by all of its batches.
#[derive(Debug, Clone)]
pub struct MergedGraphArtifact {
    project_id: String,
    path: PathBuf,
}

impl MergedGraphArtifact {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when the project has never been published.
    pub fn read(&self) -> Result<Option<Graph>> {
        read_graph(&self.path)
    }

    /// Overwrite the artifact with already-serialized DOT text.
    pub fn write(&self, dot: &str) -> Result<()> {
        std::fs::write(&self.path, dot).map_err(|e| CuratorError::io(&self.path, e))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub metadata: ProjectMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub id: String,
    pub metadata: BatchMetadata,
    pub has_candidate: bool,
}

/// Filesystem view of the curated repository.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    projects_root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, projects_dir: &str) -> Self {
        let root = root.into();
        let projects_root = root.join(projects_dir);
        Self {
            root,
            projects_root,
        }
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &CuratorConfig) -> Self {
        Self::new(root, &config.workspace.projects_dir)
    }

    /// The version-controlled working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn projects_root(&self) -> &Path {
        &self.projects_root
    }

    pub fn project_dir(&self, project_id: &str) -> Result<PathBuf> {
        validate_id("projectId", project_id)?;
        Ok(self.projects_root.join(project_id))
    }

    pub fn batch_dir(&self, batch: &BatchRef) -> PathBuf {
        self.projects_root
            .join(&batch.project_id)
            .join(BATCHES_DIR)
            .join(&batch.batch_id)
    }

    /// Path relative to the working tree root, for staging.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    // ── Listing ────────────────────────────────────────────────────

    /// All projects, sorted by id. A missing projects directory is empty.
    pub fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        let mut projects = Vec::new();
        for id in subdirectories(&self.projects_root)? {
            let metadata = self.read_project_metadata(&id)?;
            projects.push(ProjectSummary { id, metadata });
        }
        Ok(projects)
    }

    /// All batches of a project, sorted by id. Batches without a metadata
    /// file are listed with the batch id as title.
    pub fn list_batches(&self, project_id: &str) -> Result<Vec<BatchSummary>> {
        let project_dir = self.project_dir(project_id)?;
        if !project_dir.is_dir() {
            return Err(CuratorError::NotFound(format!("project {project_id}")));
        }
        let mut batches = Vec::new();
        for id in subdirectories(&project_dir.join(BATCHES_DIR))? {
            let batch = BatchRef::new(project_id, id.as_str())?;
            let dir = self.batch_dir(&batch);
            let metadata = match read_json::<BatchMetadata>(&dir.join(BATCH_METADATA_FILE))? {
                Some(meta) => meta,
                None => BatchMetadata {
                    title: id.clone(),
                    ..BatchMetadata::default()
                },
            };
            batches.push(BatchSummary {
                has_candidate: dir.join(CANDIDATE_GRAPH_FILE).is_file(),
                id,
                metadata,
            });
        }
        Ok(batches)
    }

    // ── Metadata ───────────────────────────────────────────────────

    /// Project metadata; defaults when `project.json` is absent.
    pub fn read_project_metadata(&self, project_id: &str) -> Result<ProjectMetadata> {
        let path = self.project_dir(project_id)?.join(PROJECT_METADATA_FILE);
        Ok(read_json(&path)?.unwrap_or_default())
    }

    pub fn write_project_metadata(&self, project_id: &str, meta: &ProjectMetadata) -> Result<PathBuf> {
        let path = self.project_dir(project_id)?.join(PROJECT_METADATA_FILE);
        write_json(&path, meta)?;
        Ok(path)
    }

    pub fn batch_metadata_path(&self, batch: &BatchRef) -> PathBuf {
        self.batch_dir(batch).join(BATCH_METADATA_FILE)
    }

    pub fn read_batch_metadata(&self, batch: &BatchRef) -> Result<BatchMetadata> {
        let path = self.batch_metadata_path(batch);
        read_json(&path)?.ok_or_else(|| CuratorError::NotFound(format!("metadata for batch {batch}")))
    }

    pub fn write_batch_metadata(&self, batch: &BatchRef, meta: &BatchMetadata) -> Result<PathBuf> {
        let path = self.batch_metadata_path(batch);
        write_json(&path, meta)?;
        debug!(batch = %batch, path = %path.display(), "Wrote batch metadata");
        Ok(path)
    }

    // ── Graph artifacts ────────────────────────────────────────────

    /// The base graph; `None` if the batch has no `kg.dot`.
    pub fn read_base(&self, batch: &BatchRef) -> Result<Option<Graph>> {
        read_graph(&self.batch_dir(batch).join(BASE_GRAPH_FILE))
    }

    /// The candidate graph; `None` means "not generated yet", distinct from
    /// an empty graph.
    pub fn read_candidate(&self, batch: &BatchRef) -> Result<Option<Graph>> {
        read_graph(&self.batch_dir(batch).join(CANDIDATE_GRAPH_FILE))
    }

    pub fn write_candidate(&self, batch: &BatchRef, graph: &Graph) -> Result<PathBuf> {
        let path = self.batch_dir(batch).join(CANDIDATE_GRAPH_FILE);
        std::fs::write(&path, write_dot(graph)).map_err(|e| CuratorError::io(&path, e))?;
        Ok(path)
    }

    pub fn merged_graph(&self, project_id: &str) -> Result<MergedGraphArtifact> {
        let path = self.project_dir(project_id)?.join(MERGED_GRAPH_FILE);
        Ok(MergedGraphArtifact {
            project_id: project_id.to_string(),
            path,
        })
    }

    /// `metadata.json` plus every `*.dot` file in the batch directory.
    pub fn batch_artifacts(&self, batch: &BatchRef) -> Result<Vec<PathBuf>> {
        let dir = self.batch_dir(batch);
        let mut paths = vec![dir.join(BATCH_METADATA_FILE)];
        // The root may contain glob metacharacters such as `[prod]`.
        let pattern = format!("{}/*.dot", glob::Pattern::escape(&dir.to_string_lossy()));
        let matches = glob::glob(&pattern)
            .map_err(|e| CuratorError::Validation(format!("bad artifact pattern {pattern}: {e}")))?;
        for entry in matches {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                CuratorError::io(path, e.into_error())
            })?;
            paths.push(path);
        }
        Ok(paths)
    }

    // ── Creation ───────────────────────────────────────────────────

    /// Create a project directory with its metadata.
    pub fn create_project(&self, project_id: &str, meta: &ProjectMetadata) -> Result<PathBuf> {
        let dir = self.project_dir(project_id)?;
        std::fs::create_dir_all(dir.join(BATCHES_DIR)).map_err(|e| CuratorError::io(&dir, e))?;
        self.write_project_metadata(project_id, meta)?;
        Ok(dir)
    }

    /// Create a batch directory with metadata and an optional base graph.
    pub fn create_batch(
        &self,
        batch: &BatchRef,
        meta: &BatchMetadata,
        base: Option<&Graph>,
    ) -> Result<PathBuf> {
        let dir = self.batch_dir(batch);
        std::fs::create_dir_all(&dir).map_err(|e| CuratorError::io(&dir, e))?;
        self.write_batch_metadata(batch, meta)?;
        if let Some(base) = base {
            let path = dir.join(BASE_GRAPH_FILE);
            std::fs::write(&path, write_dot(base)).map_err(|e| CuratorError::io(&path, e))?;
        }
        Ok(dir)
    }

    /// Fail with `NotFound` unless the batch directory exists.
    pub fn ensure_batch(&self, batch: &BatchRef) -> Result<PathBuf> {
        let dir = self.batch_dir(batch);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(CuratorError::NotFound(format!("batch {batch}")))
        }
    }
}

fn subdirectories(dir: &Path) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CuratorError::io(dir, e)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CuratorError::io(dir, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        // Skip anything that could not be addressed through the API.
        if validate_id("id", &name).is_ok() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn read_graph(path: &Path) -> Result<Option<Graph>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(parse_dot(&text)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CuratorError::io(path, e)),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CuratorError::io(path, e)),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| CuratorError::Metadata {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|source| CuratorError::Metadata {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|e| CuratorError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, Node};

    fn fixture() -> (tempfile::TempDir, Workspace, BatchRef) {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path(), "projects");
        ws.create_project("acme", &ProjectMetadata::default()).unwrap();
        let batch = BatchRef::new("acme", "b1").unwrap();
        let base = Graph::from_parts(
            [Node::new("A", "Alice"), Node::new("B", "Bob")],
            [Edge::new("e1", "A", "B", "reports to")],
        )
        .unwrap();
        ws.create_batch(&batch, &BatchMetadata::new("First", 2), Some(&base))
            .unwrap();
        (tmp, ws, batch)
    }

    #[test]
    fn ids_are_validated() {
        assert!(BatchRef::new("acme", "b-1_x").is_ok());
        for bad in ["", "..", "a/b", "a b", "a;rm", "é"] {
            assert!(
                matches!(BatchRef::new("acme", bad), Err(CuratorError::Validation(_))),
                "{bad:?} accepted"
            );
        }
        let ws = Workspace::new("/tmp/x", "projects");
        assert!(ws.project_dir("../etc").is_err());
    }

    #[test]
    fn candidate_absent_is_distinct_from_empty() {
        let (_tmp, ws, batch) = fixture();
        assert_eq!(ws.read_candidate(&batch).unwrap(), None);
        ws.write_candidate(&batch, &Graph::new()).unwrap();
        assert_eq!(ws.read_candidate(&batch).unwrap(), Some(Graph::new()));
        assert_eq!(ws.read_base(&batch).unwrap().unwrap().node_count(), 2);
    }

    #[test]
    fn listing_projects_and_batches() {
        let (_tmp, ws, _batch) = fixture();
        std::fs::create_dir_all(ws.projects_root().join("acme/batches/bare")).unwrap();

        let projects = ws.list_projects().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "acme");

        let batches = ws.list_batches("acme").unwrap();
        let ids: Vec<_> = batches.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["b1", "bare"]);
        assert_eq!(batches[1].metadata.title, "bare");
        assert!(!batches[0].has_candidate);

        assert!(matches!(ws.list_batches("ghost"), Err(CuratorError::NotFound(_))));
    }

    #[test]
    fn missing_metadata_is_not_found() {
        let (_tmp, ws, _batch) = fixture();
        let other = BatchRef::new("acme", "nope").unwrap();
        assert!(matches!(
            ws.read_batch_metadata(&other),
            Err(CuratorError::NotFound(_))
        ));
        assert!(ws.ensure_batch(&other).is_err());
    }

    #[test]
    fn metadata_is_pretty_printed() {
        let (_tmp, ws, batch) = fixture();
        let text = std::fs::read_to_string(ws.batch_metadata_path(&batch)).unwrap();
        assert!(text.contains("\n  \"title\": \"First\""));
        assert_eq!(ws.read_batch_metadata(&batch).unwrap().is_reviewed.len(), 2);
    }

    #[test]
    fn artifacts_include_metadata_and_dot_files() {
        let (_tmp, ws, batch) = fixture();
        ws.write_candidate(&batch, &Graph::new()).unwrap();
        let names: Vec<_> = ws
            .batch_artifacts(&batch)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["metadata.json", "kg.dot", "kg_candidate.dot"]);
    }

    #[test]
    fn artifacts_are_found_under_a_root_with_glob_metacharacters() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("kg[prod]*?");
        let ws = Workspace::new(&root, "projects");
        ws.create_project("acme", &ProjectMetadata::default()).unwrap();
        let batch = BatchRef::new("acme", "b1").unwrap();
        ws.create_batch(&batch, &BatchMetadata::new("First", 1), Some(&Graph::new()))
            .unwrap();
        ws.write_candidate(&batch, &Graph::new()).unwrap();

        let paths = ws.batch_artifacts(&batch).unwrap();
        assert_eq!(paths.len(), 3, "{paths:?}");
        assert!(paths.iter().all(|p| p.starts_with(&root)));
        assert!(paths[2].ends_with("kg_candidate.dot"));
    }

    #[test]
    fn merged_graph_is_per_project() {
        let (_tmp, ws, _batch) = fixture();
        let merged = ws.merged_graph("acme").unwrap();
        assert_eq!(merged.read().unwrap(), None);
        merged.write("digraph { n1; }").unwrap();
        assert!(merged.read().unwrap().unwrap().contains_node("n1"));
        assert_eq!(ws.relative(merged.path()), Path::new("projects/acme/merged_graph.dot"));
    }
}
