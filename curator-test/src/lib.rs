// Integration test utilities and fixture management for Curator.

use std::path::Path;
use std::process::Command;

use curator_core::CuratorService;
use curator_core::config::CuratorConfig;
use curator_core::graph::write_dot;
use curator_core::metadata::{BatchMetadata, ProjectMetadata};
use curator_core::types::{Edge, Graph, Node, Position};
use curator_core::workspace::{BatchRef, Workspace};

/// A curated repository in a temporary git working tree.
#[derive(Debug)]
pub struct TestWorkspace {
    pub dir: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Empty repository on branch `main` with no commits.
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let root = dir.path();
        git(root, &["init"]);
        git(root, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(root, &["config", "user.email", "test@curator.dev"]);
        git(root, &["config", "user.name", "Test"]);
        git(root, &["config", "commit.gpgsign", "false"]);
        Self { dir }
    }

    /// Project `acme` with two batches, committed once:
    ///
    /// - `b1`: two-party review, base graph only (candidate not generated)
    /// - `b2`: base graph and a generated candidate
    pub fn acme() -> Self {
        let fixture = Self::empty();
        let ws = fixture.workspace();

        ws.create_project(
            "acme",
            &ProjectMetadata {
                provider: "acme-corp".into(),
                product_name: "Acme Catalog".into(),
                original_filename: "catalog.csv".into(),
                ..ProjectMetadata::default()
            },
        )
        .unwrap();

        let mut b1 = BatchMetadata::new("First batch", 2);
        b1.request_id = "req-1".into();
        ws.create_batch(&Self::b1(), &b1, Some(&base_graph())).unwrap();

        ws.create_batch(&Self::b2(), &BatchMetadata::new("Second batch", 1), Some(&base_graph()))
            .unwrap();
        ws.write_candidate(&Self::b2(), &candidate_graph()).unwrap();

        fixture.git(&["add", "."]);
        fixture.git(&["commit", "-m", "Initial fixture"]);
        fixture
    }

    pub fn b1() -> BatchRef {
        BatchRef::new("acme", "b1").expect("valid fixture ids")
    }

    pub fn b2() -> BatchRef {
        BatchRef::new("acme", "b2").expect("valid fixture ids")
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::from_config(self.path(), &self.config())
    }

    /// Default configuration, with a job that writes a fixed candidate into
    /// the batch directory it is handed.
    pub fn config(&self) -> CuratorConfig {
        let mut config = CuratorConfig::default();
        config.jobs.program = "sh".into();
        config.jobs.args = vec![
            "-c".into(),
            "printf 'digraph { x -> y; }' > \"$0/kg_candidate.dot\"".into(),
        ];
        config.vcs.timeout_secs = 20;
        config
    }

    /// Service over this repository with the real git client.
    pub fn service(&self) -> CuratorService {
        CuratorService::open(self.path(), self.config())
    }

    /// Run git in the repository and return stdout without the trailing newline.
    pub fn git(&self, args: &[&str]) -> String {
        git(self.path(), args)
    }

    pub fn head(&self) -> String {
        self.git(&["rev-parse", "HEAD"])
    }

    pub fn commit_count(&self) -> usize {
        self.git(&["rev-list", "--count", "HEAD"])
            .parse()
            .expect("numeric commit count")
    }

    /// Paths with uncommitted changes, as reported by `git status`.
    pub fn dirty_paths(&self) -> Vec<String> {
        self.git(&["status", "--porcelain"])
            .lines()
            .map(|line| line[3..].to_string())
            .collect()
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path().join(rel)).unwrap()
    }
}

/// Base graph of every fixture batch.
pub fn base_graph() -> Graph {
    Graph::from_parts(
        [
            Node::new("node1", "Node 1").at(Position::new(0.0, 0.0)),
            Node::new("node3", "Node 3").at(Position::new(120.0, 40.0)),
        ],
        [Edge::new("edge1", "node1", "node3", "relates to")],
    )
    .expect("valid fixture graph")
}

/// Candidate stored for batch `b2`.
pub fn candidate_graph() -> Graph {
    Graph::from_parts(
        [
            Node::new("node1", "Node 1").at(Position::new(0.0, 0.0)),
            Node::new("node2", "Node 2").at(Position::new(60.0, 80.0)),
        ],
        [Edge::new("edge2", "node1", "node2", "contains")],
    )
    .expect("valid fixture graph")
}

/// DOT text of [`candidate_graph`], for tests that feed files directly.
pub fn candidate_dot() -> String {
    write_dot(&candidate_graph())
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_DATE", "2025-01-15T10:00:00+00:00")
        .env("GIT_COMMITTER_DATE", "2025-01-15T10:00:00+00:00")
        .output()
        .unwrap_or_else(|e| panic!("git {}: {e}", args.join(" ")));
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("git {} failed: {stderr}", args.join(" "));
    }
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}
