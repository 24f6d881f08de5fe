use std::path::PathBuf;
use std::time::Duration;

/// Top-level Curator error type.
///
/// All fallible service operations in `curator-core` return
/// [`Result<T, CuratorError>`](Result). Domain failures are wrapped in their
/// own enums so callers can match on the source; [`CuratorError::kind`]
/// collapses them into the coarse taxonomy the HTTP surface reports.
#[derive(thiserror::Error, Debug)]
pub enum CuratorError {
    /// A request carried a bad or missing identifier or field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A batch, project, or artifact does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filesystem read or write failed.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A metadata document could not be parsed or encoded.
    #[error("Metadata error in {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Error from the in-memory graph model.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Error reading the graph interchange format.
    #[error("Interchange error: {0}")]
    Dot(#[from] DotError),

    /// Commit, checkout, or history read failed.
    #[error("Version control error: {0}")]
    Vcs(#[from] VcsError),

    /// Artifacts were written but the commit recording them failed.
    ///
    /// Nothing is rolled back: the listed paths now differ from the
    /// committed history and the operator must re-publish or restore.
    #[error("Publish left uncommitted changes in {} file(s): {source}", paths.len())]
    UncommittedPublish {
        paths: Vec<PathBuf>,
        #[source]
        source: VcsError,
    },

    /// The external candidate-generation job failed.
    #[error("Batch job error: {0}")]
    Job(#[from] JobError),

    /// A collaborator call exceeded its deadline.
    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout { operation: String, after: Duration },

    /// The same operation is already running for this target.
    #[error("Operation already in progress: {0}")]
    Busy(String),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Coarse error classes, one per response category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Io,
    VersionControl,
    Job,
    Timeout,
    Conflict,
    /// Graph-model and configuration errors that never cross the network boundary.
    Local,
}

impl CuratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            // A stored artifact that fails to parse is a storage fault.
            Self::Io { .. } | Self::Metadata { .. } | Self::Dot(_) => ErrorKind::Io,
            Self::Vcs(VcsError::InvalidRef(_)) => ErrorKind::Validation,
            Self::Vcs(_) | Self::UncommittedPublish { .. } => ErrorKind::VersionControl,
            Self::Job(_) => ErrorKind::Job,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Busy(_) => ErrorKind::Conflict,
            Self::Graph(_) | Self::Config(_) => ErrorKind::Local,
        }
    }

    /// Whether re-triggering the same request may succeed without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Busy(_))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from the in-memory graph model and [`GraphStore`](crate::graph::GraphStore).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A node or edge with this id already exists.
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// No node or edge with this id exists.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An edge references a node that is not in the graph.
    #[error("Edge {edge} references missing node {node}")]
    DanglingEdge { edge: String, node: String },

    /// A listener tried to mutate the store while being notified.
    #[error("Mutation rejected: store is notifying listeners")]
    Reentrant,
}

/// Errors from the edit-mode controller. Local only, like [`GraphError`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// A pointer event named a node the store does not hold.
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors reading the DOT interchange format.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DotError {
    #[error("Parse error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Unsupported construct: {0}")]
    Unsupported(String),

    #[error("Invalid graph: {0}")]
    Graph(#[from] GraphError),
}

/// Errors from the version-control collaborator.
#[derive(thiserror::Error, Debug)]
pub enum VcsError {
    /// The repository could not be opened or walked.
    #[error("Repository error: {0}")]
    Repository(String),

    /// `git add` / `git commit` failed.
    #[error("Commit failed: {0}")]
    Commit(String),

    /// `git checkout` failed.
    #[error("Checkout of {reference} failed: {message}")]
    Checkout { reference: String, message: String },

    /// The call did not finish before its deadline and was abandoned.
    #[error("{operation} did not finish within {after:?}")]
    TimedOut { operation: String, after: Duration },

    /// A reference name that could be mistaken for an option or is empty.
    #[error("Invalid reference: {0:?}")]
    InvalidRef(String),

    /// The `git` binary could not be spawned.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the candidate-generation job collaborator.
#[derive(thiserror::Error, Debug)]
pub enum JobError {
    /// The job process could not be started.
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The job ran and reported failure.
    #[error("Job exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Errors in Curator configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience alias for `Result<T, CuratorError>`.
pub type Result<T> = std::result::Result<T, CuratorError>;
