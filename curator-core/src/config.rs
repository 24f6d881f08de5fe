use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default config file name, looked up at the repository root.
pub const CONFIG_FILE: &str = "curator.toml";

/// Top-level Curator configuration, matching `curator.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CuratorConfig {
    #[serde(default)]
    pub workspace: WorkspaceSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub vcs: VcsSection,
    #[serde(default)]
    pub jobs: JobsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSection {
    /// Directory holding one subdirectory per project, relative to the repo root.
    pub projects_dir: String,
}

impl Default for WorkspaceSection {
    fn default() -> Self {
        Self {
            projects_dir: "projects".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VcsSection {
    /// Reference checked out by "reset to latest".
    pub mainline_ref: String,
    /// Marker prepended to every publish commit message.
    pub commit_prefix: String,
    pub timeout_secs: u64,
}

impl Default for VcsSection {
    fn default() -> Self {
        Self {
            mainline_ref: "main".to_string(),
            commit_prefix: "[KG_UPDATE]".to_string(),
            timeout_secs: 30,
        }
    }
}

impl VcsSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsSection {
    /// Program that generates `kg_candidate.dot` for a batch directory.
    pub program: String,
    /// Leading arguments; the batch directory is appended last.
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for JobsSection {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["scripts/generate_candidate.py".to_string()],
            timeout_secs: 30,
        }
    }
}

impl JobsSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CuratorConfig {
    /// Parse and validate configuration text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, failing if it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
            _ => ConfigError::Parse(format!("{}: {e}", path.display())),
        })?;
        Self::from_toml(&text)
    }

    /// Load `<repo_root>/curator.toml`, falling back to defaults when absent.
    pub fn load_or_default(repo_root: &Path) -> Result<Self, ConfigError> {
        let path = repo_root.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workspace.projects_dir.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "workspace.projects_dir must not be empty".into(),
            ));
        }
        if self.vcs.mainline_ref.trim().is_empty() {
            return Err(ConfigError::Invalid("vcs.mainline_ref must not be empty".into()));
        }
        if self.jobs.program.trim().is_empty() {
            return Err(ConfigError::Invalid("jobs.program must not be empty".into()));
        }
        if self.vcs.timeout_secs == 0 || self.jobs.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be at least 1 second".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = CuratorConfig::from_toml("").unwrap();
        assert_eq!(config.workspace.projects_dir, "projects");
        assert_eq!(config.vcs.mainline_ref, "main");
        assert_eq!(config.vcs.commit_prefix, "[KG_UPDATE]");
        assert_eq!(config.vcs.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_sections_override() {
        let config = CuratorConfig::from_toml(
            "[vcs]\nmainline_ref = \"kg-merger\"\ncommit_prefix = \"[KG]\"\ntimeout_secs = 5\n\n[jobs]\nprogram = \"./gen.sh\"\nargs = []\ntimeout_secs = 120\n",
        )
        .unwrap();
        assert_eq!(config.vcs.mainline_ref, "kg-merger");
        assert_eq!(config.jobs.program, "./gen.sh");
        assert!(config.jobs.args.is_empty());
        assert_eq!(config.jobs.timeout(), Duration::from_secs(120));
        assert_eq!(config.server.bind, "127.0.0.1:3000");
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let err = CuratorConfig::from_toml("[jobs]\nprogram = \"x\"\nargs = []\ntimeout_secs = 0\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = CuratorConfig::from_toml("[vcs\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_explicit_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = CuratorConfig::load(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        let config = CuratorConfig::load_or_default(tmp.path()).unwrap();
        assert_eq!(config.workspace.projects_dir, "projects");
    }
}
