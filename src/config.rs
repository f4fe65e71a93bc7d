//! Configuration System
//!
//! Layered configuration for the set of served sources and the process-wide
//! filtering rules. Values come from merge-policy defaults, the user-level
//! config file, a workspace `docforest.toml`, and `DOCFOREST__*` environment
//! variables, in that order of increasing precedence.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::workspace_file::WORKSPACE_CONFIG_FILE;

/// One configured source: a local directory, or a repository plus a ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root directory (for versioned sources, the repository working directory)
    pub path: PathBuf,

    /// Display name; first segment of every logical path in this source
    #[serde(default)]
    pub alias: String,

    /// Branch, tag, or commit to read from instead of the working tree
    #[serde(default, alias = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,

    /// Sub-directory of the root that the tree starts from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,

    /// Folder-specific exclusion patterns
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl SourceConfig {
    /// A source is versioned when it names a non-empty ref.
    pub fn is_versioned(&self) -> bool {
        self.git_ref.as_deref().map_or(false, |r| !r.is_empty())
    }

    /// Starting path of the tree, relative to the root.
    pub fn start_path(&self) -> &str {
        self.sub_path.as_deref().unwrap_or("")
    }
}

/// Exclusion patterns shared by all sources with the same root.
///
/// Stored as a list of entries rather than a table keyed by path, since
/// paths make poor configuration keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoExclude {
    pub root: PathBuf,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Live-channel listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8090".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Sources in display order; the index is the source's folder index
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Recognized file extensions, including the leading dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Global exclusion patterns, matched against bare names
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Exclusions shared by every source rooted at the same repository
    #[serde(default)]
    pub repo_exclude: Vec<RepoExclude>,

    /// Watch local sources for changes
    #[serde(default = "default_true")]
    pub watch: bool,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_extensions() -> Vec<String> {
    vec![".md".to_string(), ".markdown".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        ".git".to_string(),
        ".svn".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            extensions: default_extensions(),
            exclude: default_exclude(),
            repo_exclude: Vec::new(),
            watch: true,
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Source(usize, String),
    System(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Source(index, msg) => write!(f, "Source [{}]: {}", index, msg),
            ValidationError::System(msg) => write!(f, "System: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ForestConfig {
    /// Resolve source roots and repo-exclusion keys to absolute paths and
    /// fill in missing aliases. Relative paths are taken relative to `base`.
    pub fn normalize(&mut self, base: &Path) {
        for source in &mut self.sources {
            source.path = absolutize(&source.path, base);
            if source.alias.trim().is_empty() {
                source.alias = default_alias(source);
            }
        }

        for entry in &mut self.repo_exclude {
            entry.root = absolutize(&entry.root, base);
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.sources.is_empty() {
            errors.push(ValidationError::System(
                "At least one source must be configured".to_string(),
            ));
        }

        let mut aliases = HashSet::new();
        for (index, source) in self.sources.iter().enumerate() {
            if source.path.as_os_str().is_empty() {
                errors.push(ValidationError::Source(index, "path cannot be empty".to_string()));
            }
            if source.alias.trim().is_empty() {
                errors.push(ValidationError::Source(index, "alias cannot be empty".to_string()));
            } else if source.alias.contains('/') {
                errors.push(ValidationError::Source(
                    index,
                    format!("alias '{}' cannot contain '/'", source.alias),
                ));
            } else if !aliases.insert(source.alias.as_str()) {
                errors.push(ValidationError::Source(
                    index,
                    format!("duplicate alias '{}'", source.alias),
                ));
            }
        }

        for ext in &self.extensions {
            if !ext.starts_with('.') {
                errors.push(ValidationError::System(format!(
                    "extension '{}' must start with '.'",
                    ext
                )));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding all problems into one error.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }

    /// Exclusions shared by all sources rooted at `root`. Entries for the
    /// same root accumulate in configuration order.
    pub fn repo_excludes_for(&self, root: &Path) -> Vec<String> {
        self.repo_exclude
            .iter()
            .filter(|entry| entry.root == root)
            .flat_map(|entry| entry.exclude.iter().cloned())
            .collect()
    }

    /// Repo-shared patterns followed by the source's own patterns.
    pub fn merged_excludes(&self, index: usize) -> Vec<String> {
        let Some(source) = self.sources.get(index) else {
            return Vec::new();
        };
        let mut merged = self.repo_excludes_for(&source.path);
        merged.extend(source.exclude.iter().cloned());
        merged
    }

    /// Index of the source with the given alias.
    pub fn source_index(&self, alias: &str) -> Option<usize> {
        self.sources.iter().position(|s| s.alias == alias)
    }
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    if let Ok(canonical) = dunce::canonicalize(&joined) {
        return canonical;
    }
    if joined.is_absolute() {
        return joined;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&joined))
        .unwrap_or(joined)
}

fn default_alias(source: &SourceConfig) -> String {
    let base = source
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| source.path.to_string_lossy().to_string());
    match source.git_ref.as_deref() {
        Some(git_ref) if !git_ref.is_empty() => format!("{} ({})", base, git_ref),
        _ => base,
    }
}
