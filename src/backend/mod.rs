//! Source Backends
//!
//! A single read-only contract over the two kinds of storage a source can
//! live in: a directory on local disk, or a named snapshot inside a git
//! repository. Tree construction and document access only ever see this
//! trait, so the git side can be swapped for a library reader later.

pub mod git;
pub mod local;

pub use git::GitBackend;
pub use local::LocalBackend;

use crate::config::SourceConfig;
use crate::error::BackendError;
use chrono::{DateTime, Utc};

/// Metadata for one path inside a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    /// Unset when the backend has no timestamp (e.g. no history touching the path).
    pub mod_time: Option<DateTime<Utc>>,
}

/// One immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Read-only access to one source.
///
/// Paths are `/`-separated and relative to the source root; `""` and `"."`
/// denote the root itself. Every operation fails with `NotFound` on a missing
/// path and rejects parent traversal with `PermissionDenied` before touching
/// the underlying storage.
pub trait SourceBackend: Send + Sync {
    fn read(&self, path: &str) -> Result<Vec<u8>, BackendError>;
    fn stat(&self, path: &str) -> Result<FileMeta, BackendError>;
    /// Immediate children only.
    fn list(&self, path: &str) -> Result<Vec<DirEntry>, BackendError>;
}

/// Open the backend for a configured source: git when a ref is set, local otherwise.
pub fn open_backend(source: &SourceConfig) -> Box<dyn SourceBackend> {
    match source.git_ref.as_deref() {
        Some(git_ref) if !git_ref.is_empty() => {
            Box::new(GitBackend::new(source.path.clone(), git_ref.to_string()))
        }
        _ => Box::new(LocalBackend::new(source.path.clone())),
    }
}

/// Validate a source-relative path and return it in canonical form.
///
/// The root is returned as `""`; a leading `./` and trailing `/` are dropped.
/// Absolute paths and any `..` segment are refused.
pub fn guard_path(path: &str) -> Result<String, BackendError> {
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(BackendError::PermissionDenied(path.to_string()));
    }
    if path
        .split(|c: char| c == '/' || c == '\\')
        .any(|segment| segment == "..")
    {
        return Err(BackendError::PermissionDenied(path.to_string()));
    }

    let mut cleaned = path;
    while let Some(rest) = cleaned.strip_prefix("./") {
        cleaned = rest;
    }
    let cleaned = cleaned.trim_end_matches('/');
    if cleaned == "." {
        return Ok(String::new());
    }
    Ok(cleaned.to_string())
}

/// Final `/`-separated segment of a path.
pub fn base_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}
