//! Local directory backend: direct filesystem calls relative to a root.

use crate::backend::{base_name, guard_path, DirEntry, FileMeta, SourceBackend};
use crate::error::BackendError;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Serves a source straight from the host filesystem.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<(String, PathBuf), BackendError> {
        let rel = guard_path(path)?;
        let abs = if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(&rel)
        };
        Ok((rel, abs))
    }
}

impl SourceBackend for LocalBackend {
    fn read(&self, path: &str) -> Result<Vec<u8>, BackendError> {
        let (rel, abs) = self.resolve(path)?;
        fs::read(&abs).map_err(|e| BackendError::from_io(&rel, e))
    }

    fn stat(&self, path: &str) -> Result<FileMeta, BackendError> {
        let (rel, abs) = self.resolve(path)?;
        let metadata = fs::metadata(&abs).map_err(|e| BackendError::from_io(&rel, e))?;

        let name = if rel.is_empty() {
            abs.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        } else {
            base_name(&rel).to_string()
        };

        Ok(FileMeta {
            name,
            is_dir: metadata.is_dir(),
            size: metadata.len(),
            mod_time: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    fn list(&self, path: &str) -> Result<Vec<DirEntry>, BackendError> {
        let (rel, abs) = self.resolve(path)?;
        let read_dir = fs::read_dir(&abs).map_err(|e| BackendError::from_io(&rel, e))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| BackendError::from_io(&rel, e))?;
            // Symlinks are reported by their own type, not their target's.
            let is_dir = entry
                .file_type()
                .map(|t| t.is_dir())
                .map_err(|e| BackendError::from_io(&rel, e))?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                is_dir,
            });
        }
        Ok(entries)
    }
}
