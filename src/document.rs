//! Document access by logical path.
//!
//! A logical path is `<alias>/<path relative to the source root>`, the same
//! form the tree builder emits. Resolution picks the source by alias, and
//! reads go through that source's backend.

use crate::backend::{guard_path, open_backend, SourceBackend};
use crate::config::{ForestConfig, SourceConfig};
use crate::error::{ApiError, BackendError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// One heading in a rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub level: u8,
    pub title: String,
    pub anchor: String,
}

/// Output of the rendering collaborator, embedded verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendered {
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub title: String,
}

/// Turns raw document bytes into HTML plus an outline.
pub trait Renderer {
    fn render(&self, source: &[u8]) -> Result<Rendered, ApiError>;
}

/// A rendered document as served to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub path: String,
    pub title: String,
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub mod_time: Option<DateTime<Utc>>,
    pub folder_index: usize,
}

/// A logical path split into its source and source-relative part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub folder_index: usize,
    pub rel_path: String,
}

/// Read access to documents across all configured sources.
pub struct Documents<'a, F = fn(&SourceConfig) -> Box<dyn SourceBackend>> {
    config: &'a ForestConfig,
    open: F,
}

impl<'a> Documents<'a> {
    pub fn new(config: &'a ForestConfig) -> Self {
        Self {
            config,
            open: open_backend,
        }
    }
}

impl<'a, F> Documents<'a, F>
where
    F: Fn(&SourceConfig) -> Box<dyn SourceBackend>,
{
    pub fn with_opener(config: &'a ForestConfig, open: F) -> Self {
        Self { config, open }
    }

    /// Split `<alias>/<rel>` and validate the relative part.
    ///
    /// A leading `/` is tolerated. An empty path or unknown alias is
    /// `NotFound`; parent traversal is `PermissionDenied`.
    pub fn resolve(&self, logical: &str) -> Result<ResolvedPath, BackendError> {
        let logical = logical.trim_start_matches('/');
        if logical.is_empty() {
            return Err(BackendError::NotFound(String::new()));
        }

        let (alias, rel) = logical.split_once('/').unwrap_or((logical, ""));
        let folder_index = self
            .config
            .source_index(alias)
            .ok_or_else(|| BackendError::NotFound(logical.to_string()))?;
        let rel_path = guard_path(rel)?;

        Ok(ResolvedPath {
            folder_index,
            rel_path,
        })
    }

    fn open_resolved(
        &self,
        logical: &str,
    ) -> Result<(ResolvedPath, Box<dyn SourceBackend>), ApiError> {
        let resolved = self.resolve(logical)?;
        let source = self
            .config
            .sources
            .get(resolved.folder_index)
            .ok_or_else(|| BackendError::NotFound(logical.to_string()))?;
        Ok((resolved, (self.open)(source)))
    }

    /// Raw bytes of a file.
    #[instrument(skip(self))]
    pub fn raw(&self, logical: &str) -> Result<Vec<u8>, ApiError> {
        let (resolved, backend) = self.open_resolved(logical)?;
        let meta = backend.stat(&resolved.rel_path)?;
        if meta.is_dir {
            return Err(ApiError::IsDirectory(logical.to_string()));
        }
        Ok(backend.read(&resolved.rel_path)?)
    }

    /// Render a file through `renderer`.
    #[instrument(skip(self, renderer))]
    pub fn render(&self, logical: &str, renderer: &dyn Renderer) -> Result<DocumentView, ApiError> {
        let (resolved, backend) = self.open_resolved(logical)?;
        let meta = backend.stat(&resolved.rel_path)?;
        if meta.is_dir {
            return Err(ApiError::IsDirectory(logical.to_string()));
        }

        let bytes = backend.read(&resolved.rel_path)?;
        let rendered = renderer.render(&bytes)?;
        debug!(bytes = bytes.len(), headings = rendered.toc.len(), "Rendered document");

        Ok(DocumentView {
            path: logical.trim_start_matches('/').to_string(),
            title: rendered.title,
            html: rendered.html,
            toc: rendered.toc,
            mod_time: meta.mod_time,
            folder_index: resolved.folder_index,
        })
    }
}
