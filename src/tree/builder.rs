//! Tree builder for one source.
//!
//! A depth-first recursive build over a [`SourceBackend`]. Each call returns
//! `None` when the subtree is fully pruned, so no partially built tree is ever
//! mutated after the fact.

use crate::backend::{DirEntry, SourceBackend};
use crate::error::BackendError;
use crate::exclude::{FolderRules, GlobalRules};
use crate::tree::node::{NodeKind, TreeNode};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Builds the filtered, sorted tree for one source.
pub struct TreeBuilder<'a> {
    backend: &'a dyn SourceBackend,
    global: &'a GlobalRules,
    folder: &'a FolderRules,
    alias: String,
    folder_index: usize,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        backend: &'a dyn SourceBackend,
        global: &'a GlobalRules,
        folder: &'a FolderRules,
        alias: impl Into<String>,
        folder_index: usize,
    ) -> Self {
        Self {
            backend,
            global,
            folder,
            alias: alias.into(),
            folder_index,
        }
    }

    /// Build the tree rooted at `start` (relative to the backend root).
    ///
    /// Returns `None` when the start path cannot be read or when nothing
    /// survives filtering. The returned root is named after the alias.
    #[instrument(skip(self), fields(alias = %self.alias, folder_index = self.folder_index))]
    pub fn build(&self, start: &str) -> Option<TreeNode> {
        let started = Instant::now();
        let start = start.trim_matches('/');

        let mut root = match self.build_node(start, true) {
            Ok(Some(node)) => node,
            Ok(None) => {
                info!("Source has no visible documents");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read source root");
                return None;
            }
        };

        root.name = self.alias.clone();
        root.alias = self.alias.clone();

        let mut files = 0usize;
        root.walk(&mut |n| {
            if n.kind == NodeKind::File {
                files += 1;
            }
        });
        info!(
            files,
            duration_ms = started.elapsed().as_millis() as u64,
            "Built source tree"
        );
        Some(root)
    }

    fn logical_path(&self, rel: &str, is_root: bool) -> String {
        if is_root || rel.is_empty() {
            self.alias.clone()
        } else {
            format!("{}/{}", self.alias, rel)
        }
    }

    fn build_node(&self, rel: &str, is_root: bool) -> Result<Option<TreeNode>, BackendError> {
        let meta = self.backend.stat(rel)?;
        let path = self.logical_path(rel, is_root);

        if !meta.is_dir {
            let mut node = TreeNode::file(meta.name, path);
            node.folder_index = Some(self.folder_index);
            node.mod_time = meta.mod_time;
            node.size = Some(meta.size);
            return Ok(Some(node));
        }

        let mut entries = self.backend.list(rel)?;
        sort_entries(&mut entries);

        let mut children = Vec::new();
        for entry in entries {
            let child_rel = if rel.is_empty() {
                entry.name.clone()
            } else {
                format!("{}/{}", rel, entry.name)
            };

            if self.is_filtered(&entry, &child_rel) {
                continue;
            }

            match self.build_node(&child_rel, false) {
                Ok(Some(child)) => children.push(child),
                Ok(None) => {}
                Err(e) => {
                    debug!(path = %child_rel, error = %e, "Skipping unreadable entry");
                }
            }
        }

        if children.is_empty() {
            return Ok(None);
        }

        let mut node = TreeNode::directory(meta.name, path);
        node.folder_index = Some(self.folder_index);
        node.children = children;
        Ok(Some(node))
    }

    /// Global, then merged, then extension filtering; first match wins.
    fn is_filtered(&self, entry: &DirEntry, child_rel: &str) -> bool {
        if self.global.is_excluded(&entry.name) {
            return true;
        }
        if self.folder.is_excluded(child_rel) {
            return true;
        }
        !entry.is_dir && !self.global.has_recognized_extension(&entry.name)
    }
}

/// Directories before files, then case-insensitive name.
fn sort_entries(entries: &mut [DirEntry]) {
    entries.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });
}
