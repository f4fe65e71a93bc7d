//! Tree node wire model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serialized `type` of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Directory,
    File,
    /// Synthetic wrapper around several top-level trees
    Root,
}

/// One file or directory in a constructed tree.
///
/// Built per request and discarded after serialization. Directories never
/// carry size or modification time; synthetic nodes carry no folder index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: NodeKind,

    /// Alias-qualified logical path
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alias: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_index: Option<usize>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mod_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_repo_group: bool,
}

impl TreeNode {
    pub fn directory(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Directory,
            path: path.into(),
            alias: String::new(),
            folder_index: None,
            children: Vec::new(),
            mod_time: None,
            size: None,
            is_repo_group: false,
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::File,
            ..Self::directory(name, path)
        }
    }

    /// Synthetic node nesting several snapshots of one repository.
    pub fn repo_group(name: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            children,
            is_repo_group: true,
            ..Self::directory(name, "")
        }
    }

    /// Synthetic forest root over all top-level nodes.
    pub fn forest(children: Vec<TreeNode>) -> Self {
        Self {
            kind: NodeKind::Root,
            children,
            ..Self::directory("", "")
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind != NodeKind::File
    }

    /// Depth-first visit of this node and every descendant.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a TreeNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
