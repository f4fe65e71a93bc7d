//! Repo grouping: nest several snapshots of one repository under one node.

use crate::config::SourceConfig;
use crate::tree::node::TreeNode;
use std::path::PathBuf;
use tracing::debug;

/// Group source trees that share a root location and carry a ref.
///
/// `trees` holds one tree per surviving source in configuration order, each
/// tagged with its folder index. Trees without a ref pass through unchanged.
/// Versioned trees are bucketed by root; a bucket of two or more becomes a
/// synthetic group named after the root's final segment. A tree whose ref is
/// already present in its root's bucket stays standalone. Grouped buckets
/// come first (first-seen root order), then the standalone trees.
pub fn group_by_repo(trees: Vec<TreeNode>, sources: &[SourceConfig]) -> Vec<TreeNode> {
    let mut buckets: Vec<(PathBuf, Vec<(&str, TreeNode)>)> = Vec::new();
    let mut standalone = Vec::new();

    for tree in trees {
        let source = tree.folder_index.and_then(|i| sources.get(i));
        let (source, git_ref) = match source {
            Some(source) if source.is_versioned() => {
                (source, source.git_ref.as_deref().unwrap_or_default())
            }
            _ => {
                standalone.push(tree);
                continue;
            }
        };

        match buckets.iter_mut().find(|(root, _)| *root == source.path) {
            Some((_, members)) if members.iter().any(|(r, _)| *r == git_ref) => {
                debug!(alias = %tree.alias, git_ref, "Ref already grouped; kept standalone");
                standalone.push(tree);
            }
            Some((_, members)) => members.push((git_ref, tree)),
            None => buckets.push((source.path.clone(), vec![(git_ref, tree)])),
        }
    }

    let mut result = Vec::with_capacity(buckets.len() + standalone.len());
    for (root, members) in buckets {
        let mut members: Vec<TreeNode> = members.into_iter().map(|(_, tree)| tree).collect();
        if members.len() == 1 {
            result.extend(members.pop());
            continue;
        }
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root.to_string_lossy().to_string());
        result.push(TreeNode::repo_group(name, members));
    }
    result.extend(standalone);
    result
}
