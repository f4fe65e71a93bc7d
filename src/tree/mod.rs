//! Document Tree
//!
//! Builds one filtered, sorted tree per configured source, nests snapshots
//! of a shared repository under a group node, and wraps the result in a
//! synthetic forest root when more than one top-level node remains.

pub mod builder;
pub mod grouping;
pub mod node;

pub use builder::TreeBuilder;
pub use grouping::group_by_repo;
pub use node::{NodeKind, TreeNode};

use crate::backend::{open_backend, SourceBackend};
use crate::config::{ForestConfig, SourceConfig};
use crate::exclude::{FolderRules, GlobalRules};
use tracing::{debug, instrument};

/// Build the complete forest for every configured source.
pub fn build_forest(config: &ForestConfig) -> TreeNode {
    build_forest_with(config, open_backend)
}

/// Same as [`build_forest`], with a caller-supplied backend factory.
#[instrument(skip_all, fields(sources = config.sources.len()))]
pub fn build_forest_with<F>(config: &ForestConfig, open: F) -> TreeNode
where
    F: Fn(&SourceConfig) -> Box<dyn SourceBackend>,
{
    let global = GlobalRules::new(&config.exclude, &config.extensions);

    let mut trees = Vec::new();
    for (index, source) in config.sources.iter().enumerate() {
        let backend = open(source);
        let folder = FolderRules::new(&config.merged_excludes(index));
        let builder = TreeBuilder::new(backend.as_ref(), &global, &folder, &source.alias, index);
        match builder.build(source.start_path()) {
            Some(tree) => trees.push(tree),
            None => debug!(alias = %source.alias, "Source omitted from forest"),
        }
    }

    let mut roots = group_by_repo(trees, &config.sources);
    if roots.len() == 1 {
        if let Some(only) = roots.pop() {
            return only;
        }
    }
    TreeNode::forest(roots)
}
