//! Integration tests for tree structure correctness

use crate::integration::test_utils::{source, write_file};
use docforest::config::{ForestConfig, RepoExclude};
use docforest::tree::{build_forest, NodeKind, TreeNode};
use tempfile::TempDir;

fn child<'a>(node: &'a TreeNode, name: &str) -> Option<&'a TreeNode> {
    node.children.iter().find(|c| c.name == name)
}

fn all_paths(node: &TreeNode) -> Vec<String> {
    let mut paths = Vec::new();
    node.walk(&mut |n| paths.push(n.path.clone()));
    paths
}

/// A single source is returned as the top-level node, named after its alias
#[test]
fn test_single_source_is_top_level() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("kb");
    write_file(&root, "index.md", "# Index");
    write_file(&root, "guides/setup.md", "# Setup");

    let mut config = ForestConfig::default();
    config.sources.push(source(&root, "kb", None));

    let forest = build_forest(&config);
    assert_eq!(forest.kind, NodeKind::Directory);
    assert_eq!(forest.name, "kb");
    assert_eq!(forest.folder_index, Some(0));
    assert_eq!(
        all_paths(&forest),
        vec!["kb", "kb/guides", "kb/guides/setup.md", "kb/index.md"]
    );
}

/// Several sources are wrapped in a synthetic root
#[test]
fn test_multiple_sources_wrapped_in_root() {
    let temp_dir = TempDir::new().unwrap();
    let first = temp_dir.path().join("first");
    let second = temp_dir.path().join("second");
    write_file(&first, "a.md", "a");
    write_file(&second, "b.md", "b");

    let mut config = ForestConfig::default();
    config.sources.push(source(&first, "first", None));
    config.sources.push(source(&second, "second", None));

    let forest = build_forest(&config);
    assert_eq!(forest.kind, NodeKind::Root);
    let names: Vec<&str> = forest.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert_eq!(forest.children[1].folder_index, Some(1));

    let json = forest.to_json().unwrap();
    assert!(json.starts_with("{\"type\":\"root\""));
}

/// Sources with nothing visible are omitted; a forest of none is an empty root
#[test]
fn test_empty_sources_are_omitted() {
    let temp_dir = TempDir::new().unwrap();
    let empty = temp_dir.path().join("empty");
    let code = temp_dir.path().join("code");
    std::fs::create_dir_all(&empty).unwrap();
    write_file(&code, "main.rs", "fn main() {}");

    let mut config = ForestConfig::default();
    config.sources.push(source(&empty, "empty", None));
    config.sources.push(source(&code, "code", None));
    config.sources.push(source(&temp_dir.path().join("missing"), "missing", None));

    let forest = build_forest(&config);
    assert_eq!(forest.kind, NodeKind::Root);
    assert!(forest.children.is_empty());
    assert_eq!(forest.to_json().unwrap(), "{\"type\":\"root\"}");
}

/// Each tier excludes on its own; paths matching none survive
#[test]
fn test_exclusion_tiers() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("repo");
    write_file(&root, "keep.md", "k");
    write_file(&root, "node_modules/pkg/readme.md", "global");
    write_file(&root, "vendor/readme.md", "repo-shared");
    write_file(&root, "vendorish/readme.md", "kept");
    write_file(&root, "drafts/wip.md", "folder-specific");
    write_file(&root, "notes.txt", "extension");

    let mut config = ForestConfig::default();
    let mut src = source(&root, "repo", None);
    src.exclude.push("drafts".to_string());
    config.sources.push(src);
    config.repo_exclude.push(RepoExclude {
        root: root.clone(),
        exclude: vec!["vendor/*".to_string()],
    });

    let forest = build_forest(&config);
    let names: Vec<&str> = forest.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["vendorish", "keep.md"]);
}

/// A sub-path narrows the tree; logical paths stay relative to the root
#[test]
fn test_sub_path_source() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("project");
    write_file(&root, "README.md", "top");
    write_file(&root, "docs/usage.md", "usage");

    let mut config = ForestConfig::default();
    let mut src = source(&root, "project-docs", None);
    src.sub_path = Some("docs".to_string());
    config.sources.push(src);

    let forest = build_forest(&config);
    assert_eq!(forest.name, "project-docs");
    let usage = child(&forest, "usage.md").unwrap();
    assert_eq!(usage.path, "project-docs/docs/usage.md");
    assert!(child(&forest, "README.md").is_none());
}

/// Files carry size and modification time; directories carry neither
#[test]
fn test_file_metadata() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("m");
    write_file(&root, "dir/file.md", "12345");

    let mut config = ForestConfig::default();
    config.sources.push(source(&root, "m", None));

    let forest = build_forest(&config);
    let dir = child(&forest, "dir").unwrap();
    assert!(dir.size.is_none() && dir.mod_time.is_none());
    let file = child(dir, "file.md").unwrap();
    assert_eq!(file.size, Some(5));
    assert!(file.mod_time.is_some());
}
