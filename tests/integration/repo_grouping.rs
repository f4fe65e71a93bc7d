//! Integration tests for grouping snapshots of one repository

use crate::integration::test_utils::{source, write_file, MemoryBackend};
use docforest::backend::{open_backend, SourceBackend};
use docforest::config::{ForestConfig, SourceConfig};
use docforest::tree::{build_forest_with, NodeKind};
use std::path::Path;
use tempfile::TempDir;

/// Versioned sources read from an in-memory snapshot per ref; local ones from disk.
fn opener(source: &SourceConfig) -> Box<dyn SourceBackend> {
    match source.git_ref.as_deref() {
        Some("main") => Box::new(MemoryBackend::new(["README.md", "guide/intro.md"])),
        Some("v1") => Box::new(MemoryBackend::new(["README.md"])),
        Some(_) => Box::new(MemoryBackend::default()),
        None => open_backend(source),
    }
}

/// Local "A" plus refs main and v1 of /r: two top-level nodes
#[test]
fn test_local_plus_two_refs_of_one_repo() {
    let temp_dir = TempDir::new().unwrap();
    let local = temp_dir.path().join("a");
    write_file(&local, "x.md", "x");

    let mut config = ForestConfig::default();
    config.sources.push(source(&local, "A", None));
    config.sources.push(source(Path::new("/r"), "main", Some("main")));
    config.sources.push(source(Path::new("/r"), "v1", Some("v1")));

    let forest = build_forest_with(&config, opener);
    assert_eq!(forest.kind, NodeKind::Root);
    assert_eq!(forest.children.len(), 2);

    let group = forest.children.iter().find(|n| n.is_repo_group).unwrap();
    assert_eq!(group.name, "r");
    assert_eq!(group.kind, NodeKind::Directory);
    assert!(group.folder_index.is_none());
    let refs: Vec<&str> = group.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(refs, vec!["main", "v1"]);
    assert_eq!(group.children[0].children[0].path, "main/guide");

    let a = forest.children.iter().find(|n| n.name == "A").unwrap();
    assert_eq!(a.children.len(), 1);
    assert_eq!(a.children[0].path, "A/x.md");
}

/// One ref of a repo is not grouped, and alone it becomes the top level
#[test]
fn test_single_ref_is_plain_top_level() {
    let mut config = ForestConfig::default();
    config.sources.push(source(Path::new("/r"), "main", Some("main")));

    let forest = build_forest_with(&config, opener);
    assert_eq!(forest.kind, NodeKind::Directory);
    assert!(!forest.is_repo_group);
    assert_eq!(forest.name, "main");
}

/// A lone group is itself the top-level node
#[test]
fn test_lone_group_is_top_level() {
    let mut config = ForestConfig::default();
    config.sources.push(source(Path::new("/srv/handbook"), "main", Some("main")));
    config.sources.push(source(Path::new("/srv/handbook"), "v1", Some("v1")));

    let forest = build_forest_with(&config, opener);
    assert!(forest.is_repo_group);
    assert_eq!(forest.name, "handbook");
    assert_eq!(forest.children.len(), 2);
}

/// A ref whose snapshot shows nothing drops out of its group
#[test]
fn test_empty_snapshot_leaves_group() {
    let mut config = ForestConfig::default();
    config.sources.push(source(Path::new("/r"), "main", Some("main")));
    config.sources.push(source(Path::new("/r"), "gone", Some("gone")));

    let forest = build_forest_with(&config, opener);
    assert!(!forest.is_repo_group);
    assert_eq!(forest.name, "main");
}
