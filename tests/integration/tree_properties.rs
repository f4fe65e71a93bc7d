//! Property-based tests for tree construction invariants

use crate::integration::test_utils::MemoryBackend;
use docforest::exclude::{FolderRules, GlobalRules};
use docforest::tree::{NodeKind, TreeBuilder, TreeNode};
use proptest::prelude::*;
use std::collections::HashSet;

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("docs".to_string()),
        Just("node_modules".to_string()),
        Just("Notes".to_string()),
        Just("vendor".to_string()),
        Just("a.md".to_string()),
        Just("b.txt".to_string()),
        Just("C.md".to_string()),
    ]
}

fn file_paths() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::collection::vec(segment(), 1..5), 0..24).prop_map(|paths| {
        // A path may not be both a file and a directory.
        let mut files: Vec<String> = Vec::new();
        let mut dirs: HashSet<String> = HashSet::new();
        for segments in paths {
            let path = segments.join("/");
            let prefixes: Vec<String> =
                (1..segments.len()).map(|i| segments[..i].join("/")).collect();
            let clashes = files.iter().any(|f| prefixes.contains(f))
                || dirs.contains(&path)
                || files.contains(&path);
            if clashes {
                continue;
            }
            dirs.extend(prefixes);
            files.push(path);
        }
        files
    })
}

fn rules() -> (GlobalRules, FolderRules) {
    (
        GlobalRules::new(&["node_modules".to_string()], &[".md".to_string()]),
        FolderRules::new(&["vendor/*".to_string()]),
    )
}

/// No directory in a constructed tree has an empty children list
#[test]
fn test_no_empty_directories_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&file_paths(), |files| {
            let backend = MemoryBackend::new(files.iter().map(|s| s.as_str()));
            let (global, folder) = rules();
            let tree = TreeBuilder::new(&backend, &global, &folder, "src", 0).build("");

            if let Some(tree) = tree {
                let mut ok = true;
                tree.walk(&mut |n: &TreeNode| {
                    if n.kind == NodeKind::Directory && n.children.is_empty() {
                        ok = false;
                    }
                });
                prop_assert!(ok);
            }
            Ok(())
        })
        .unwrap();
}

/// Logical paths are unique, and every surviving file passed every filter
#[test]
fn test_paths_unique_and_filtered_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&file_paths(), |files| {
            let backend = MemoryBackend::new(files.iter().map(|s| s.as_str()));
            let (global, folder) = rules();
            let Some(tree) = TreeBuilder::new(&backend, &global, &folder, "src", 0).build("")
            else {
                // Nothing survived: no input file may pass all filters.
                for f in &files {
                    let visible = f.ends_with(".md")
                        && !f.split('/').any(|s| s == "node_modules")
                        && !f.starts_with("vendor/");
                    prop_assert!(!visible, "{} should have been visible", f);
                }
                return Ok(());
            };

            let mut seen = HashSet::new();
            let mut unique = true;
            let mut bad_file = None;
            tree.walk(&mut |n: &TreeNode| {
                if !seen.insert(n.path.clone()) {
                    unique = false;
                }
                if n.kind == NodeKind::File
                    && (!n.name.ends_with(".md") || n.path.contains("/node_modules/"))
                {
                    bad_file = Some(n.path.clone());
                }
            });
            prop_assert!(unique);
            prop_assert!(bad_file.is_none(), "unexpected file {:?}", bad_file);
            Ok(())
        })
        .unwrap();
}
