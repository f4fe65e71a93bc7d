//! Integration tests for docforest

mod live_updates;
mod repo_grouping;
mod test_utils;
mod tree_properties;
mod tree_structure;
