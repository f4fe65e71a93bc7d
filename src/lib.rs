//! Docforest: markdown trees from local folders and git snapshots
//!
//! Read access to document trees that live either on disk or inside a named
//! snapshot of a git repository, without checking that snapshot out. Builds
//! a filtered, sorted tree per configured source, groups snapshots of one
//! repository together, and pushes local file changes to live subscribers.

pub mod backend;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod exclude;
pub mod live;
pub mod logging;
pub mod tree;
pub mod watch;
