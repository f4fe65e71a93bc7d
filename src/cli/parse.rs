//! CLI parse: clap types for docforest. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Docforest CLI - markdown trees from local folders and git snapshots
#[derive(Parser)]
#[command(name = "docforest")]
#[command(about = "Browse markdown trees on local disk or inside git refs, with live change notification")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace directory holding docforest.toml
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (when output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the forest of all configured sources as JSON
    Tree {
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Print the raw contents of a document by logical path (<alias>/<path>)
    Raw {
        /// Logical path, e.g. "handbook/guides/setup.md"
        path: String,
    },
    /// List configured sources with their effective exclusions
    Sources,
    /// Watch local sources and push changes to live subscribers
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
}
