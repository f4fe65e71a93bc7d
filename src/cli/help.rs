//! CLI command-name contract for logging.

use crate::cli::parse::Commands;

/// Command name string for log fields (e.g. "tree", "serve").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Tree { .. } => "tree",
        Commands::Raw { .. } => "raw",
        Commands::Sources => "sources",
        Commands::Serve { .. } => "serve",
    }
}
