//! CLI route: single route table and run context. Dispatches to domain services.

use crate::cli::help::command_name;
use crate::cli::parse::Commands;
use crate::config::{ConfigLoader, ForestConfig, SourceConfig};
use crate::document::Documents;
use crate::error::ApiError;
use crate::live::{run_listener, Broadcaster};
use crate::tree::build_forest;
use crate::watch::ChangeWatcher;
use serde::Serialize;
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// One source as listed by `docforest sources`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceListing<'a> {
    #[serde(flatten)]
    source: &'a SourceConfig,
    effective_excludes: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourcesReport<'a> {
    sources: Vec<SourceListing<'a>>,
    global_exclude: &'a [String],
    repo_exclude: &'a [crate::config::RepoExclude],
}

/// Runtime context for CLI execution: the loaded, validated configuration.
pub struct RunContext {
    config: ForestConfig,
}

impl RunContext {
    /// Load configuration from an explicit file or the layered defaults.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Self::from_config(config)
    }

    /// Wrap an already loaded configuration.
    pub fn from_config(config: ForestConfig) -> Result<Self, ApiError> {
        config.ensure_valid()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Execute a command and return its printable output.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let result = match command {
            Commands::Tree { pretty } => self.handle_tree(*pretty),
            Commands::Raw { path } => self.handle_raw(path),
            Commands::Sources => self.handle_sources(),
            Commands::Serve { bind } => self.handle_serve(bind.as_deref()),
        };
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn handle_tree(&self, pretty: bool) -> Result<String, ApiError> {
        let forest = build_forest(&self.config);
        let json = if pretty {
            serde_json::to_string_pretty(&forest)?
        } else {
            serde_json::to_string(&forest)?
        };
        Ok(json)
    }

    fn handle_raw(&self, path: &str) -> Result<String, ApiError> {
        let bytes = Documents::new(&self.config).raw(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn handle_sources(&self) -> Result<String, ApiError> {
        let sources = self
            .config
            .sources
            .iter()
            .enumerate()
            .map(|(index, source)| SourceListing {
                source,
                effective_excludes: self.config.merged_excludes(index),
            })
            .collect();
        let report = SourcesReport {
            sources,
            global_exclude: &self.config.exclude,
            repo_exclude: &self.config.repo_exclude,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }

    /// Run the watcher and the live channel until the listener fails.
    fn handle_serve(&self, bind: Option<&str>) -> Result<String, ApiError> {
        let bind = bind.unwrap_or(&self.config.server.bind).to_string();
        let broadcaster = Arc::new(Broadcaster::new());

        let watcher = if self.config.watch {
            let watcher = ChangeWatcher::new(&self.config);
            let publisher = Arc::clone(&broadcaster);
            watcher.on_change(move |event| {
                publisher.publish(event);
            });
            watcher.start()?;
            Some(watcher)
        } else {
            warn!("Watching disabled; subscribers will receive no events");
            None
        };

        let listener = TcpListener::bind(&bind)?;
        let served = run_listener(broadcaster, listener);

        if let Some(watcher) = watcher {
            watcher.stop()?;
        }
        served?;
        Ok(format!("Live channel on {} closed", bind))
    }
}
