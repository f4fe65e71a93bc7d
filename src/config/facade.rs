//! Config loader: assembles the layered sources into a `ForestConfig`.

use crate::config::merge::merge_policy;
use crate::config::sources::{global_file, workspace_file};
use crate::config::ForestConfig;
use crate::error::ApiError;
use config::{Environment, File};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variables take the form `DOCFOREST__WATCH=false`,
/// `DOCFOREST__SERVER__BIND=0.0.0.0:9000`.
const ENV_PREFIX: &str = "DOCFOREST";
const ENV_SEPARATOR: &str = "__";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, then the global file, the workspace file and the
    /// environment. The result is normalized against `workspace_root` but not
    /// validated.
    pub fn load(workspace_root: &Path) -> Result<ForestConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = builder.add_source(Self::environment());

        let mut config: ForestConfig = builder.build()?.try_deserialize()?;
        config.normalize(workspace_root);
        info!(
            sources = config.sources.len(),
            workspace = %workspace_root.display(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load a single explicit file on top of the defaults. The file must exist.
    /// Relative paths inside it resolve against the file's directory.
    pub fn load_from_file(path: &Path) -> Result<ForestConfig, ApiError> {
        if !path.is_file() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .add_source(Self::environment());

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut config: ForestConfig = builder.build()?.try_deserialize()?;
        config.normalize(base);
        Ok(config)
    }

    /// Path of the user-level config file, if the platform defines one.
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
    }
}
