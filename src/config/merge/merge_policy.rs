//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// List-valued settings (extensions, exclusions) take their defaults from
/// serde so that a file providing them replaces rather than appends.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("watch", true)?
        .set_default("server.bind", "127.0.0.1:8090")?
        .set_default("logging.level", "info")
}
