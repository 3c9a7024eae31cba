//! Global config file source: ~/.config/ripple/config.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::PathBuf;
use tracing::debug;

/// Path to the user-level config file, if HOME is set.
pub fn global_config_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("ripple")
            .join("config.toml")
    })
}

/// Add the global config file to the builder when it exists.
pub fn add_to_builder(
    mut builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let Some(path) = global_config_path() else {
        return Ok(builder);
    };

    if path.exists() {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
        builder = builder.add_source(File::from(canonical).required(false));
    } else {
        debug!(config_path = %path.display(), "No user-level configuration file");
    }
    Ok(builder)
}
