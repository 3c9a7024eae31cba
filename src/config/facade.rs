//! Layered configuration loading.

use super::merge::builder_with_defaults;
use super::sources::{environment, global_file, workspace_file};
use super::RippleConfig;
use crate::error::EngineError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`RippleConfig`] from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace
    ///
    /// Precedence, lowest first: defaults, `~/.config/ripple/config.toml`,
    /// `config/config.toml`, `config/{RIPPLE_ENV}.toml`, `RIPPLE__*` variables.
    pub fn load(workspace_root: &Path) -> Result<RippleConfig, EngineError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: RippleConfig = builder.build()?.try_deserialize()?;
        debug!(
            workspace_root = %workspace_root.display(),
            sources = config.sources.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load configuration from a single file on top of the defaults
    pub fn load_from_file(path: &Path) -> Result<RippleConfig, EngineError> {
        let config = builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// User-level config path, `None` when HOME is unset
    pub fn xdg_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    pub fn default() -> RippleConfig {
        RippleConfig::default()
    }
}
