//! CLI route: single route table and run context. Dispatches to engine services and presentation.

use crate::cli::parse::{Commands, ConfigCommands, TargetCommands};
use crate::cli::{
    command_name, format_affected_nodes, format_changed_paths, format_config,
    format_parsed_target,
};
use crate::config::{ConfigLoader, RippleConfig};
use crate::dependency::{
    affected_nodes_in, changed_paths_for, extract_changed_paths, ChangeConverter,
    ChangeSnapshots, LocalEventValue,
};
use crate::node::DependencyGraphNode;
use crate::target::parse_target;
use crate::target::qualifier::get_entity_qualificator;
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Runtime context for CLI execution: workspace and the loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: RippleConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => ConfigLoader::load(&workspace_root).with_context(|| {
                format!(
                    "Failed to load configuration for workspace {}",
                    workspace_root.display()
                )
            })?,
        };

        if let Err(errors) = config.validate() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::bail!("Invalid configuration:\n  {}", messages.join("\n  "));
        }

        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn from_config(workspace_root: PathBuf, config: RippleConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &RippleConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> anyhow::Result<String> {
        let started = Instant::now();
        let name = command_name(command);
        let result = self.execute_inner(command);
        info!(
            command = %name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> anyhow::Result<String> {
        match command {
            Commands::Target { command } => self.handle_target_command(command),
            Commands::Paths { event, format } => {
                let event: LocalEventValue = self.read_json(event)?;
                let paths = extract_changed_paths(
                    &event,
                    &self.config.converter(),
                    &self.config.engine.omni_id,
                )?;
                format_changed_paths(&paths, format)
            }
            Commands::Affected {
                event,
                nodes,
                format,
            } => {
                let event: LocalEventValue = self.read_json(event)?;
                let nodes: Vec<DependencyGraphNode> = self.read_json(nodes)?;
                let omni_id = &self.config.engine.omni_id;
                let descriptors = self.config.converter().convert(&event)?;
                let paths = changed_paths_for(&event, &descriptors, omni_id);
                let snapshots = ChangeSnapshots::for_event(&event, &descriptors, omni_id);
                let affected = affected_nodes_in(&nodes, &paths, &snapshots);
                format_affected_nodes(&affected, format)
            }
            Commands::Config { command } => match command {
                ConfigCommands::Show => format_config(&self.config),
            },
        }
    }

    fn handle_target_command(&self, command: &TargetCommands) -> anyhow::Result<String> {
        match command {
            TargetCommands::Parse { path, format } => {
                format_parsed_target(&parse_target(path), format)
            }
            TargetCommands::Qualify { path } => Ok(get_entity_qualificator(path)?),
        }
    }

    /// Read a JSON file, relative paths resolved against the workspace root
    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> anyhow::Result<T> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };
        debug!(path = %path.display(), "Reading input file");
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {} as JSON", path.display()))
    }
}
