//! CLI parse: clap types for ripple. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ripple CLI - inspect targets, change events and dirty-node detection
#[derive(Parser)]
#[command(name = "ripple")]
#[command(about = "Reactive dependency-graph evaluation engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Target path tools
    Target {
        #[command(subcommand)]
        command: TargetCommands,
    },
    /// List the changed paths a change event produces
    Paths {
        /// JSON file holding { source, previousValues, currentValues }
        #[arg(long)]
        event: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List the nodes a change event makes dirty
    Affected {
        /// JSON file holding the change event
        #[arg(long)]
        event: PathBuf,
        /// JSON file holding an array of dependency-graph nodes
        #[arg(long)]
        nodes: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum TargetCommands {
    /// Parse a target into entity, id and rest
    Parse {
        path: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the entity qualifier of a target (ENTITY.id)
    Qualify { path: String },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}
