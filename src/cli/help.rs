//! CLI help and command-name contract for logging.

use crate::cli::parse::{Commands, ConfigCommands, TargetCommands};

/// Command name string for log records (e.g. "target.parse", "config.show").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Target { command } => format!("target.{}", target_command_name(command)),
        Commands::Paths { .. } => "paths".to_string(),
        Commands::Affected { .. } => "affected".to_string(),
        Commands::Config { command } => format!("config.{}", config_command_name(command)),
    }
}

pub fn target_command_name(command: &TargetCommands) -> &'static str {
    match command {
        TargetCommands::Parse { .. } => "parse",
        TargetCommands::Qualify { .. } => "qualify",
    }
}

pub fn config_command_name(command: &ConfigCommands) -> &'static str {
    match command {
        ConfigCommands::Show => "show",
    }
}
