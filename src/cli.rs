//! CLI domain: parse, route, help, output, and presentation only.
//! Inspection tooling over the engine; nothing here evaluates expressions.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, ConfigCommands, TargetCommands};
pub use presentation::{
    format_affected_nodes, format_changed_paths, format_config, format_parsed_target,
};
pub use route::RunContext;
