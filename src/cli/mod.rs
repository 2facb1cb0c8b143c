pub mod output;
pub mod registry;
pub mod table;

mod commands;
mod context;
mod shell;

pub use context::{CliError, CliMode, CommandError, CommandResult, ShellContext};
pub use shell::{run_cli, SCRIPT_ENV};
