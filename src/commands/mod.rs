mod common;
mod compare;
mod completions;
mod config;
mod help;
mod init;

use anyhow::Result;

use crate::cli::{CliArgs, CommandKind};

/// Run the selected command and return the process exit code.
pub fn dispatch(args: &CliArgs) -> Result<i32> {
    match &args.command {
        CommandKind::Help { all, command } => help::run(*all, command.as_deref()).map(|_| 0),
        CommandKind::Compare(cmd) => compare::run(args, cmd),
        CommandKind::Init(cmd) => init::run(args, cmd).map(|_| 0),
        CommandKind::Config(_) => config::run(args).map(|_| 0),
        CommandKind::Completions(cmd) => completions::run(args, cmd).map(|_| 0),
    }
}
