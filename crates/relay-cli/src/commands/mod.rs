//! Command dispatch: bridges CLI args -> console calls -> output formatting.

pub mod broker;
pub mod config_cmd;
pub mod feeds;
pub mod jobs;
pub mod status;
pub mod util;
pub mod watch;

use relay_core::ConsoleConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: ConsoleConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(config, args, global).await,
        Command::Watch(args) => watch::handle(config, args, global).await,
        Command::Jobs(args) => jobs::handle(config, args, global).await,
        Command::Feeds(args) => feeds::handle(config, args, global).await,
        Command::Broker(args) => broker::handle(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
