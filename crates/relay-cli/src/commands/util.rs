//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;

use relay_core::{Command as CoreCommand, CommandResult, Console, ConsoleConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to prompt on, destructive actions need `--yes`.
pub fn confirm(action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.to_owned(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(format!("Really {action}?"))
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read a `--from-file` payload into a typed request.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid payload: {e}"),
    })
}

/// An update with nothing set is a usage error, not a no-op request.
pub fn require_changes(empty: bool) -> Result<(), CliError> {
    if empty {
        return Err(CliError::Validation {
            field: "update".into(),
            reason: "no fields given; pass at least one flag or --from-file".into(),
        });
    }
    Ok(())
}

/// Spinner on stderr; hidden when quiet or not on a terminal.
pub fn spinner(message: &'static str, quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner().with_message(message);
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Start a console with the status feed running and wait for the first
/// snapshot. The console is shut down again if that fails.
pub async fn open_live(
    config: ConsoleConfig,
    wait_secs: u64,
    quiet: bool,
) -> Result<Console, CliError> {
    let console = Console::new(config)?;
    if let Err(e) = console.start().await {
        console.shutdown().await;
        return Err(e.into());
    }

    let bar = spinner("waiting for live status", quiet);
    let result = console
        .wait_for_snapshot(Duration::from_secs(wait_secs))
        .await;
    bar.finish_and_clear();

    match result {
        Ok(_) => Ok(console),
        Err(e) => {
            console.shutdown().await;
            Err(e.into())
        }
    }
}

/// Run one write command against a console that never opens the status
/// feed, reporting what was done on stderr.
pub async fn execute(
    config: ConsoleConfig,
    cmd: CoreCommand,
    global: &GlobalOpts,
) -> Result<CommandResult, CliError> {
    let description = cmd.describe();
    let result = Console::oneshot(config, |console| async move { console.execute(cmd).await })
        .await?;
    if !global.quiet {
        eprintln!("{description}: done");
    }
    Ok(result)
}
