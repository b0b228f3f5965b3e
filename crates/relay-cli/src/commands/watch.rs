//! `watch`: stream reconciled views until Ctrl-C.
//!
//! Re-renders whenever a snapshot arrives, the channel state changes or the
//! job listing is refreshed, so a dropped connection shows up as a
//! reconnecting indicator above the last values received.

use std::io::{IsTerminal, Write};

use relay_core::{Console, ConsoleConfig, ConsoleView, JobId};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::status;

pub async fn handle(
    config: ConsoleConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let console = Console::new(config)?;
    console.start().await?;

    let filter: Vec<JobId> = args.jobs.into_iter().map(JobId).collect();
    let result = stream(&console, &filter, global).await;
    console.shutdown().await;
    result
}

async fn stream(console: &Console, filter: &[JobId], global: &GlobalOpts) -> Result<(), CliError> {
    let painter = Painter::new(global.color_mode());
    let clear = global.format() == OutputFormat::Table && std::io::stdout().is_terminal();

    let mut snapshots = console.subscribe();
    let mut connection = console.connection_state();
    let mut jobs = console.subscribe_jobs();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    emit(&console.view(), filter, global, painter, clear)?;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            snapshot = snapshots.changed() => {
                if snapshot.is_none() {
                    break;
                }
            }
            changed = connection.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = jobs.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        emit(&console.view(), filter, global, painter, clear)?;
    }

    snapshots.unsubscribe();
    Ok(())
}

fn emit(
    view: &ConsoleView,
    filter: &[JobId],
    global: &GlobalOpts,
    painter: Painter,
    clear: bool,
) -> Result<(), CliError> {
    if global.quiet {
        return Ok(());
    }

    let mut view = view.clone();
    if !filter.is_empty() {
        view.jobs.retain(|j| filter.contains(&j.id));
    }

    let out = match global.format() {
        OutputFormat::Table => status::render_view(&view, painter),
        // One document per update so the stream stays line-parseable
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(&view, true)?,
        OutputFormat::Yaml => format!("---\n{}", output::render_yaml(&view)?),
        OutputFormat::Plain => {
            let label = view.connection.label();
            status::render_plain(&view)
                .lines()
                .map(|line| format!("{label}\t{line}"))
                .collect::<Vec<_>>()
                .join("\n")
        }
    };

    let mut stdout = std::io::stdout().lock();
    if clear {
        write!(stdout, "\x1b[2J\x1b[H")?;
    }
    writeln!(stdout, "{out}")?;
    stdout.flush()?;
    Ok(())
}
