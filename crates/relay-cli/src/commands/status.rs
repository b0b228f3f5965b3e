//! `status`: one snapshot of broker and job state.

use chrono::Utc;

use relay_core::{ConsoleConfig, ConsoleView, Liveness};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::jobs::JobRow;
use super::util;

pub async fn handle(
    config: ConsoleConfig,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let console = util::open_live(config, args.wait.wait, global.quiet).await?;
    let view = console.view();
    console.shutdown().await;

    let painter = Painter::new(global.color_mode());
    let out = output::render_single(
        global.format(),
        &view,
        |v| render_view(v, painter),
        render_plain,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Header block plus job table. Ages are measured against the backend's
/// clock when a snapshot carries one.
pub(super) fn render_view(view: &ConsoleView, painter: Painter) -> String {
    let now = view.server_time.unwrap_or_else(Utc::now);
    let broker = &view.broker;

    let broker_line = if broker.connected {
        painter.good("connected")
    } else {
        painter.bad("disconnected")
    };
    let mut broker_line = format!(
        "{broker_line}  {}  queue {}",
        broker.endpoint.as_deref().unwrap_or("-"),
        broker.queue_depth
    );
    if broker.liveness != Liveness::Live {
        broker_line.push_str(&format!("  ({})", painter.liveness(broker.liveness)));
    }

    // Open, but the snapshot on hand came from an earlier channel
    let channel = if view.connection.is_open() && !view.live {
        painter.warn("open, awaiting first frame")
    } else {
        painter.connection(&view.connection)
    };
    let local_now = Utc::now();
    let running = view.jobs.iter().filter(|j| j.running).count();
    let mut pairs = vec![
        ("Channel", channel),
        ("Last Frame", output::format_age(view.last_frame_at, local_now)),
        ("Broker", broker_line),
        ("Jobs", format!("{running} running / {}", view.jobs.len())),
        (
            "Listed",
            output::format_age(view.catalog_refreshed_at, local_now),
        ),
    ];
    if let Some(ref err) = broker.last_error {
        pairs.push(("Broker Error", painter.bad(err)));
    }

    let mut out = output::render_details(&pairs);
    if !view.jobs.is_empty() {
        let rows: Vec<JobRow> = view
            .jobs
            .iter()
            .map(|j| JobRow::new(j, painter, now))
            .collect();
        out.push_str("\n\n");
        out.push_str(&output::render_table(&rows));
    }
    if !view.unlisted_live_jobs.is_empty() {
        let ids: Vec<String> = view.unlisted_live_jobs.iter().map(ToString::to_string).collect();
        out.push('\n');
        out.push_str(&painter.warn(&format!(
            "backend reports unknown job(s) {}; run `relayctl jobs list` to refresh",
            ids.join(", ")
        )));
    }
    out
}

/// `<id>\t<running|stopped>\t<liveness>` per job.
pub(super) fn render_plain(view: &ConsoleView) -> String {
    view.jobs
        .iter()
        .map(|j| {
            format!(
                "{}\t{}\t{}",
                j.id,
                if j.running { "running" } else { "stopped" },
                j.liveness
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
