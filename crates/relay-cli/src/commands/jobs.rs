//! Job command handlers.

use chrono::Utc;
use serde::Serialize;
use tabled::Tabled;

use relay_core::{
    Command as CoreCommand, CommandResult, Console, ConsoleConfig, CreateJobRequest, GeoBounds,
    Job, JobId, JobType, JobView, UpdateJobRequest,
};

use crate::cli::{GeoArg, GlobalOpts, JobsArgs, JobsCommand, WaitArgs};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
pub(super) struct JobRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Events")]
    events: String,
    #[tabled(rename = "Entities")]
    entities: String,
    #[tabled(rename = "Last Poll")]
    last_poll: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Error")]
    error: String,
}

impl JobRow {
    pub(super) fn new(view: &JobView, painter: Painter, now: chrono::DateTime<Utc>) -> Self {
        let state = if view.enabled {
            painter.running(view.running)
        } else {
            painter.dim("disabled")
        };
        Self {
            id: view.id.to_string(),
            name: view.name.clone(),
            kind: view.kind.clone(),
            state,
            events: view.events_emitted.to_string(),
            entities: view.active_entity_count.to_string(),
            last_poll: output::format_age(view.last_poll_time, now),
            source: painter.liveness(view.liveness),
            error: view
                .last_error
                .as_deref()
                .map_or_else(String::new, |e| painter.bad(e)),
        }
    }
}

#[derive(Tabled)]
struct FeedViewRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
    #[tabled(rename = "Interval")]
    interval: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Last Poll")]
    last_poll: String,
    #[tabled(rename = "Counters")]
    counters: String,
}

#[derive(Tabled)]
struct JobTypeRow {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&JobType> for JobTypeRow {
    fn from(t: &JobType) -> Self {
        Self {
            kind: t.kind.clone(),
            name: t.display_name.clone(),
            description: t.description.clone(),
        }
    }
}

/// Persisted record plus its reconciled view, for `jobs show`.
#[derive(Serialize)]
struct JobDetail {
    job: Job,
    status: JobView,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: ConsoleConfig,
    args: JobsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let painter = Painter::new(global.color_mode());

    match args.command {
        JobsCommand::List { live, wait } => {
            let console = connect(config, live, wait, global).await?;
            let result = if live {
                Ok(())
            } else {
                console.refresh_jobs().await
            };
            let views = console.job_views();
            console.shutdown().await;
            result?;

            let now = Utc::now();
            let out = output::render_list(
                global.format(),
                &views,
                |v| JobRow::new(v, painter, now),
                |v| v.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        JobsCommand::Show { id, live, wait } => {
            let id = JobId(id);
            let console = connect(config, live, wait, global).await?;
            let fetched = console.fetch_job(id).await;
            let view = console.job_view(id);
            console.shutdown().await;

            let job = fetched?;
            let status = view.ok_or_else(|| CliError::NotFound {
                resource_type: "job".into(),
                identifier: id.to_string(),
                list_command: "jobs list".into(),
            })?;
            let detail = JobDetail { job, status };

            let out = output::render_single(
                global.format(),
                &detail,
                |d| render_detail(d, painter),
                |d| d.job.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        JobsCommand::Create {
            from_file,
            kind,
            name,
            stale_after,
            alt_ceiling,
            alt_floor,
            uid_key,
            geo,
            disabled,
        } => {
            let req = if let Some(ref path) = from_file {
                util::read_json_file(path)?
            } else {
                CreateJobRequest {
                    kind: kind.unwrap_or_default(),
                    name: name.unwrap_or_default(),
                    enabled: disabled.then_some(false),
                    stale_after_secs: stale_after,
                    altitude_ceiling: alt_ceiling,
                    altitude_floor: alt_floor,
                    uid_key,
                    geo_bounds: geo.map(geo_bounds),
                }
            };
            let result = util::execute(config, CoreCommand::CreateJob(req), global).await?;
            print_job(result, global, painter)
        }

        JobsCommand::Update {
            id,
            from_file,
            name,
            enabled,
            stale_after,
            alt_ceiling,
            alt_floor,
            uid_key,
            geo,
        } => {
            let update: UpdateJobRequest = if let Some(ref path) = from_file {
                util::read_json_file(path)?
            } else {
                UpdateJobRequest {
                    name,
                    enabled,
                    stale_after_secs: stale_after,
                    altitude_ceiling: alt_ceiling,
                    altitude_floor: alt_floor,
                    uid_key,
                    geo_bounds: geo.map(geo_bounds),
                }
            };
            util::require_changes(update.is_empty())?;
            let cmd = CoreCommand::UpdateJob {
                id: JobId(id),
                update,
            };
            let result = util::execute(config, cmd, global).await?;
            print_job(result, global, painter)
        }

        JobsCommand::Start { id } => {
            util::execute(config, CoreCommand::StartJob { id: JobId(id) }, global).await?;
            Ok(())
        }

        JobsCommand::Stop { id } => {
            util::execute(config, CoreCommand::StopJob { id: JobId(id) }, global).await?;
            Ok(())
        }

        JobsCommand::Enable { id } => set_enabled(config, JobId(id), true, global, painter).await,

        JobsCommand::Disable { id } => set_enabled(config, JobId(id), false, global, painter).await,

        JobsCommand::Delete { id } => {
            let cmd = CoreCommand::DeleteJob { id: JobId(id) };
            if !util::confirm(&cmd.describe(), global.yes)? {
                return Ok(());
            }
            util::execute(config, cmd, global).await?;
            Ok(())
        }

        JobsCommand::Types => {
            let types = Console::oneshot(config, |c| async move { c.job_types().await }).await?;
            let out = output::render_list(
                global.format(),
                &types,
                |t: &JobType| JobTypeRow::from(t),
                |t| t.kind.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// A console with the status feed running when `live`, else a REST-only one.
async fn connect(
    config: ConsoleConfig,
    live: bool,
    wait: WaitArgs,
    global: &GlobalOpts,
) -> Result<Console, CliError> {
    if live {
        util::open_live(config, wait.wait, global.quiet).await
    } else {
        Ok(Console::new(config)?)
    }
}

fn geo_bounds(g: GeoArg) -> GeoBounds {
    GeoBounds {
        min_lat: g.min_lat,
        max_lat: g.max_lat,
        min_lon: g.min_lon,
        max_lon: g.max_lon,
    }
}

async fn set_enabled(
    config: ConsoleConfig,
    id: JobId,
    enabled: bool,
    global: &GlobalOpts,
    painter: Painter,
) -> Result<(), CliError> {
    let result = util::execute(config, CoreCommand::SetJobEnabled { id, enabled }, global).await?;
    print_job(result, global, painter)
}

/// Print the job record a write command returned.
fn print_job(result: CommandResult, global: &GlobalOpts, painter: Painter) -> Result<(), CliError> {
    if let CommandResult::Job(job) = result {
        let out = output::render_single(
            global.format(),
            &job,
            |j| {
                output::render_details(&[
                    ("ID", j.id.to_string()),
                    ("Name", j.name.clone()),
                    ("Type", j.kind.clone()),
                    ("Enabled", enabled_label(j.enabled, painter)),
                    ("Stale After", format!("{}s", j.stale_after_secs)),
                ])
            },
            |j| j.id.to_string(),
        )?;
        output::print_output(&out, global.quiet);
    }
    Ok(())
}

pub(super) fn enabled_label(enabled: bool, painter: Painter) -> String {
    if enabled {
        painter.good("yes")
    } else {
        painter.dim("no")
    }
}

fn render_detail(detail: &JobDetail, painter: Painter) -> String {
    let job = &detail.job;
    let status = &detail.status;
    let now = Utc::now();

    let mut pairs = vec![
        ("ID", job.id.to_string()),
        ("Name", job.name.clone()),
        ("Type", job.kind.clone()),
        ("Enabled", enabled_label(job.enabled, painter)),
        ("State", painter.running(status.running)),
        ("Source", painter.liveness(status.liveness)),
        ("Events", status.events_emitted.to_string()),
        ("Entities", status.active_entity_count.to_string()),
        ("Last Poll", output::format_age(status.last_poll_time, now)),
        ("Stale After", format!("{}s", job.stale_after_secs)),
        ("UID Key", job.uid_key.clone()),
        (
            "Feeds",
            format!("{}/{} enabled", job.enabled_feed_count(), job.feeds.len()),
        ),
    ];
    if job.altitude_floor != 0 || job.altitude_ceiling != 0 {
        pairs.push((
            "Altitude",
            format!("{}..{}", job.altitude_floor, job.altitude_ceiling),
        ));
    }
    if let Some(bounds) = job.geo_bounds {
        pairs.push((
            "Bounds",
            format!(
                "lat {}..{}, lon {}..{}",
                bounds.min_lat, bounds.max_lat, bounds.min_lon, bounds.max_lon
            ),
        ));
    }
    if let Some(ref err) = status.last_error {
        pairs.push(("Last Error", painter.bad(err)));
    }

    let mut out = output::render_details(&pairs);
    if !status.feeds.is_empty() {
        let rows: Vec<FeedViewRow> = status
            .feeds
            .iter()
            .map(|f| FeedViewRow {
                id: f.id.to_string(),
                name: f.name.clone(),
                endpoint: f.endpoint.to_string(),
                interval: format!("{}s", f.poll_interval_secs),
                enabled: enabled_label(f.enabled, painter),
                last_poll: output::format_age(f.last_poll_time, now),
                counters: f
                    .counters
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            })
            .collect();
        out.push_str("\n\n");
        out.push_str(&output::render_table(&rows));
    }
    out
}
