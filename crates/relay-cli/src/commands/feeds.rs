//! Feed command handlers.

use tabled::Tabled;

use relay_core::{
    Command as CoreCommand, CommandResult, Console, ConsoleConfig, CreateFeedRequest, Feed,
    FeedEndpoint, FeedId, FeedTemplate, JobId, UpdateFeedRequest,
};

use crate::cli::{EndpointArg, FeedsArgs, FeedsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::jobs::enabled_label;
use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct FeedRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
    #[tabled(rename = "Interval")]
    interval: String,
    #[tabled(rename = "Area")]
    area: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "URL")]
    base_url: String,
}

impl FeedRow {
    fn new(f: &Feed, painter: Painter) -> Self {
        Self {
            id: f.id.to_string(),
            name: f.name.clone(),
            endpoint: f.endpoint.to_string(),
            interval: format!("{}s", f.poll_interval_secs),
            area: area(f.lat, f.lon, f.distance),
            enabled: enabled_label(f.enabled, painter),
            base_url: f.base_url.clone(),
        }
    }
}

#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
    #[tabled(rename = "Interval")]
    interval: String,
    #[tabled(rename = "Area")]
    area: String,
    #[tabled(rename = "URL")]
    base_url: String,
}

impl From<&FeedTemplate> for TemplateRow {
    fn from(t: &FeedTemplate) -> Self {
        Self {
            name: t.name.clone(),
            endpoint: t.endpoint.to_string(),
            interval: t
                .poll_interval_secs
                .map_or_else(|| "-".into(), |s| format!("{s}s")),
            area: area(t.lat, t.lon, t.distance),
            base_url: t.base_url.clone(),
        }
    }
}

fn area(lat: Option<f64>, lon: Option<f64>, distance: Option<f64>) -> String {
    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            let radius = distance.map(|d| format!(" r={d}")).unwrap_or_default();
            format!("{lat:.4},{lon:.4}{radius}")
        }
        _ => "-".into(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: ConsoleConfig,
    args: FeedsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let painter = Painter::new(global.color_mode());

    match args.command {
        FeedsCommand::List { job } => {
            let job_id = JobId(job);
            let feeds = Console::oneshot(config, |c| async move { c.feeds(job_id).await }).await?;
            let out = output::render_list(
                global.format(),
                &feeds,
                |f| FeedRow::new(f, painter),
                |f| f.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FeedsCommand::Add {
            job,
            from_file,
            name,
            base_url,
            endpoint,
            interval,
            lat,
            lon,
            distance,
            disabled,
        } => {
            let feed = if let Some(ref path) = from_file {
                util::read_json_file(path)?
            } else {
                CreateFeedRequest {
                    name: name.unwrap_or_default(),
                    base_url: base_url.unwrap_or_default(),
                    endpoint: endpoint.map(feed_endpoint),
                    poll_interval_secs: interval,
                    lat,
                    lon,
                    distance,
                    enabled: disabled.then_some(false),
                }
            };
            let cmd = CoreCommand::CreateFeed {
                job_id: JobId(job),
                feed,
            };
            print_feed(util::execute(config, cmd, global).await?, global, painter)
        }

        FeedsCommand::Update {
            job,
            feed,
            from_file,
            name,
            base_url,
            endpoint,
            interval,
            lat,
            lon,
            distance,
        } => {
            let update: UpdateFeedRequest = if let Some(ref path) = from_file {
                util::read_json_file(path)?
            } else {
                UpdateFeedRequest {
                    name,
                    base_url,
                    endpoint: endpoint.map(feed_endpoint),
                    poll_interval_secs: interval,
                    lat,
                    lon,
                    distance,
                    enabled: None,
                }
            };
            util::require_changes(update.is_empty())?;
            let cmd = CoreCommand::UpdateFeed {
                job_id: JobId(job),
                feed_id: FeedId(feed),
                update,
            };
            print_feed(util::execute(config, cmd, global).await?, global, painter)
        }

        FeedsCommand::Templates { job } => {
            let job_id = JobId(job);
            let templates =
                Console::oneshot(config, |c| async move { c.feed_templates(job_id).await })
                    .await?;
            let out = output::render_list(
                global.format(),
                &templates,
                |t: &FeedTemplate| TemplateRow::from(t),
                |t| t.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FeedsCommand::Enable { job, feed } => {
            set_enabled(config, JobId(job), FeedId(feed), true, global, painter).await
        }

        FeedsCommand::Disable { job, feed } => {
            set_enabled(config, JobId(job), FeedId(feed), false, global, painter).await
        }

        FeedsCommand::Delete { job, feed } => {
            let cmd = CoreCommand::DeleteFeed {
                job_id: JobId(job),
                feed_id: FeedId(feed),
            };
            if !util::confirm(&cmd.describe(), global.yes)? {
                return Ok(());
            }
            util::execute(config, cmd, global).await?;
            Ok(())
        }
    }
}

async fn set_enabled(
    config: ConsoleConfig,
    job_id: JobId,
    feed_id: FeedId,
    enabled: bool,
    global: &GlobalOpts,
    painter: Painter,
) -> Result<(), CliError> {
    let cmd = CoreCommand::SetFeedEnabled {
        job_id,
        feed_id,
        enabled,
    };
    print_feed(util::execute(config, cmd, global).await?, global, painter)
}

fn feed_endpoint(arg: EndpointArg) -> FeedEndpoint {
    match arg {
        EndpointArg::Geo => FeedEndpoint::Geo,
        EndpointArg::Point => FeedEndpoint::Point,
        EndpointArg::Mil => FeedEndpoint::Mil,
    }
}

/// Print the feed record a write command returned, as a one-row table.
fn print_feed(result: CommandResult, global: &GlobalOpts, painter: Painter) -> Result<(), CliError> {
    if let CommandResult::Feed(feed) = result {
        let out = output::render_list(
            global.format(),
            std::slice::from_ref(&feed),
            |f| FeedRow::new(f, painter),
            |f| f.id.to_string(),
        )?;
        output::print_output(&out, global.quiet);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_needs_both_coordinates() {
        assert_eq!(area(Some(51.5), Some(-0.12), Some(50.0)), "51.5000,-0.1200 r=50");
        assert_eq!(area(Some(51.5), None, Some(50.0)), "-");
    }
}
