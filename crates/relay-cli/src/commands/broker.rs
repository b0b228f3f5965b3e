//! Broker command handlers.

use relay_core::{
    BrokerSettings, BrokerStatus, Command as CoreCommand, CommandResult, Console, ConsoleConfig,
    UpdateBrokerRequest,
};

use crate::cli::{BrokerArgs, BrokerCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

pub async fn handle(
    config: ConsoleConfig,
    args: BrokerArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let painter = Painter::new(global.color_mode());

    match args.command {
        BrokerCommand::Status => {
            let status = Console::oneshot(config, |c| async move { c.broker_status().await }).await?;
            let out = output::render_single(
                global.format(),
                &status,
                |s| status_detail(s, painter),
                |s| if s.connected { "connected" } else { "disconnected" }.to_owned(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BrokerCommand::Config => {
            let settings =
                Console::oneshot(config, |c| async move { c.broker_settings().await }).await?;
            let out = output::render_single(
                global.format(),
                &settings,
                settings_detail,
                |s| s.endpoint.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BrokerCommand::Set {
            from_file,
            endpoint,
            cert_path,
            host_id,
            skip_hostname_check,
            skip_verify,
            max_out_queue,
            max_in_queue,
        } => {
            let req: UpdateBrokerRequest = if let Some(ref path) = from_file {
                util::read_json_file(path)?
            } else {
                UpdateBrokerRequest {
                    endpoint,
                    client_cert_path: cert_path,
                    host_id,
                    skip_hostname_check,
                    skip_verify,
                    max_out_queue,
                    max_in_queue,
                }
            };
            util::require_changes(req.is_empty())?;
            let result =
                util::execute(config, CoreCommand::UpdateBrokerSettings(req), global).await?;
            if let CommandResult::Broker(settings) = result {
                let out = output::render_single(
                    global.format(),
                    &settings,
                    settings_detail,
                    |s| s.endpoint.clone(),
                )?;
                output::print_output(&out, global.quiet);
            }
            if !global.quiet {
                eprintln!("New settings apply on the next broker connect.");
            }
            Ok(())
        }

        BrokerCommand::Connect => {
            util::execute(config, CoreCommand::ConnectBroker, global).await?;
            Ok(())
        }

        BrokerCommand::Disconnect => {
            util::execute(config, CoreCommand::DisconnectBroker, global).await?;
            Ok(())
        }
    }
}

fn status_detail(status: &BrokerStatus, painter: Painter) -> String {
    output::render_details(&[
        (
            "State",
            if status.connected {
                painter.good("connected")
            } else {
                painter.bad("disconnected")
            },
        ),
        ("Endpoint", status.endpoint.clone()),
        ("Queue", status.queue_depth.to_string()),
    ])
}

fn settings_detail(s: &BrokerSettings) -> String {
    output::render_details(&[
        ("Endpoint", s.endpoint.clone()),
        ("Host ID", s.host_id.clone()),
        ("Client Cert", output::format_opt(s.client_cert_path.as_deref())),
        ("Skip Hostname", s.skip_hostname_check.to_string()),
        ("Skip Verify", s.skip_verify.to_string()),
        ("Out Queue Max", s.max_out_queue.to_string()),
        ("In Queue Max", s.max_in_queue.to_string()),
        (
            "Updated",
            output::format_opt(s.updated_at.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC"))),
        ),
    ])
}
