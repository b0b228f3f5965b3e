mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose, cli.global.log_json);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli {
        mut global,
        command,
    } = cli;

    match command {
        // Config commands work even when the file is missing or broken
        Command::Config(args) => {
            config::apply_defaults(&mut global, &relay_config::load_config_or_default());
            commands::config_cmd::handle(args, &global)
        }

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "relayctl", &mut std::io::stdout());
            Ok(())
        }

        // Everything else talks to a backend
        cmd => {
            let cfg = relay_config::load_config()?;
            config::apply_defaults(&mut global, &cfg);
            let console_config = config::build_console_config(&cfg, &global)?;

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, console_config, &global).await
        }
    }
}
