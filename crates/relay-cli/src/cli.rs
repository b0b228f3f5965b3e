//! Clap derive structures for the `relayctl` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// relayctl -- operator console for TAK feed relay backends
#[derive(Debug, Parser)]
#[command(
    name = "relayctl",
    version,
    about = "Operate TAK feed relay backends from the command line",
    long_about = "Operator console for a TAK feed relay.\n\n\
        Reads persisted jobs and feeds over the REST API and overlays the\n\
        live status stream, reconnecting automatically when it drops.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "RELAYCTL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend base URL (overrides profile)
    #[arg(long, short = 'u', env = "RELAYCTL_URL", global = true)]
    pub url: Option<String>,

    /// Output format [default: table, or `defaults.output` from config]
    #[arg(long, short = 'o', env = "RELAYCTL_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "RELAYCTL_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "RELAYCTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

impl GlobalOpts {
    pub fn format(&self) -> OutputFormat {
        self.output.unwrap_or(OutputFormat::Table)
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color.unwrap_or(ColorMode::Auto)
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Wait for the first live snapshot and print broker and job status
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Stream live job status until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage relay jobs
    #[command(alias = "j")]
    Jobs(JobsArgs),

    /// Manage the feeds of a job
    #[command(alias = "f")]
    Feeds(FeedsArgs),

    /// Inspect and control the TAK broker connection
    #[command(alias = "tak")]
    Broker(BrokerArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Args)]
pub struct WaitArgs {
    /// Seconds to wait for the first live snapshot
    #[arg(long, default_value = "10", value_name = "SECS")]
    pub wait: u64,
}

/// Feed query mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EndpointArg {
    /// Bounding box query
    Geo,
    /// Point plus radius query
    Point,
    /// Military traffic only
    Mil,
}

/// `MIN_LAT,MAX_LAT,MIN_LON,MAX_LON` as given to `--geo`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoArg {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

fn parse_geo(raw: &str) -> Result<GeoArg, String> {
    let values = raw
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{v}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    let [min_lat, max_lat, min_lon, max_lon] = values[..] else {
        return Err("expected MIN_LAT,MAX_LAT,MIN_LON,MAX_LON".into());
    };
    if min_lat > max_lat || min_lon > max_lon {
        return Err("minimum exceeds maximum".into());
    }
    Ok(GeoArg {
        min_lat,
        max_lat,
        min_lon,
        max_lon,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STATUS / WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only show these job IDs
    #[arg(long = "job", short = 'j', value_name = "ID")]
    pub jobs: Vec<i64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  JOBS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub command: JobsCommand,
}

#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    /// List persisted jobs
    #[command(alias = "ls")]
    List {
        /// Overlay live status from the status channel
        #[arg(long, short = 'l')]
        live: bool,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Show one job with its feeds
    Show {
        /// Job ID
        id: i64,

        /// Overlay live status from the status channel
        #[arg(long, short = 'l')]
        live: bool,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Create a job
    Create {
        /// Load the full payload from a JSON file
        #[arg(long, short = 'F')]
        from_file: Option<PathBuf>,

        /// Job type, one of `jobs types`
        #[arg(long, required_unless_present = "from_file")]
        kind: Option<String>,

        /// Job name
        #[arg(long, required_unless_present = "from_file")]
        name: Option<String>,

        /// Seconds before emitted CoT events go stale
        #[arg(long, value_name = "SECS")]
        stale_after: Option<u32>,

        /// Drop tracks above this altitude (0 disables)
        #[arg(long, value_name = "FT")]
        alt_ceiling: Option<i64>,

        /// Drop tracks below this altitude (0 disables)
        #[arg(long, value_name = "FT")]
        alt_floor: Option<i64>,

        /// Field used to build track UIDs
        #[arg(long)]
        uid_key: Option<String>,

        /// Restrict to a bounding box
        #[arg(long, value_parser = parse_geo, allow_hyphen_values = true,
              value_name = "MIN_LAT,MAX_LAT,MIN_LON,MAX_LON")]
        geo: Option<GeoArg>,

        /// Create the job disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Update a job's settings
    Update {
        /// Job ID
        id: i64,

        /// Load the full update payload from a JSON file
        #[arg(long, short = 'F')]
        from_file: Option<PathBuf>,

        /// Job name
        #[arg(long)]
        name: Option<String>,

        /// Enable/disable the job
        #[arg(long, action = clap::ArgAction::Set)]
        enabled: Option<bool>,

        /// Seconds before emitted CoT events go stale
        #[arg(long, value_name = "SECS")]
        stale_after: Option<u32>,

        /// Drop tracks above this altitude (0 disables)
        #[arg(long, value_name = "FT")]
        alt_ceiling: Option<i64>,

        /// Drop tracks below this altitude (0 disables)
        #[arg(long, value_name = "FT")]
        alt_floor: Option<i64>,

        /// Field used to build track UIDs
        #[arg(long)]
        uid_key: Option<String>,

        /// Restrict to a bounding box
        #[arg(long, value_parser = parse_geo, allow_hyphen_values = true,
              value_name = "MIN_LAT,MAX_LAT,MIN_LON,MAX_LON")]
        geo: Option<GeoArg>,
    },

    /// Start a job
    Start {
        /// Job ID
        id: i64,
    },

    /// Stop a job
    Stop {
        /// Job ID
        id: i64,
    },

    /// Enable a job so it starts with the backend
    Enable {
        /// Job ID
        id: i64,
    },

    /// Disable a job
    Disable {
        /// Job ID
        id: i64,
    },

    /// Delete a job and its feeds
    #[command(alias = "rm")]
    Delete {
        /// Job ID
        id: i64,
    },

    /// List the job types the backend supports
    Types,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FEEDS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FeedsArgs {
    #[command(subcommand)]
    pub command: FeedsCommand,
}

#[derive(Debug, Subcommand)]
pub enum FeedsCommand {
    /// List the feeds of a job
    #[command(alias = "ls")]
    List {
        /// Job ID
        job: i64,
    },

    /// Add a feed to a job
    Add {
        /// Job ID
        job: i64,

        /// Load the full payload from a JSON file
        #[arg(long, short = 'F')]
        from_file: Option<PathBuf>,

        /// Feed name
        #[arg(long, required_unless_present = "from_file")]
        name: Option<String>,

        /// Upstream base URL
        #[arg(long, required_unless_present = "from_file")]
        base_url: Option<String>,

        /// Query mode
        #[arg(long, value_enum)]
        endpoint: Option<EndpointArg>,

        /// Seconds between polls
        #[arg(long, value_name = "SECS")]
        interval: Option<u32>,

        /// Query centre latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Query centre longitude
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Query radius
        #[arg(long)]
        distance: Option<f64>,

        /// Create the feed disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Update a feed's settings
    Update {
        /// Job ID
        job: i64,
        /// Feed ID
        feed: i64,

        /// Load the full update payload from a JSON file
        #[arg(long, short = 'F')]
        from_file: Option<PathBuf>,

        /// Feed name
        #[arg(long)]
        name: Option<String>,

        /// Upstream base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Query mode
        #[arg(long, value_enum)]
        endpoint: Option<EndpointArg>,

        /// Seconds between polls
        #[arg(long, value_name = "SECS")]
        interval: Option<u32>,

        /// Query centre latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Query centre longitude
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Query radius
        #[arg(long)]
        distance: Option<f64>,
    },

    /// List known feed templates for a job's type
    Templates {
        /// Job ID
        job: i64,
    },

    /// Enable a feed
    Enable {
        /// Job ID
        job: i64,
        /// Feed ID
        feed: i64,
    },

    /// Disable a feed
    Disable {
        /// Job ID
        job: i64,
        /// Feed ID
        feed: i64,
    },

    /// Delete a feed
    #[command(alias = "rm")]
    Delete {
        /// Job ID
        job: i64,
        /// Feed ID
        feed: i64,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  BROKER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct BrokerArgs {
    #[command(subcommand)]
    pub command: BrokerCommand,
}

#[derive(Debug, Subcommand)]
pub enum BrokerCommand {
    /// Show broker connectivity as the backend reports it
    Status,

    /// Show persisted broker settings
    Config,

    /// Change persisted broker settings
    Set {
        /// Load the full update payload from a JSON file
        #[arg(long, short = 'F')]
        from_file: Option<PathBuf>,

        /// Broker endpoint, e.g. tls://tak.example:8089
        #[arg(long)]
        endpoint: Option<String>,

        /// Client certificate path on the backend host
        #[arg(long)]
        cert_path: Option<String>,

        /// Host identifier announced to the broker
        #[arg(long)]
        host_id: Option<String>,

        /// Skip broker hostname verification
        #[arg(long, action = clap::ArgAction::Set)]
        skip_hostname_check: Option<bool>,

        /// Skip broker certificate verification
        #[arg(long, action = clap::ArgAction::Set)]
        skip_verify: Option<bool>,

        /// Outbound queue limit
        #[arg(long)]
        max_out_queue: Option<u32>,

        /// Inbound queue limit
        #[arg(long)]
        max_in_queue: Option<u32>,
    },

    /// Ask the backend to connect to the broker
    Connect,

    /// Ask the backend to disconnect from the broker
    Disconnect,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Display the current configuration
    Show,

    /// Create or extend the config file with a profile
    Init {
        /// Profile name (prompted when omitted)
        #[arg(long)]
        name: Option<String>,

        /// Backend base URL (prompted when omitted)
        #[arg(long = "backend")]
        backend: Option<String>,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn geo_takes_four_ordered_edges() {
        let geo = parse_geo("50.5, 52,-1.25,1").unwrap();
        assert_eq!(
            geo,
            GeoArg {
                min_lat: 50.5,
                max_lat: 52.0,
                min_lon: -1.25,
                max_lon: 1.0
            }
        );
        assert!(parse_geo("50,52,-1").is_err());
        assert!(parse_geo("52,50,-1,1").is_err());
        assert!(parse_geo("a,b,c,d").is_err());
    }

    #[test]
    fn create_needs_kind_and_name_unless_from_file() {
        assert!(Cli::try_parse_from(["relayctl", "jobs", "create", "--name", "x"]).is_err());
        let cli = Cli::try_parse_from(["relayctl", "jobs", "create", "-F", "job.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Jobs(JobsArgs {
                command: JobsCommand::Create { from_file: Some(_), .. }
            })
        ));
    }
}
