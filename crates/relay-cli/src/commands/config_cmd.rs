//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::{Confirm, Input};
use serde::Serialize;
use tabled::Tabled;

use relay_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::available_profiles;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn validate_url(raw: &str) -> Result<(), CliError> {
    let url: url::Url = raw.parse().map_err(|e| CliError::Validation {
        field: "url".into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(CliError::Validation {
            field: "url".into(),
            reason: format!("expected an http or https URL, got scheme '{other}'"),
        }),
    }
}

#[derive(Serialize)]
struct ProfileEntry {
    name: String,
    url: String,
    default: bool,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(
                &relay_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = relay_config::load_config()?;
            let out = match global.format() {
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)?,
                OutputFormat::Json => output::render_json(&cfg, false)?,
                OutputFormat::JsonCompact => output::render_json(&cfg, true)?,
                OutputFormat::Yaml => output::render_yaml(&cfg)?,
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init {
            name,
            backend,
            default,
        } => init(name, backend, default, global),

        ConfigCommand::Profiles => {
            let cfg = relay_config::load_config()?;
            let entries: Vec<ProfileEntry> = cfg
                .profiles
                .iter()
                .map(|(name, profile)| ProfileEntry {
                    name: name.clone(),
                    url: profile.url.clone(),
                    default: cfg.default_profile.as_deref() == Some(name.as_str()),
                })
                .collect();
            let out = output::render_list(
                global.format(),
                &entries,
                |e| ProfileRow {
                    marker: if e.default { "*" } else { "" },
                    name: e.name.clone(),
                    url: e.url.clone(),
                },
                |e| e.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = relay_config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            relay_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }
    }
}

// ── Init ────────────────────────────────────────────────────────────

/// Add or replace one profile. Values missing from the flags are prompted
/// for when stdin is a terminal.
fn init(
    name: Option<String>,
    backend: Option<String>,
    make_default: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let interactive = std::io::stdin().is_terminal();
    let config_path = relay_config::config_path();
    let mut cfg: Config = relay_config::load_config().unwrap_or_default();

    if interactive && (name.is_none() || backend.is_none()) && !global.quiet {
        eprintln!("relayctl configuration");
        eprintln!("   Config path: {}\n", config_path.display());
    }

    let name = match name {
        Some(name) => name,
        None if interactive => Input::new()
            .with_prompt("Profile name")
            .default("default".into())
            .interact_text()
            .map_err(prompt_err)?,
        None => "default".into(),
    };

    let url = match backend {
        Some(url) => url,
        None if interactive => Input::new()
            .with_prompt("Backend URL")
            .default("http://localhost:8000".into())
            .interact_text()
            .map_err(prompt_err)?,
        None => {
            return Err(CliError::Validation {
                field: "backend".into(),
                reason: "pass --backend <URL> when not running interactively".into(),
            });
        }
    };
    validate_url(&url)?;

    let insecure = if global.insecure {
        true
    } else if interactive && url.starts_with("https") {
        Confirm::new()
            .with_prompt("Accept self-signed certificates?")
            .default(false)
            .interact()
            .map_err(prompt_err)?
    } else {
        false
    };

    let mut profile = cfg
        .profiles
        .remove(&name)
        .unwrap_or_else(|| Profile::new(url.clone()));
    profile.url = url;
    profile.insecure = insecure.then_some(true);
    cfg.profiles.insert(name.clone(), profile);

    let default_missing = cfg
        .default_profile
        .as_ref()
        .is_none_or(|d| !cfg.profiles.contains_key(d));
    if make_default || default_missing {
        cfg.default_profile = Some(name.clone());
    }

    let path = relay_config::save_config(&cfg)?;
    if !global.quiet {
        eprintln!("Profile '{name}' saved to {}", path.display());
    }
    Ok(())
}
