//! Flag-aware configuration: layers `--url`, `--insecure`, `--timeout` and
//! friends over the profile loaded by `relay_config`.
//!
//! This is the single boundary where CLI options cross into core types.

use relay_config::{Config, Profile};
use relay_core::ConsoleConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Fill `--output` and `--color` from `[defaults]` when not given.
pub fn apply_defaults(global: &mut GlobalOpts, cfg: &Config) {
    use clap::ValueEnum;

    if global.output.is_none() {
        global.output = OutputFormat::from_str(&cfg.defaults.output, true).ok();
    }
    if global.color.is_none() {
        global.color = ColorMode::from_str(&cfg.defaults.color, true).ok();
    }
}

/// Build a `ConsoleConfig` from the config file, profile, and CLI overrides.
///
/// With a matching profile, flags override its values. Without one,
/// `--url` alone is enough; an explicit `--profile` that does not exist is
/// an error.
pub fn build_console_config(cfg: &Config, global: &GlobalOpts) -> Result<ConsoleConfig, CliError> {
    let name = active_profile_name(global, cfg);

    let profile = match (cfg.profiles.get(&name), global.url.as_deref()) {
        (Some(profile), _) => apply_overrides(profile.clone(), global),
        (None, Some(url)) if global.profile.is_none() => {
            apply_overrides(Profile::new(url), global)
        }
        (None, _) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name,
                available: available_profiles(cfg),
            });
        }
        (None, _) => {
            return Err(CliError::NoConfig {
                path: relay_config::config_path().display().to_string(),
            });
        }
    };

    tracing::debug!(profile = %name, url = %profile.url, "resolved backend");
    Ok(relay_config::profile_to_console_config(
        &profile,
        &cfg.defaults,
    )?)
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref url) = global.url {
        profile.url.clone_from(url);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    profile
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use clap::Parser;
    use relay_core::TlsVerification;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["relayctl"];
        argv.extend_from_slice(args);
        argv.push("status");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with_lab() -> Config {
        let mut cfg = Config::default();
        let mut lab = Profile::new("http://10.0.0.5:8000");
        lab.timeout = Some(12);
        cfg.profiles.insert("lab".into(), lab);
        cfg.default_profile = Some("lab".into());
        cfg
    }

    #[test]
    fn flags_override_profile() {
        let cfg = config_with_lab();
        let console = build_console_config(
            &cfg,
            &global(&["-k", "--timeout", "3", "-u", "https://relay.example"]),
        )
        .unwrap();

        assert_eq!(console.base_url.as_str(), "https://relay.example/");
        assert_eq!(console.timeout, Duration::from_secs(3));
        assert!(matches!(console.tls, TlsVerification::DangerAcceptInvalid));
    }

    #[test]
    fn profile_values_apply_without_flags() {
        let cfg = config_with_lab();
        let console = build_console_config(&cfg, &global(&[])).unwrap();
        assert_eq!(console.base_url.as_str(), "http://10.0.0.5:8000/");
        assert_eq!(console.timeout, Duration::from_secs(12));
    }

    #[test]
    fn url_flag_works_without_any_profile() {
        let console =
            build_console_config(&Config::default(), &global(&["-u", "http://localhost:8000"]))
                .unwrap();
        assert_eq!(console.base_url.as_str(), "http://localhost:8000/");
    }

    #[test]
    fn missing_profile_and_url_is_reported() {
        let err = build_console_config(&Config::default(), &global(&[])).unwrap_err();
        assert!(matches!(err, CliError::NoConfig { .. }));

        let err = build_console_config(&config_with_lab(), &global(&["-p", "prod"])).unwrap_err();
        assert!(matches!(
            err,
            CliError::ProfileNotFound { ref available, .. } if available == "lab"
        ));
    }

    #[test]
    fn defaults_fill_output_and_color() {
        let mut cfg = Config::default();
        cfg.defaults.output = "yaml".into();
        cfg.defaults.color = "never".into();

        let mut opts = global(&[]);
        apply_defaults(&mut opts, &cfg);
        assert_eq!(opts.format(), OutputFormat::Yaml);
        assert_eq!(opts.color_mode(), ColorMode::Never);

        let mut opts = global(&["-o", "json"]);
        apply_defaults(&mut opts, &cfg);
        assert_eq!(opts.format(), OutputFormat::Json);
    }
}
