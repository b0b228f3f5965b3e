//! Shared configuration for the relay console.
//!
//! TOML profiles layered with `RELAY_`-prefixed environment variables, and
//! translation to `relay_core::ConsoleConfig`. The CLI adds flag-aware
//! overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use relay_core::{ConsoleConfig, TlsVerification};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "RELAYCTL_CONFIG";

/// Prefix for environment overrides. Nested keys use `__`, e.g.
/// `RELAY_DEFAULTS__TIMEOUT=10`.
pub const ENV_PREFIX: &str = "RELAY_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// REST timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Job catalog refresh interval in seconds; 0 disables.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Status channel idle timeout in seconds.
    #[serde(default)]
    pub idle_timeout: Option<u64>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            refresh_interval: default_refresh_interval(),
            idle_timeout: None,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_refresh_interval() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "http://localhost:8000").
    pub url: String,

    /// Explicit status channel URL; derived from `url` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_url: Option<String>,

    /// Path to custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Override refresh interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u64>,

    /// Override idle timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<u64>,
}

impl Profile {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status_url: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            refresh_interval: None,
            idle_timeout: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$RELAYCTL_CONFIG`, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("org", "relay-console", "relayctl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("relayctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path` (missing file is fine) + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile resolution ──────────────────────────────────────────────

/// Pick the profile to use: the explicit name, else `default_profile`,
/// else `"default"`.
pub fn select_profile<'a>(
    cfg: &'a Config,
    name: Option<&str>,
) -> Result<(String, &'a Profile), ConfigError> {
    let name = name
        .map(str::to_owned)
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into());

    cfg.profiles
        .get(&name)
        .map(|profile| (name.clone(), profile))
        .ok_or(ConfigError::UnknownProfile { name })
}

/// Build a `ConsoleConfig` from a profile and global defaults.
pub fn profile_to_console_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ConsoleConfig, ConfigError> {
    let base_url = parse_url("url", &profile.url)?;
    let status_url = profile
        .status_url
        .as_deref()
        .map(|raw| parse_url("status_url", raw))
        .transpose()?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = ConsoleConfig::new(base_url);
    config.status_url = status_url;
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.refresh_interval_secs = profile.refresh_interval.unwrap_or(defaults.refresh_interval);
    config.idle_timeout = profile
        .idle_timeout
        .or(defaults.idle_timeout)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);
    Ok(config)
}

/// Select a profile and translate it in one step.
pub fn resolve_profile(
    cfg: &Config,
    name: Option<&str>,
) -> Result<(String, ConsoleConfig), ConfigError> {
    let (name, profile) = select_profile(cfg, name)?;
    let config = profile_to_console_config(profile, &cfg.defaults)?;
    Ok((name, config))
}

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
default_profile = "ops"

[defaults]
output = "json"
timeout = 12

[profiles.ops]
url = "https://relay.example:8443"
ca_cert = "/etc/relay/ca.pem"
idle_timeout = 90

[profiles.lab]
url = "http://10.0.0.5:8000"
insecure = true
refresh_interval = 0
"#;

    fn sample() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let cfg = load_config_from(&path).unwrap();
        (dir, cfg)
    }

    #[test]
    fn file_values_layer_over_defaults() {
        let (_dir, cfg) = sample();
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.timeout, 12);
        // Untouched keys keep their defaults
        assert_eq!(cfg.defaults.color, "auto");
        assert_eq!(cfg.defaults.refresh_interval, 30);
        assert_eq!(cfg.profiles.len(), 2);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn default_profile_is_used_when_unnamed() {
        let (_dir, cfg) = sample();
        let (name, console) = resolve_profile(&cfg, None).unwrap();
        assert_eq!(name, "ops");
        assert_eq!(console.base_url.as_str(), "https://relay.example:8443/");
        assert_eq!(
            console.tls,
            TlsVerification::CustomCa(PathBuf::from("/etc/relay/ca.pem"))
        );
        assert_eq!(console.timeout, Duration::from_secs(12));
        assert_eq!(console.idle_timeout, Some(Duration::from_secs(90)));
        assert_eq!(
            console.status_url().unwrap().as_str(),
            "wss://relay.example:8443/api/v1/ws/status"
        );
    }

    #[test]
    fn profile_overrides_win() {
        let (_dir, cfg) = sample();
        let (_, console) = resolve_profile(&cfg, Some("lab")).unwrap();
        assert_eq!(console.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(console.refresh_interval_secs, 0);
        assert_eq!(console.idle_timeout, None);
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let (_dir, cfg) = sample();
        let err = resolve_profile(&cfg, Some("prod")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { name } if name == "prod"));
    }

    #[test]
    fn invalid_url_is_a_validation_error() {
        let profile = Profile::new("not a url");
        let err = profile_to_console_config(&profile, &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "url"));
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles
            .insert("default".into(), Profile::new("http://localhost:8000"));
        save_config_to(&cfg, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[profiles.default]"));
        assert!(!written.contains("status_url"));

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles, cfg.profiles);
    }
}
