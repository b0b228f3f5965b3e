// ── Runtime connection configuration ──
//
// These types describe *how* to reach a relay backend. They never touch
// disk: the CLI builds a `ConsoleConfig` from its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use relay_api::{TlsMode, TransportConfig};
use url::Url;

use crate::error::CoreError;

const STATUS_PATH: [&str; 4] = ["api", "v1", "ws", "status"];

/// TLS verification strategy for REST calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed backends).
    DangerAcceptInvalid,
}

/// Configuration for one relay backend.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Backend base URL (e.g., `http://localhost:8000`).
    pub base_url: Url,
    /// Explicit status channel URL. Derived from `base_url` when unset.
    pub status_url: Option<Url>,
    pub tls: TlsVerification,
    /// REST request timeout.
    pub timeout: Duration,
    /// How often to re-list persisted jobs (seconds). 0 = never.
    pub refresh_interval_secs: u64,
    /// Treat the status channel as dead after this long without a frame.
    pub idle_timeout: Option<Duration>,
}

impl ConsoleConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            status_url: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            refresh_interval_secs: 30,
            idle_timeout: None,
        }
    }

    /// The status channel endpoint: `ws(s)://{base}/api/v1/ws/status`,
    /// with `http` mapped to `ws` and `https` to `wss`.
    pub fn status_url(&self) -> Result<Url, CoreError> {
        if let Some(url) = &self.status_url {
            return Ok(url.clone());
        }

        let scheme = match self.base_url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(CoreError::Config {
                    message: format!("unsupported URL scheme for status channel: {other}"),
                });
            }
        };

        let invalid = || CoreError::Config {
            message: format!("cannot derive a status URL from {}", self.base_url),
        };
        let mut url = self.base_url.clone();
        url.set_scheme(scheme).map_err(|()| invalid())?;
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(STATUS_PATH);
        Ok(url)
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(base: &str) -> ConsoleConfig {
        ConsoleConfig::new(Url::parse(base).unwrap())
    }

    #[test]
    fn status_url_maps_scheme_and_appends_path() {
        assert_eq!(
            config("http://localhost:8000").status_url().unwrap().as_str(),
            "ws://localhost:8000/api/v1/ws/status"
        );
        assert_eq!(
            config("https://ops.example/relay/")
                .status_url()
                .unwrap()
                .as_str(),
            "wss://ops.example/relay/api/v1/ws/status"
        );
    }

    #[test]
    fn status_url_keeps_query_and_drops_fragment() {
        assert_eq!(
            config("https://ops.example/relay?token=abc#top")
                .status_url()
                .unwrap()
                .as_str(),
            "wss://ops.example/relay/api/v1/ws/status?token=abc"
        );
    }

    #[test]
    fn explicit_status_url_wins() {
        let mut cfg = config("http://localhost:8000");
        cfg.status_url = Some(Url::parse("ws://other:9000/feed").unwrap());
        assert_eq!(cfg.status_url().unwrap().as_str(), "ws://other:9000/feed");
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let err = config("ftp://files.example").status_url().unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }
}
