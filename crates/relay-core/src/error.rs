// ── Core error types ──
//
// User-facing errors from relay-core. Consumers never see reqwest or
// tungstenite errors directly: `From<relay_api::Error>` translates
// transport-layer failures into domain variants.

use thiserror::Error;

use crate::model::{FeedId, JobId};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach relay backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Relay backend request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("No status snapshot received within {waited_secs}s")]
    NoSnapshot { waited_secs: u64 },

    #[error("Console has been shut down")]
    ShutDown,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Job not found: {id}")]
    JobNotFound { id: JobId },

    #[error("Feed {feed_id} not found on job {job_id}")]
    FeedNotFound { job_id: JobId, feed_id: FeedId },

    #[error("Entity not found: {entity_type} {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation rejected by backend: {message}")]
    Rejected { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<relay_api::Error> for CoreError {
    fn from(err: relay_api::Error) -> Self {
        match err {
            relay_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            relay_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            relay_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            relay_api::Error::Api { status: 404, message } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: message,
            },
            relay_api::Error::Api { status: 409, message } => CoreError::Rejected { message },
            relay_api::Error::Api { status: 422, message } => {
                CoreError::ValidationFailed { message }
            }
            relay_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            relay_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            relay_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("Status channel failed: {reason}"),
            },
            relay_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("Status channel closed (code {code}): {reason}"),
            },
            relay_api::Error::IdleTimeout { idle_secs } => CoreError::Timeout {
                timeout_secs: idle_secs,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_status_codes_map_to_domain_variants() {
        let not_found: CoreError = relay_api::Error::Api {
            status: 404,
            message: "Enablement not found".into(),
        }
        .into();
        assert!(matches!(not_found, CoreError::NotFound { .. }));

        let invalid: CoreError = relay_api::Error::Api {
            status: 422,
            message: "name: field required".into(),
        }
        .into();
        assert!(
            matches!(invalid, CoreError::ValidationFailed { message } if message == "name: field required")
        );

        let other: CoreError = relay_api::Error::Api {
            status: 500,
            message: "boom".into(),
        }
        .into();
        assert!(matches!(other, CoreError::Api { status: Some(500), .. }));
    }
}
