// ── Broker (TAK server) entities ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerSettings {
    /// Broker endpoint, e.g. `tls://tak.example:8089`.
    pub endpoint: String,
    pub client_cert_path: Option<String>,
    pub host_id: String,
    pub skip_hostname_check: bool,
    pub skip_verify: bool,
    pub max_out_queue: u32,
    pub max_in_queue: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One-shot broker status from the REST API. The live equivalent arrives
/// inside every `StatusSnapshot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerStatus {
    pub connected: bool,
    pub endpoint: String,
    pub queue_depth: u64,
}
