// Relay backend wire types
//
// Request/response bodies for the REST configuration endpoints and the
// raw shape of one status-channel frame. Field names follow the backend's
// JSON exactly; `relay-core` converts them into domain types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ── Broker (TAK server) configuration ────────────────────────────────

/// Persisted broker connection settings from `GET /tak/config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakConfigResponse {
    pub id: i64,
    pub cot_url: String,
    #[serde(default)]
    pub cert_path: Option<String>,
    pub cot_host_id: String,
    #[serde(default)]
    pub dont_check_hostname: bool,
    #[serde(default)]
    pub dont_verify: bool,
    pub max_out_queue: u32,
    pub max_in_queue: u32,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Partial update body for `PUT /tak/config`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TakConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cot_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cot_host_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dont_check_hostname: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dont_verify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_out_queue: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_in_queue: Option<u32>,
}

/// Point-in-time broker status from `GET /tak/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakStatusResponse {
    pub connected: bool,
    pub url: String,
    pub queue_size: u64,
}

// ── Enablements (jobs) ───────────────────────────────────────────────

/// One entry of `GET /enablement-types`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnablementTypeInfo {
    pub type_id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

/// Feed endpoint flavor: bounding box, point + radius, or military-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceEndpoint {
    #[default]
    Geo,
    Point,
    Mil,
}

/// A persisted feed (source) attached to an enablement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResponse {
    pub id: i64,
    pub enablement_id: i64,
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub endpoint: SourceEndpoint,
    pub sleep_interval: u32,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    pub enabled: bool,
    pub created_at: String,
}

/// A persisted enablement with its nested sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnablementResponse {
    pub id: i64,
    pub type_id: String,
    pub name: String,
    pub enabled: bool,
    pub cot_stale: u32,
    pub alt_upper: i64,
    pub alt_lower: i64,
    pub uid_key: String,
    #[serde(default)]
    pub geo_filter_min_lat: Option<f64>,
    #[serde(default)]
    pub geo_filter_max_lat: Option<f64>,
    #[serde(default)]
    pub geo_filter_min_lon: Option<f64>,
    #[serde(default)]
    pub geo_filter_max_lon: Option<f64>,
    #[serde(default)]
    pub running: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub sources: Vec<SourceResponse>,
}

/// Body for `POST /enablements`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnablementCreate {
    pub type_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cot_stale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_upper: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_lower: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_filter_min_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_filter_max_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_filter_min_lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_filter_max_lon: Option<f64>,
}

/// Body for `PUT /enablements/{id}`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnablementUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cot_stale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_upper: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_lower: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_filter_min_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_filter_max_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_filter_min_lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_filter_max_lon: Option<f64>,
}

/// Body for `POST /enablements/{id}/sources`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCreate {
    pub name: String,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<SourceEndpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Body for `PUT /enablements/{id}/sources/{sid}`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<SourceEndpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// A feed template from `GET /enablements/{id}/known-sources`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownSource {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub endpoint: SourceEndpoint,
    #[serde(default)]
    pub sleep_interval: Option<u32>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
}

// ── Error bodies ─────────────────────────────────────────────────────

/// Error payload: `{"detail": "..."}` or `{"detail": [ {loc, msg, type} ]}`.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Validation(Vec<ValidationErrorItem>),
}

#[derive(Debug, Deserialize)]
pub struct ValidationErrorItem {
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
}

impl ErrorDetail {
    /// Flatten the detail into one human-readable line.
    pub fn message(&self) -> String {
        match self {
            Self::Message(msg) => msg.clone(),
            Self::Validation(items) => items
                .iter()
                .map(|item| {
                    let loc: Vec<String> = item
                        .loc
                        .iter()
                        .map(|part| match part {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect();
                    if loc.is_empty() {
                        item.msg.clone()
                    } else {
                        format!("{}: {}", loc.join("."), item.msg)
                    }
                })
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

// ── Status channel frame ─────────────────────────────────────────────

/// One status frame as pushed by the backend on `/ws/status`.
///
/// Timestamps are kept as strings here; the core decoder parses and
/// validates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusFrame {
    pub tak_connected: bool,
    pub tak_url: String,
    pub tx_queue_size: u64,
    #[serde(default)]
    pub connect_error: Option<String>,
    pub enablements: Vec<EnablementStatusItem>,
    pub server_time: String,
}

/// Live state of one enablement inside a [`StatusFrame`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnablementStatusItem {
    pub id: i64,
    pub name: String,
    pub type_id: String,
    pub running: bool,
    pub events_sent: u64,
    #[serde(default)]
    pub last_poll_time: Option<String>,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub active_items: u64,
    #[serde(default)]
    pub source_stats: IndexMap<String, SourceStat>,
}

/// Per-feed statistics. Everything besides `last_poll` is a
/// feed-specific counter (`aircraft_count`, `vessel_count`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStat {
    #[serde(default)]
    pub last_poll: Option<String>,
    #[serde(flatten)]
    pub counters: IndexMap<String, serde_json::Value>,
}
