// ── Create / update payloads ──
//
// Domain-named request bodies for the write commands. Optional fields left
// unset are not sent, so the backend keeps (or defaults) them. All of these
// deserialize from JSON so the CLI can accept `--from-file` payloads.

use serde::{Deserialize, Serialize};

use crate::model::{FeedEndpoint, GeoBounds};

/// A new job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateJobRequest {
    /// Job type identifier, one of `jobs types`.
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_after_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_ceiling: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_floor: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_bounds: Option<GeoBounds>,
}

/// Partial update of an existing job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateJobRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_after_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_ceiling: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_floor: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_bounds: Option<GeoBounds>,
}

impl UpdateJobRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A new feed under an existing job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateFeedRequest {
    pub name: String,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<FeedEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Partial update of an existing feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateFeedRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<FeedEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl UpdateFeedRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Partial update of the broker connection settings. Takes effect on the
/// next broker connect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBrokerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_hostname_check: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_verify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_out_queue: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_in_queue: Option<u32>,
}

impl UpdateBrokerRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
