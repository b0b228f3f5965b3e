// ── Persisted job and feed entities ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::id::{FeedId, JobId};

/// A configured relay job: one upstream data type polled from one or more
/// feeds and forwarded to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Job type identifier (`adsb`, `ais`, ...).
    pub kind: String,
    pub name: String,
    pub enabled: bool,
    /// Running flag as last persisted by the backend. Only meaningful when
    /// no live status is available.
    pub running: bool,
    /// Seconds until emitted events go stale downstream.
    pub stale_after_secs: u32,
    /// Altitude band filter; `0` disables the bound.
    pub altitude_ceiling: i64,
    pub altitude_floor: i64,
    /// Field used to derive stable event identifiers.
    pub uid_key: String,
    pub geo_bounds: Option<GeoBounds>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub feeds: Vec<Feed>,
}

impl Job {
    pub fn enabled_feed_count(&self) -> usize {
        self.feeds.iter().filter(|f| f.enabled).count()
    }
}

/// Geographic bounding-box filter. Only present when all four edges are set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// How a feed queries its upstream.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FeedEndpoint {
    /// Bounding box query.
    #[default]
    Geo,
    /// Point plus radius query.
    Point,
    /// Military traffic only.
    Mil,
}

/// One upstream data source attached to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: FeedId,
    pub job_id: JobId,
    pub name: String,
    pub base_url: String,
    pub endpoint: FeedEndpoint,
    pub poll_interval_secs: u32,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub distance: Option<f64>,
    pub enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// A job type the backend knows how to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobType {
    pub kind: String,
    pub display_name: String,
    pub description: String,
}

/// A well-known feed that can be attached to a job with one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedTemplate {
    pub name: String,
    pub base_url: String,
    pub endpoint: FeedEndpoint,
    pub poll_interval_secs: Option<u32>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub distance: Option<f64>,
}
