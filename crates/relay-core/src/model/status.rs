// ── Live status snapshot ──
//
// A snapshot is the complete operational picture at one server instant.
// Jobs missing from a snapshot are not running; there is no delta
// encoding.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::id::JobId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub broker_connected: bool,
    pub broker_endpoint: String,
    pub outbound_queue_depth: u64,
    pub last_connect_error: Option<String>,
    /// Unique by id, in server order.
    pub jobs: Vec<JobStatus>,
    pub server_time: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn job(&self, id: JobId) -> Option<&JobStatus> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn running_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.running).count()
    }
}

/// Live state of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: JobId,
    pub display_name: String,
    pub kind: String,
    pub running: bool,
    pub events_emitted: u64,
    pub last_poll_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub active_entity_count: u64,
    /// Keyed by feed name, in server order.
    pub per_feed_stats: IndexMap<String, FeedStat>,
}

/// Per-feed live statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedStat {
    pub last_poll_time: Option<DateTime<Utc>>,
    /// Feed-specific counters such as `aircraft_count`.
    pub counters: IndexMap<String, u64>,
}

impl FeedStat {
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.counters.get(name).copied()
    }
}
