// ── Reconciliation view ──
//
// Pure functions that overlay live status onto persisted records. Nothing
// here holds state: callers pass the current snapshot, the channel state
// and the job listing on every read, so a view can never outlive the
// snapshot it was derived from.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use strum::Display;

use crate::feed::ConnectionState;
use crate::model::{FeedEndpoint, FeedId, FeedStat, Job, JobId, JobStatus, StatusSnapshot};
use crate::store::Published;

/// Where a view's live fields came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    /// Channel open and the job is in a snapshot that channel delivered.
    Live,
    /// Showing the last values received before the channel dropped, or
    /// values from an earlier channel the reopened one has not replaced yet.
    Stale,
    /// Channel open and the snapshot omits the job: it is not running.
    Absent,
    /// No live data; `running` is the last persisted flag.
    Persisted,
}

/// One job as the console renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
    pub id: JobId,
    pub name: String,
    pub kind: String,
    pub enabled: bool,
    pub running: bool,
    pub liveness: Liveness,
    pub events_emitted: u64,
    pub active_entity_count: u64,
    pub last_poll_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub feeds: Vec<FeedView>,
}

/// One persisted feed with its live statistics, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedView {
    pub id: FeedId,
    pub name: String,
    pub endpoint: FeedEndpoint,
    pub enabled: bool,
    pub poll_interval_secs: u32,
    pub last_poll_time: Option<DateTime<Utc>>,
    pub counters: IndexMap<String, u64>,
}

/// Broker connectivity as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokerView {
    pub connected: bool,
    pub endpoint: Option<String>,
    pub queue_depth: u64,
    pub last_error: Option<String>,
    pub liveness: Liveness,
}

/// Everything a status screen needs, derived in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsoleView {
    pub connection: ConnectionState,
    /// `true` only while the channel is open and the snapshot came from it.
    pub live: bool,
    pub server_time: Option<DateTime<Utc>>,
    /// Local time the snapshot was received.
    pub last_frame_at: Option<DateTime<Utc>>,
    /// Local time the persisted job listing was last fetched.
    pub catalog_refreshed_at: Option<DateTime<Utc>>,
    pub broker: BrokerView,
    pub jobs: Vec<JobView>,
    /// Jobs the backend reports that the persisted listing does not know
    /// about yet. A non-empty list means the catalog should be refreshed.
    pub unlisted_live_jobs: Vec<JobId>,
}

// ── Derivation ───────────────────────────────────────────────────────

/// Overlay live status onto one persisted job. `current` says whether the
/// snapshot was delivered by the channel that is open right now.
pub fn reconcile_job(snapshot: Option<&StatusSnapshot>, current: bool, job: &Job) -> JobView {
    let status = snapshot.and_then(|s| s.job(job.id));

    let liveness = match (snapshot, status) {
        (Some(_), Some(_)) if current => Liveness::Live,
        (Some(_), Some(_)) => Liveness::Stale,
        (Some(_), None) if current => Liveness::Absent,
        _ => Liveness::Persisted,
    };

    match (liveness, status) {
        (Liveness::Live | Liveness::Stale, Some(status)) => live_view(job, status, liveness),
        (Liveness::Absent, _) => idle_view(job, false, liveness),
        _ => idle_view(job, job.running, Liveness::Persisted),
    }
}

/// Reconcile every persisted job, in listing order.
pub fn reconcile_jobs(
    snapshot: Option<&StatusSnapshot>,
    current: bool,
    jobs: &[impl AsRef<Job>],
) -> Vec<JobView> {
    jobs.iter()
        .map(|job| reconcile_job(snapshot, current, job.as_ref()))
        .collect()
}

/// Broker state from the snapshot, or "unknown" when there is none.
pub fn reconcile_broker(snapshot: Option<&StatusSnapshot>, current: bool) -> BrokerView {
    match snapshot {
        Some(s) => BrokerView {
            connected: s.broker_connected,
            endpoint: Some(s.broker_endpoint.clone()).filter(|e| !e.is_empty()),
            queue_depth: s.outbound_queue_depth,
            last_error: s.last_connect_error.clone(),
            liveness: if current {
                Liveness::Live
            } else {
                Liveness::Stale
            },
        },
        None => BrokerView {
            connected: false,
            endpoint: None,
            queue_depth: 0,
            last_error: None,
            liveness: Liveness::Persisted,
        },
    }
}

/// Ids present in the snapshot but missing from the persisted listing.
pub fn unlisted_live_jobs(snapshot: Option<&StatusSnapshot>, jobs: &[impl AsRef<Job>]) -> Vec<JobId> {
    let Some(snapshot) = snapshot else {
        return Vec::new();
    };
    let known: HashSet<JobId> = jobs.iter().map(|j| j.as_ref().id).collect();
    snapshot
        .jobs
        .iter()
        .map(|s| s.id)
        .filter(|id| !known.contains(id))
        .collect()
}

/// Derive the full console view.
pub fn reconcile(
    published: Option<&Published>,
    connection: &ConnectionState,
    jobs: &[impl AsRef<Job>],
) -> ConsoleView {
    let snapshot = published.map(|p| p.snapshot.as_ref());
    let current = published.is_some_and(|p| p.is_current(connection));
    ConsoleView {
        connection: *connection,
        live: current,
        server_time: snapshot.map(|s| s.server_time),
        last_frame_at: published.map(|p| p.received_at),
        catalog_refreshed_at: None,
        broker: reconcile_broker(snapshot, current),
        jobs: reconcile_jobs(snapshot, current, jobs),
        unlisted_live_jobs: unlisted_live_jobs(snapshot, jobs),
    }
}

// ── Private helpers ──────────────────────────────────────────────────

fn live_view(job: &Job, status: &JobStatus, liveness: Liveness) -> JobView {
    JobView {
        id: job.id,
        name: job.name.clone(),
        kind: job.kind.clone(),
        enabled: job.enabled,
        running: status.running,
        liveness,
        events_emitted: status.events_emitted,
        active_entity_count: status.active_entity_count,
        last_poll_time: status.last_poll_time,
        last_error: status.last_error.clone(),
        feeds: feed_views(job, Some(status)),
    }
}

fn idle_view(job: &Job, running: bool, liveness: Liveness) -> JobView {
    JobView {
        id: job.id,
        name: job.name.clone(),
        kind: job.kind.clone(),
        enabled: job.enabled,
        running,
        liveness,
        events_emitted: 0,
        active_entity_count: 0,
        last_poll_time: None,
        last_error: None,
        feeds: feed_views(job, None),
    }
}

fn feed_views(job: &Job, status: Option<&JobStatus>) -> Vec<FeedView> {
    job.feeds
        .iter()
        .map(|feed| {
            let stat: Option<&FeedStat> = status.and_then(|s| s.per_feed_stats.get(&feed.name));
            FeedView {
                id: feed.id,
                name: feed.name.clone(),
                endpoint: feed.endpoint,
                enabled: feed.enabled,
                poll_interval_secs: feed.poll_interval_secs,
                last_poll_time: stat.and_then(|s| s.last_poll_time),
                counters: stat.map(|s| s.counters.clone()).unwrap_or_default(),
            }
        })
        .collect()
}
