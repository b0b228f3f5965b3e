// ── Persisted job catalog ──
//
// Jobs as last fetched from the REST API. Concurrent lookups go through
// `DashMap`; subscribers get an id-ordered snapshot via `watch`. Nothing
// on the push channel ever writes here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::{Job, JobId};

pub type JobList = Arc<Vec<Arc<Job>>>;

pub struct JobCatalog {
    by_id: DashMap<JobId, Arc<Job>>,
    snapshot: watch::Sender<JobList>,
    last_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl JobCatalog {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        let (last_refresh, _) = watch::channel(None);

        Self {
            by_id: DashMap::new(),
            snapshot,
            last_refresh,
        }
    }

    /// Replace the whole catalog with a fresh listing.
    pub fn replace_all(&self, jobs: Vec<Job>) {
        self.by_id.clear();
        for job in jobs {
            self.by_id.insert(job.id, Arc::new(job));
        }
        self.rebuild_snapshot();
        self.last_refresh.send_replace(Some(Utc::now()));
    }

    /// Insert or update one job. Returns `true` if the id was new.
    pub fn upsert(&self, job: Job) -> bool {
        let is_new = self.by_id.insert(job.id, Arc::new(job)).is_none();
        self.rebuild_snapshot();
        is_new
    }

    /// Remove a job. Returns it if it existed.
    pub fn remove(&self, id: JobId) -> Option<Arc<Job>> {
        let removed = self.by_id.remove(&id).map(|(_, job)| job);
        if removed.is_some() {
            self.rebuild_snapshot();
        }
        removed
    }

    pub fn get(&self, id: JobId) -> Option<Arc<Job>> {
        self.by_id.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// All jobs ordered by id (cheap `Arc` clone).
    pub fn snapshot(&self) -> JobList {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobList> {
        self.snapshot.subscribe()
    }

    /// When the catalog was last replaced from a full listing.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.borrow()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn rebuild_snapshot(&self) {
        let mut jobs: Vec<Arc<Job>> = self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        jobs.sort_by_key(|job| job.id);
        self.snapshot.send_replace(Arc::new(jobs));
    }
}

impl Default for JobCatalog {
    fn default() -> Self {
        Self::new()
    }
}
