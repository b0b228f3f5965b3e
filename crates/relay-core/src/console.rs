// ── Console lifecycle ──
//
// Ties the pieces together: the REST client, the job catalog, the status
// store and the feed task. Cheap to clone; every clone shares one state.

use std::sync::Arc;
use std::time::Duration;

use relay_api::{Connector, RelayClient, WsConnector};
use relay_api::models::{EnablementUpdate, SourceUpdate};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandResult};
use crate::config::ConsoleConfig;
use crate::error::CoreError;
use crate::feed::{ConnectionState, FeedHandle};
use crate::model::{
    BrokerSettings, BrokerStatus, Feed, FeedId, FeedTemplate, Job, JobId, JobType,
    StatusSnapshot,
};
use crate::reconcile::{self, ConsoleView, JobView};
use crate::store::{JobCatalog, JobList, StatusStore, Subscription};

/// The main entry point for consumers.
///
/// [`new`](Self::new) only builds the REST client. [`start`](Self::start)
/// loads the job catalog and spawns the status feed and, if configured,
/// a periodic catalog refresh. [`shutdown`](Self::shutdown) stops both.
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

struct ConsoleInner {
    config: ConsoleConfig,
    client: RelayClient,
    status: Arc<StatusStore>,
    catalog: Arc<JobCatalog>,
    cancel: CancellationToken,
    feed: Mutex<Option<FeedHandle>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Console {
    pub fn new(config: ConsoleConfig) -> Result<Self, CoreError> {
        let client = RelayClient::new(config.base_url.clone(), &config.transport())?;

        Ok(Self {
            inner: Arc::new(ConsoleInner {
                config,
                client,
                status: Arc::new(StatusStore::new()),
                catalog: Arc::new(JobCatalog::new()),
                cancel: CancellationToken::new(),
                feed: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.inner.config
    }

    pub fn status_store(&self) -> &Arc<StatusStore> {
        &self.inner.status
    }

    pub fn catalog(&self) -> &Arc<JobCatalog> {
        &self.inner.catalog
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Load the catalog and start the status feed over WebSocket.
    pub async fn start(&self) -> Result<(), CoreError> {
        let connector = WsConnector::with_idle_timeout(self.inner.config.idle_timeout);
        self.start_with_connector(connector).await
    }

    /// Like [`start`](Self::start) with a caller-supplied transport.
    ///
    /// A failed initial catalog load is logged, not returned: the live
    /// feed is still useful without it and the refresh task retries.
    pub async fn start_with_connector<C: Connector>(&self, connector: C) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }

        let endpoint = self.inner.config.status_url()?;

        if let Err(e) = self.refresh_jobs().await {
            warn!(error = %e, "initial job listing failed");
        }

        {
            let mut feed = self.inner.feed.lock().await;
            if feed.is_some() {
                debug!("status feed already running");
                return Ok(());
            }
            *feed = Some(FeedHandle::spawn_with_cancel(
                connector,
                endpoint.clone(),
                Arc::clone(&self.inner.status),
                self.inner.cancel.child_token(),
            ));
        }

        let interval_secs = self.inner.config.refresh_interval_secs;
        if interval_secs > 0 {
            let console = self.clone();
            let cancel = self.inner.cancel.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(refresh_task(console, interval_secs, cancel)));
        }

        info!(url = %endpoint, "console started");
        Ok(())
    }

    /// Stop the feed and background tasks and close the status store.
    ///
    /// Idempotent and safe to call from any clone.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let feed = self.inner.feed.lock().await.take();
        if let Some(feed) = feed {
            feed.shutdown_and_join().await;
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task panicked");
            }
        }

        if !self.inner.status.is_closed() {
            self.inner.status.close();
            debug!("console shut down");
        }
    }

    /// One-shot: run a closure against a console that never opens the
    /// status feed. For request/response CLI commands.
    pub async fn oneshot<F, Fut, T>(config: ConsoleConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Console) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let console = Console::new(config)?;
        let result = f(console.clone()).await;
        console.shutdown().await;
        result
    }

    // ── Live status ──────────────────────────────────────────────────

    pub fn subscribe(&self) -> Subscription {
        self.inner.status.subscribe()
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.status.subscribe_connection()
    }

    /// Watch the persisted job listing; changes on every catalog refresh.
    pub fn subscribe_jobs(&self) -> watch::Receiver<JobList> {
        self.inner.catalog.subscribe()
    }

    pub fn is_live(&self) -> bool {
        self.inner.status.is_live()
    }

    /// Wait up to `timeout` for a snapshot, returning the current one at
    /// once if it exists.
    pub async fn wait_for_snapshot(
        &self,
        timeout: Duration,
    ) -> Result<Arc<StatusSnapshot>, CoreError> {
        let mut sub = self.subscribe();
        if let Some(current) = sub.current() {
            return Ok(Arc::clone(current));
        }

        match tokio::time::timeout(timeout, sub.changed()).await {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => Err(CoreError::ShutDown),
            Err(_) => Err(CoreError::NoSnapshot {
                waited_secs: timeout.as_secs(),
            }),
        }
    }

    // ── Reconciled views ─────────────────────────────────────────────

    /// Derive the full console view from the current store contents.
    pub fn view(&self) -> ConsoleView {
        let published = self.inner.status.published();
        let connection = self.inner.status.connection_state();
        let jobs = self.inner.catalog.snapshot();
        let mut view = reconcile::reconcile(published.as_ref(), &connection, jobs.as_slice());
        view.catalog_refreshed_at = self.inner.catalog.last_refresh();
        view
    }

    pub fn job_views(&self) -> Vec<JobView> {
        let (published, current) = self.current_snapshot();
        let jobs = self.inner.catalog.snapshot();
        reconcile::reconcile_jobs(published.as_deref(), current, jobs.as_slice())
    }

    pub fn job_view(&self, id: JobId) -> Option<JobView> {
        let job = self.inner.catalog.get(id)?;
        let (published, current) = self.current_snapshot();
        Some(reconcile::reconcile_job(published.as_deref(), current, &job))
    }

    /// The stored snapshot and whether the open channel delivered it.
    fn current_snapshot(&self) -> (Option<Arc<StatusSnapshot>>, bool) {
        let connection = self.inner.status.connection_state();
        match self.inner.status.published() {
            Some(p) => {
                let current = p.is_current(&connection);
                (Some(p.snapshot), current)
            }
            None => (None, false),
        }
    }

    // ── Persisted reads ──────────────────────────────────────────────

    /// Re-list persisted jobs and replace the catalog.
    pub async fn refresh_jobs(&self) -> Result<(), CoreError> {
        let jobs: Vec<Job> = self
            .inner
            .client
            .list_enablements()
            .await?
            .into_iter()
            .map(Job::from)
            .collect();
        debug!(count = jobs.len(), "job catalog refreshed");
        self.inner.catalog.replace_all(jobs);
        Ok(())
    }

    /// Fetch one job, updating the catalog entry.
    pub async fn fetch_job(&self, id: JobId) -> Result<Job, CoreError> {
        let job = Job::from(
            self.inner
                .client
                .get_enablement(id.get())
                .await
                .map_err(|e| not_found_as_job(e, id))?,
        );
        self.inner.catalog.upsert(job.clone());
        Ok(job)
    }

    pub async fn job_types(&self) -> Result<Vec<JobType>, CoreError> {
        let types = self.inner.client.list_enablement_types().await?;
        Ok(types.into_iter().map(JobType::from).collect())
    }

    pub async fn feeds(&self, job_id: JobId) -> Result<Vec<Feed>, CoreError> {
        let feeds = self
            .inner
            .client
            .list_sources(job_id.get())
            .await
            .map_err(|e| not_found_as_job(e, job_id))?;
        Ok(feeds.into_iter().map(Feed::from).collect())
    }

    pub async fn feed_templates(&self, job_id: JobId) -> Result<Vec<FeedTemplate>, CoreError> {
        let templates = self
            .inner
            .client
            .known_sources(job_id.get())
            .await
            .map_err(|e| not_found_as_job(e, job_id))?;
        Ok(templates.into_iter().map(FeedTemplate::from).collect())
    }

    pub async fn broker_settings(&self) -> Result<BrokerSettings, CoreError> {
        Ok(self.inner.client.tak_config().await?.into())
    }

    pub async fn broker_status(&self) -> Result<BrokerStatus, CoreError> {
        Ok(self.inner.client.tak_status().await?.into())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Execute a write operation.
    ///
    /// Commands that change persisted jobs refresh the catalog afterwards;
    /// a failed refresh is logged and does not fail the command.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        debug!(command = %cmd.describe(), "executing command");
        let refresh = cmd.touches_catalog();
        let result = route_command(self, cmd).await?;

        if refresh {
            if let Err(e) = self.refresh_jobs().await {
                warn!(error = %e, "catalog refresh after command failed");
            }
        }
        Ok(result)
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Periodically re-list persisted jobs.
async fn refresh_task(console: Console, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = console.refresh_jobs().await {
                    warn!(error = %e, "periodic job refresh failed");
                }
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────────

async fn route_command(console: &Console, cmd: Command) -> Result<CommandResult, CoreError> {
    let client = &console.inner.client;

    match cmd {
        // ── Job operations ───────────────────────────────────────────
        Command::CreateJob(req) => {
            let job = client.create_enablement(&req.into()).await?;
            Ok(CommandResult::Job(job.into()))
        }
        Command::UpdateJob { id, update } => {
            let job = client
                .update_enablement(id.get(), &update.into())
                .await
                .map_err(|e| not_found_as_job(e, id))?;
            Ok(CommandResult::Job(job.into()))
        }
        Command::StartJob { id } => {
            client
                .start_enablement(id.get())
                .await
                .map_err(|e| not_found_as_job(e, id))?;
            Ok(CommandResult::Ok)
        }
        Command::StopJob { id } => {
            client
                .stop_enablement(id.get())
                .await
                .map_err(|e| not_found_as_job(e, id))?;
            Ok(CommandResult::Ok)
        }
        Command::DeleteJob { id } => {
            client
                .delete_enablement(id.get())
                .await
                .map_err(|e| not_found_as_job(e, id))?;
            console.inner.catalog.remove(id);
            Ok(CommandResult::Ok)
        }
        Command::SetJobEnabled { id, enabled } => {
            let update = EnablementUpdate {
                enabled: Some(enabled),
                ..Default::default()
            };
            let job = client
                .update_enablement(id.get(), &update)
                .await
                .map_err(|e| not_found_as_job(e, id))?;
            Ok(CommandResult::Job(job.into()))
        }

        // ── Feed operations ──────────────────────────────────────────
        Command::CreateFeed { job_id, feed } => {
            let feed = client
                .create_source(job_id.get(), &feed.into())
                .await
                .map_err(|e| not_found_as_job(e, job_id))?;
            Ok(CommandResult::Feed(feed.into()))
        }
        Command::UpdateFeed {
            job_id,
            feed_id,
            update,
        } => {
            let feed = client
                .update_source(job_id.get(), feed_id.get(), &update.into())
                .await
                .map_err(|e| not_found_as_feed(e, job_id, feed_id))?;
            Ok(CommandResult::Feed(feed.into()))
        }
        Command::SetFeedEnabled {
            job_id,
            feed_id,
            enabled,
        } => {
            let update = SourceUpdate {
                enabled: Some(enabled),
                ..Default::default()
            };
            let feed = client
                .update_source(job_id.get(), feed_id.get(), &update)
                .await
                .map_err(|e| not_found_as_feed(e, job_id, feed_id))?;
            Ok(CommandResult::Feed(feed.into()))
        }
        Command::DeleteFeed { job_id, feed_id } => {
            client
                .delete_source(job_id.get(), feed_id.get())
                .await
                .map_err(|e| not_found_as_feed(e, job_id, feed_id))?;
            Ok(CommandResult::Ok)
        }

        // ── Broker operations ────────────────────────────────────────
        Command::UpdateBrokerSettings(req) => {
            let settings = client.update_tak_config(&req.into()).await?;
            Ok(CommandResult::Broker(settings.into()))
        }
        Command::ConnectBroker => {
            client.tak_connect().await?;
            Ok(CommandResult::Ok)
        }
        Command::DisconnectBroker => {
            client.tak_disconnect().await?;
            Ok(CommandResult::Ok)
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn not_found_as_job(err: relay_api::Error, id: JobId) -> CoreError {
    if err.is_not_found() {
        CoreError::JobNotFound { id }
    } else {
        err.into()
    }
}

fn not_found_as_feed(err: relay_api::Error, job_id: JobId, feed_id: FeedId) -> CoreError {
    if err.is_not_found() {
        CoreError::FeedNotFound { job_id, feed_id }
    } else {
        err.into()
    }
}
