// ── Command API ──
//
// All write operations flow through a unified `Command` enum. The console
// routes each variant to the matching REST call and refreshes the job
// catalog afterwards. Live effects (a job actually starting) show up
// later on the status channel, never in the command result.

mod requests;

pub use requests::{
    CreateFeedRequest, CreateJobRequest, UpdateBrokerRequest, UpdateFeedRequest, UpdateJobRequest,
};

use crate::model::{BrokerSettings, Feed, FeedId, Job, JobId};

/// All possible write operations against a relay backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ── Job operations ───────────────────────────────────────────────
    CreateJob(CreateJobRequest),
    UpdateJob {
        id: JobId,
        update: UpdateJobRequest,
    },
    StartJob {
        id: JobId,
    },
    StopJob {
        id: JobId,
    },
    DeleteJob {
        id: JobId,
    },
    SetJobEnabled {
        id: JobId,
        enabled: bool,
    },

    // ── Feed operations ──────────────────────────────────────────────
    CreateFeed {
        job_id: JobId,
        feed: CreateFeedRequest,
    },
    UpdateFeed {
        job_id: JobId,
        feed_id: FeedId,
        update: UpdateFeedRequest,
    },
    SetFeedEnabled {
        job_id: JobId,
        feed_id: FeedId,
        enabled: bool,
    },
    DeleteFeed {
        job_id: JobId,
        feed_id: FeedId,
    },

    // ── Broker operations ────────────────────────────────────────────
    UpdateBrokerSettings(UpdateBrokerRequest),
    ConnectBroker,
    DisconnectBroker,
}

impl Command {
    /// Short description for logs and confirmation prompts.
    pub fn describe(&self) -> String {
        match self {
            Self::CreateJob(req) => format!("create job '{}'", req.name),
            Self::UpdateJob { id, .. } => format!("update job {id}"),
            Self::StartJob { id } => format!("start job {id}"),
            Self::StopJob { id } => format!("stop job {id}"),
            Self::DeleteJob { id } => format!("delete job {id}"),
            Self::SetJobEnabled { id, enabled } => {
                format!("{} job {id}", if *enabled { "enable" } else { "disable" })
            }
            Self::CreateFeed { job_id, feed } => {
                format!("add feed '{}' to job {job_id}", feed.name)
            }
            Self::UpdateFeed {
                job_id, feed_id, ..
            } => format!("update feed {feed_id} of job {job_id}"),
            Self::SetFeedEnabled {
                job_id,
                feed_id,
                enabled,
            } => format!(
                "{} feed {feed_id} of job {job_id}",
                if *enabled { "enable" } else { "disable" }
            ),
            Self::DeleteFeed { job_id, feed_id } => format!("delete feed {feed_id} of job {job_id}"),
            Self::UpdateBrokerSettings(_) => "update broker settings".into(),
            Self::ConnectBroker => "connect broker".into(),
            Self::DisconnectBroker => "disconnect broker".into(),
        }
    }

    /// Whether the command changes persisted jobs and should trigger a
    /// catalog refresh.
    pub fn touches_catalog(&self) -> bool {
        !matches!(
            self,
            Self::UpdateBrokerSettings(_) | Self::ConnectBroker | Self::DisconnectBroker
        )
    }
}

/// Result of executing a [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Accepted; any live effect arrives on the status channel later.
    Ok,
    /// The created or updated job record.
    Job(Job),
    /// The created or updated feed record.
    Feed(Feed),
    /// The broker settings as saved.
    Broker(BrokerSettings),
}
