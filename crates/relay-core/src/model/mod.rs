// ── Console domain model ──
//
// Two families of types live here. Persisted entities (`Job`, `Feed`,
// broker settings) come from the REST configuration API and change only
// through explicit commands. Live status (`StatusSnapshot` and friends)
// comes from the push channel and is replaced wholesale on every frame.

pub mod broker;
pub mod id;
pub mod job;
pub mod status;

// ── Re-exports ──────────────────────────────────────────────────────

pub use broker::{BrokerSettings, BrokerStatus};
pub use id::{FeedId, JobId};
pub use job::{Feed, FeedEndpoint, FeedTemplate, GeoBounds, Job, JobType};
pub use status::{FeedStat, JobStatus, StatusSnapshot};
