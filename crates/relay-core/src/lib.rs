// relay-core: Live status synchronization between the relay backend and console consumers.

pub mod command;
pub mod config;
pub mod console;
pub mod convert;
pub mod decode;
pub mod error;
pub mod feed;
pub mod model;
pub mod reconcile;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{
    Command, CommandResult, CreateFeedRequest, CreateJobRequest, UpdateBrokerRequest,
    UpdateFeedRequest, UpdateJobRequest,
};
pub use config::{ConsoleConfig, TlsVerification};
pub use console::Console;
pub use decode::{DecodeError, decode};
pub use error::CoreError;
pub use feed::{ConnectionPhase, ConnectionState, FeedHandle};
pub use reconcile::{BrokerView, ConsoleView, FeedView, JobView, Liveness};
pub use store::{JobCatalog, JobList, Published, SnapshotStream, StatusStore, Subscription};

pub use model::{
    BrokerSettings, BrokerStatus, Feed, FeedEndpoint, FeedId, FeedStat, FeedTemplate, GeoBounds,
    Job, JobId, JobStatus, JobType, StatusSnapshot,
};
