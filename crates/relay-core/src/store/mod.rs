// ── Console state stores ──
//
// `StatusStore` holds the latest live snapshot from the push channel.
// `JobCatalog` holds persisted jobs fetched over REST. The two never
// write to each other; the reconciliation view reads both.

mod catalog;
mod status;

pub use catalog::{JobCatalog, JobList};
pub use status::{Published, SnapshotStream, StatusStore, Subscription};
