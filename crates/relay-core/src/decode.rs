//! Status frame decoding.
//!
//! Turns one raw [`Frame`] from the status channel into a validated
//! [`StatusSnapshot`]. Decoding is all-or-nothing: a frame that fails any
//! check produces a [`DecodeError`] and no snapshot, and never affects
//! frames before or after it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use thiserror::Error;

use relay_api::Frame;
use relay_api::models::{EnablementStatusItem, SourceStat, StatusFrame};

use crate::convert::parse_timestamp;
use crate::model::{FeedStat, JobId, JobStatus, StatusSnapshot};

/// Why a frame was rejected.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("binary frame is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),

    #[error("frame does not match the status schema: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("invalid timestamp in `{field}`: {value:?}")]
    Timestamp { field: &'static str, value: String },

    #[error("job {0} appears more than once in one frame")]
    DuplicateJob(JobId),
}

/// Decode one frame. Binary frames are accepted when they carry UTF-8 JSON.
pub fn decode(frame: &Frame) -> Result<StatusSnapshot, DecodeError> {
    match frame {
        Frame::Text(text) => decode_str(text),
        Frame::Binary(bytes) => {
            let text = String::from_utf8(bytes.clone())?;
            decode_str(&text)
        }
    }
}

/// Decode a status document from its JSON text.
pub fn decode_str(text: &str) -> Result<StatusSnapshot, DecodeError> {
    let raw: StatusFrame = serde_json::from_str(text)?;
    into_snapshot(raw)
}

fn into_snapshot(raw: StatusFrame) -> Result<StatusSnapshot, DecodeError> {
    let server_time = required_time("server_time", &raw.server_time)?;

    let mut seen = HashSet::with_capacity(raw.enablements.len());
    let mut jobs = Vec::with_capacity(raw.enablements.len());
    for item in raw.enablements {
        let id = JobId(item.id);
        if !seen.insert(id) {
            return Err(DecodeError::DuplicateJob(id));
        }
        jobs.push(job_status(item)?);
    }

    Ok(StatusSnapshot {
        broker_connected: raw.tak_connected,
        broker_endpoint: raw.tak_url,
        outbound_queue_depth: raw.tx_queue_size,
        last_connect_error: raw.connect_error.filter(|e| !e.is_empty()),
        jobs,
        server_time,
    })
}

fn job_status(item: EnablementStatusItem) -> Result<JobStatus, DecodeError> {
    let last_poll_time = optional_time("last_poll_time", item.last_poll_time.as_deref())?;

    let mut per_feed_stats = IndexMap::with_capacity(item.source_stats.len());
    for (feed_name, stat) in item.source_stats {
        per_feed_stats.insert(feed_name, feed_stat(stat)?);
    }

    Ok(JobStatus {
        id: JobId(item.id),
        display_name: item.name,
        kind: item.type_id,
        running: item.running,
        events_emitted: item.events_sent,
        last_poll_time,
        last_error: item.last_error.filter(|e| !e.is_empty()),
        active_entity_count: item.active_items,
        per_feed_stats,
    })
}

fn feed_stat(stat: SourceStat) -> Result<FeedStat, DecodeError> {
    let last_poll_time = optional_time("source_stats.last_poll", stat.last_poll.as_deref())?;

    // Only non-negative integers are counters; anything else a newer
    // backend adds is ignored.
    let counters = stat
        .counters
        .into_iter()
        .filter_map(|(name, value)| value.as_u64().map(|n| (name, n)))
        .collect();

    Ok(FeedStat {
        last_poll_time,
        counters,
    })
}

fn required_time(field: &'static str, raw: &str) -> Result<DateTime<Utc>, DecodeError> {
    parse_timestamp(raw).ok_or_else(|| DecodeError::Timestamp {
        field,
        value: raw.to_owned(),
    })
}

fn optional_time(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, DecodeError> {
    raw.map(|value| required_time(field, value)).transpose()
}
