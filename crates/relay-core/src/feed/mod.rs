// ── Status feed: connection lifecycle ──
//
// The feed task owns the one live status channel, reconnects it with
// capped exponential backoff, and publishes decoded snapshots into the
// `StatusStore`. Consumers only ever observe `ConnectionState`.

mod backoff;
mod manager;

use std::time::Duration;

use serde::Serialize;
use strum::Display;

pub use backoff::{BACKOFF_CEILING, BACKOFF_FLOOR, Backoff};
pub use manager::FeedHandle;

/// Coarse channel phase. "Reconnecting" is `Connecting` with a retry
/// timer armed (see [`ConnectionState::retry_in`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    Connecting,
    Open,
    Closed,
}

/// Observable state of the status channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub phase: ConnectionPhase,
    /// Consecutive failures since the channel was last `Open`.
    pub attempt: u32,
    /// Delay the next failure will wait before retrying.
    #[serde(with = "duration_millis")]
    pub next_delay: Duration,
    /// Delay of the retry timer currently armed, if any.
    #[serde(with = "option_duration_millis")]
    pub retry_in: Option<Duration>,
    /// Incremented on every connection attempt. Frames are only ever
    /// accepted from the channel of the current generation.
    pub generation: u64,
}

impl ConnectionState {
    pub(crate) fn connecting(generation: u64, backoff: &Backoff) -> Self {
        Self {
            phase: ConnectionPhase::Connecting,
            attempt: backoff.attempt(),
            next_delay: backoff.next_delay(),
            retry_in: None,
            generation,
        }
    }

    pub(crate) fn reconnecting(generation: u64, backoff: &Backoff, delay: Duration) -> Self {
        Self {
            retry_in: Some(delay),
            ..Self::connecting(generation, backoff)
        }
    }

    pub(crate) fn open(generation: u64) -> Self {
        Self {
            phase: ConnectionPhase::Open,
            attempt: 0,
            next_delay: BACKOFF_FLOOR,
            retry_in: None,
            generation,
        }
    }

    pub(crate) fn closed(generation: u64, backoff: &Backoff) -> Self {
        Self {
            phase: ConnectionPhase::Closed,
            ..Self::connecting(generation, backoff)
        }
    }

    pub fn is_open(&self) -> bool {
        self.phase == ConnectionPhase::Open
    }

    pub fn is_reconnecting(&self) -> bool {
        self.phase == ConnectionPhase::Connecting && self.retry_in.is_some()
    }

    /// Short label for status lines: `open`, `connecting`, `reconnecting`, `closed`.
    pub fn label(&self) -> &'static str {
        match self.phase {
            ConnectionPhase::Open => "open",
            ConnectionPhase::Closed => "closed",
            ConnectionPhase::Connecting if self.retry_in.is_some() => "reconnecting",
            ConnectionPhase::Connecting => "connecting",
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::connecting(0, &Backoff::new())
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(millis(*d))
    }

    pub(super) fn millis(d: Duration) -> u64 {
        u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
    }
}

mod option_duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    #[allow(clippy::ref_option)]
    pub(super) fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&super::duration_millis::millis(*d)),
            None => s.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_distinguish_reconnecting() {
        let mut backoff = Backoff::new();
        assert_eq!(ConnectionState::connecting(1, &backoff).label(), "connecting");
        let delay = backoff.fail();
        let state = ConnectionState::reconnecting(1, &backoff, delay);
        assert!(state.is_reconnecting());
        assert_eq!(state.label(), "reconnecting");
        assert_eq!(state.attempt, 1);
        assert_eq!(ConnectionState::open(2).label(), "open");
        assert_eq!(ConnectionState::closed(2, &backoff).phase.to_string(), "closed");
    }
}
