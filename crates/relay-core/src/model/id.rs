// ── Identity types ──
//
// Jobs and feeds are keyed by backend-assigned integers. Newtypes keep a
// feed id from being passed where a job id is expected.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

integer_id!(
    /// Identifier of a relay job (an "enablement" on the wire).
    JobId
);

integer_id!(
    /// Identifier of a feed (a "source" on the wire) within a job.
    FeedId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays() {
        let id: JobId = " 42 ".parse().unwrap();
        assert_eq!(id, JobId(42));
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<FeedId>().is_err());
    }

    #[test]
    fn serializes_as_bare_integer() {
        assert_eq!(serde_json::to_string(&JobId(7)).unwrap(), "7");
        let id: FeedId = serde_json::from_str("10").unwrap();
        assert_eq!(id.get(), 10);
    }
}
