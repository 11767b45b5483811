//! Persisted per-client counter state and its wire codec.

use crate::error::CodecError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counter state for one client in its current window.
///
/// Stored as `{"LastSeen": "<rfc3339>", "Count": n}` so records written by
/// older deployments remain readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Visitor {
    pub last_seen: DateTime<Utc>,
    pub count: u32,
}

impl Visitor {
    /// First admitted request of a window.
    pub fn first(now: DateTime<Utc>) -> Self {
        Self {
            last_seen: now,
            count: 1,
        }
    }

    /// Record one more admitted request. `last_seen` never moves backwards.
    pub fn admit(self, now: DateTime<Utc>) -> Self {
        Self {
            last_seen: self.last_seen.max(now),
            count: self.count.saturating_add(1),
        }
    }
}

pub fn encode(visitor: &Visitor) -> Result<String, CodecError> {
    serde_json::to_string(visitor).map_err(CodecError::Encode)
}

pub fn decode(raw: &str) -> Result<Visitor, CodecError> {
    serde_json::from_str(raw).map_err(CodecError::Decode)
}
