//! Score Ledger
//!
//! Completion times per (player, level), one JSON file per pair under the
//! ledger root. Reads soft-fail to an empty history; appends rewrite the
//! whole file.

mod ledger;
mod time;

pub use ledger::*;
pub use time::{CompletionTime, TimeError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;

/// Identifies one ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScoreKey {
    pub player: String,
    pub level: String,
}

impl ScoreKey {
    pub fn new(player: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            level: level.into(),
        }
    }
}

/// One completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub timestamp: DateTime<Utc>,
    pub time: CompletionTime,
}

impl ScoreEntry {
    /// Entry stamped with the current time
    pub fn now(time: CompletionTime) -> Self {
        Self {
            timestamp: Utc::now(),
            time,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("ledger I/O failed: {0}")]
    Io(#[from] StorageError),
    #[error("failed to encode ledger: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidTime(#[from] TimeError),
}
