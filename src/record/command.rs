//! Command definitions
//!
//! The logical write operations stored in the command log.

use serde::{Deserialize, Serialize};

/// A write operation, immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Assign a value to a key
    Set { key: String, value: String },

    /// Logically delete a key (tombstone)
    Remove { key: String },
}

impl Command {
    /// Build a Set command
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Command::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build a Remove command
    pub fn remove(key: impl Into<String>) -> Self {
        Command::Remove { key: key.into() }
    }

    /// The key this command applies to
    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. } | Command::Remove { key } => key,
        }
    }

    /// Whether this command is a tombstone
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Command::Remove { .. })
    }
}
