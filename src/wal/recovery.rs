//! WAL Replay
//!
//! Warms the cache from the WAL on startup.

use std::io;
use std::path::Path;

use crate::cache::Cache;
use crate::error::{LedgerError, Result};

use super::{WalEntry, WalReader};

/// Result of a replay
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Entries applied to the cache
    pub entries_applied: u64,

    /// Malformed lines skipped
    pub entries_skipped: u64,
}

/// Apply every WAL line to the cache: `SET` inserts, `RM` evicts
///
/// A missing WAL is treated as empty. Malformed lines are skipped.
pub fn replay(path: &Path, cache: &Cache) -> Result<ReplayStats> {
    let reader = match WalReader::open(path) {
        Ok(reader) => reader,
        Err(LedgerError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("No WAL at {}, skipping replay", path.display());
            return Ok(ReplayStats::default());
        }
        Err(e) => return Err(e),
    };

    let mut stats = ReplayStats::default();
    for entry in reader.entries() {
        match entry {
            Ok(WalEntry::Set { key, value }) => {
                cache.insert(key, value);
                stats.entries_applied += 1;
            }
            Ok(WalEntry::Rm { key }) => {
                cache.evict(&key);
                stats.entries_applied += 1;
            }
            Err(e @ LedgerError::Io(_)) => return Err(e),
            Err(e) => {
                tracing::warn!("Skipping WAL entry: {}", e);
                stats.entries_skipped += 1;
            }
        }
    }

    Ok(stats)
}
