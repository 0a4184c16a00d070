//! Index
//!
//! In-memory map from key to the location of its latest record.

use std::collections::HashMap;

use crate::cache::Cache;
use crate::error::Result;
use crate::record::Command;

use super::command_log::{CommandLog, LEN_PREFIX_SIZE};

/// Location of a record's payload in the command log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Offset of the payload (just past the length prefix)
    pub offset: u32,

    /// Payload length in bytes
    pub length: u32,
}

impl IndexEntry {
    /// Bytes the record takes on disk, prefix included
    pub fn record_size(&self) -> u64 {
        LEN_PREFIX_SIZE + self.length as u64
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    entry: IndexEntry,
    tombstone: bool,
}

/// Key → latest record, plus the amount of garbage in the segment
///
/// Tombstones keep their entry so lookups resolve to "not found" by decoding
/// the tombstone record.
#[derive(Debug, Default)]
pub struct Index {
    slots: HashMap<String, Slot>,

    /// Bytes of superseded records and tombstones
    stale_bytes: u64,
}

/// Result of rebuilding the index from a log
#[derive(Debug, Default)]
pub struct ReloadResult {
    /// Number of records replayed
    pub records_replayed: u64,

    /// Length of the clean prefix of the log
    pub valid_len: u64,

    /// Bytes after the clean prefix (torn or corrupt tail)
    pub discarded_bytes: u64,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the log front-to-back, later records overwriting earlier ones
    ///
    /// `Set` records are mirrored into the cache and `Remove` records evict.
    pub fn reload(log: &CommandLog, cache: &Cache) -> Result<(Self, ReloadResult)> {
        let mut index = Self::new();
        let mut result = ReloadResult::default();

        let mut scanner = log.scan()?;
        for (key, entry, command) in scanner.by_ref() {
            index.insert(key, entry, command.is_tombstone());
            cache.apply(&command);
            result.records_replayed += 1;
        }

        result.valid_len = scanner.valid_len();
        result.discarded_bytes = scanner.remaining();
        Ok((index, result))
    }

    /// Point `key` at a new record, returning the entry it replaced
    pub fn insert(&mut self, key: String, entry: IndexEntry, tombstone: bool) -> Option<IndexEntry> {
        let previous = self.slots.insert(key, Slot { entry, tombstone });

        if let Some(prev) = previous {
            // A replaced tombstone was already counted when it went in
            if !prev.tombstone {
                self.stale_bytes += prev.entry.record_size();
            }
        }
        if tombstone {
            self.stale_bytes += entry.record_size();
        }

        previous.map(|slot| slot.entry)
    }

    /// Latest record location for `key`
    pub fn get(&self, key: &str) -> Option<IndexEntry> {
        self.slots.get(key).map(|slot| slot.entry)
    }

    /// Whether the latest record for `key` is a tombstone
    pub fn is_tombstone(&self, key: &str) -> bool {
        self.slots.get(key).map(|slot| slot.tombstone).unwrap_or(false)
    }

    /// Keys whose latest record is a `Set`, with their locations
    pub fn live(&self) -> impl Iterator<Item = (&str, IndexEntry)> {
        self.slots
            .iter()
            .filter(|(_, slot)| !slot.tombstone)
            .map(|(key, slot)| (key.as_str(), slot.entry))
    }

    /// Number of keys, tombstoned ones included
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stale_bytes(&self) -> u64 {
        self.stale_bytes
    }
}
