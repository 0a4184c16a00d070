//! Storage Manager
//!
//! Owns the active segment and its index, and rotates the segment.
//!
//! ## Responsibilities
//! - Recover an interrupted rotation on startup
//! - Rebuild the index from the active segment
//! - Append records and resolve lookups through the index
//! - Compact live records into a fresh segment at rotation time
//! - Discover rotated segments still waiting for compression

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::Cache;
use crate::config::SyncStrategy;
use crate::error::{LedgerError, Result};
use crate::record::{self, Command};

use super::compressor::{archive_path, ARCHIVE_TMP_SUFFIX};
use super::{CommandLog, Index, IndexEntry, ReloadResult};

/// File name of the active segment
pub const SEGMENT_FILENAME: &str = "data.table";

/// Suffix of the segment being built by a rotation
const COMPACT_SUFFIX: &str = ".compact";

/// What a rotation did
#[derive(Debug)]
pub struct RotationOutcome {
    /// Where the old segment now lives, awaiting compression
    pub rotated_path: PathBuf,

    /// Live key/value pairs carried into the new segment
    pub live: Vec<(String, String)>,

    /// Segment bytes dropped by compaction
    pub reclaimed_bytes: u64,
}

/// Manages the active segment
///
/// ## Concurrency:
/// Not internally synchronized. The engine keeps the whole manager behind
/// one RwLock so the index and the log can never be observed out of step.
pub struct StorageManager {
    /// Directory holding the segment and its rotated files
    data_dir: PathBuf,

    /// Active segment
    log: CommandLog,

    /// Key → latest record in `log`
    index: Index,

    /// Sync strategy handed to new segments
    sync_strategy: SyncStrategy,

    /// Segment size right after open or the last compaction
    compacted_len: u64,
}

impl StorageManager {
    /// Open the active segment in `dir` and rebuild its index
    ///
    /// On startup:
    /// 1. Finish or discard a rotation interrupted by a crash
    /// 2. Scan the segment, rebuilding the index and warming the cache
    /// 3. Truncate any torn or corrupt tail so appends land after clean data
    pub fn open(dir: &Path, sync_strategy: SyncStrategy, cache: &Cache) -> Result<(Self, ReloadResult)> {
        fs::create_dir_all(dir)?;
        Self::recover_interrupted_rotation(dir)?;

        let mut log = CommandLog::open(&Self::segment_path_in(dir), sync_strategy)?;
        let (index, reload) = Index::reload(&log, cache)?;

        if reload.discarded_bytes > 0 {
            tracing::warn!(
                "Discarding {} bytes of torn or corrupt tail from {}",
                reload.discarded_bytes,
                log.path().display()
            );
            log.truncate(reload.valid_len)?;
        }

        let compacted_len = log.len();
        Ok((
            Self {
                data_dir: dir.to_path_buf(),
                log,
                index,
                sync_strategy,
                compacted_len,
            },
            reload,
        ))
    }

    /// Append an encoded command and point its key at the new record
    ///
    /// The old record for the key, if any, becomes garbage until the next
    /// rotation compacts it away.
    pub fn append(&mut self, command: &Command, payload: &[u8]) -> Result<IndexEntry> {
        let offset = self.log.append(payload)?;
        let entry = IndexEntry {
            offset,
            length: payload.len() as u32,
        };
        self.index
            .insert(command.key().to_string(), entry, command.is_tombstone());
        Ok(entry)
    }

    /// Resolve a key through the index
    ///
    /// Returns:
    /// - `Ok(Some(value))`: latest record is a `Set`
    /// - `Ok(None)`: no record, or the latest record is a tombstone
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(entry) = self.index.get(key) else {
            return Ok(None);
        };

        let payload = self.log.read_at(entry.offset, entry.length)?;
        match record::decode(&payload)? {
            Command::Set { key: found, value } if found == key => Ok(Some(value)),
            Command::Remove { key: found } if found == key => Ok(None),
            other => Err(LedgerError::CorruptRecord(format!(
                "index entry for {:?} at offset {} holds a record for {:?}",
                key,
                entry.offset,
                other.key()
            ))),
        }
    }

    /// Whether the segment is due for rotation
    ///
    /// It must be over `limit`, and then either at least half of it is
    /// garbage or more than `limit` bytes were appended since the last
    /// compaction. The second rule bounds a segment of only live data
    /// without rewriting it on every check.
    pub fn should_rotate(&self, limit: u64) -> bool {
        let len = self.log.len();
        if len <= limit {
            return false;
        }
        self.index.stale_bytes().saturating_mul(2) >= len
            || len.saturating_sub(self.compacted_len) > limit
    }

    /// Rotate the active segment
    ///
    /// Live records are copied, in log order, into a new segment
    /// built beside the old one. The old segment is then renamed to a
    /// timestamped file and the new one takes its place, so nothing readable
    /// before the rotation is lost. Returns `None` for an empty segment.
    pub fn rotate(&mut self) -> Result<Option<RotationOutcome>> {
        if self.log.is_empty() {
            return Ok(None);
        }

        let compact_path = self.compact_path();
        if compact_path.exists() {
            fs::remove_file(&compact_path)?;
        }

        let (compacted, index, live) = match self.compact_into(&compact_path) {
            Ok(built) => built,
            Err(e) => {
                let _ = fs::remove_file(&compact_path);
                return Err(e);
            }
        };
        let reclaimed_bytes = self.log.len() - compacted.len();

        let segment_path = self.segment_path();
        let rotated_path = self.next_rotated_path()?;
        self.log.rename(&rotated_path)?;

        let mut compacted = compacted;
        if let Err(e) = compacted.rename(&segment_path) {
            // Put the old segment back so appends keep going to data.table
            if let Err(restore) = self.log.rename(&segment_path) {
                tracing::error!(
                    "Failed to restore segment from {}: {}",
                    rotated_path.display(),
                    restore
                );
            }
            let _ = fs::remove_file(&compact_path);
            return Err(e);
        }

        // data.table is now the compacted file; appends must follow it
        self.compacted_len = compacted.len();
        self.log = compacted;
        self.index = index;

        if let Err(e) = sync_dir(&self.data_dir) {
            tracing::warn!(
                "Failed to sync {} after rotation: {}",
                self.data_dir.display(),
                e
            );
        }

        Ok(Some(RotationOutcome {
            rotated_path,
            live,
            reclaimed_bytes,
        }))
    }

    fn compact_into(&self, path: &Path) -> Result<(CommandLog, Index, Vec<(String, String)>)> {
        // Sync once at the end rather than per record
        let mut compacted = CommandLog::open(path, SyncStrategy::EveryNEntries { count: usize::MAX })?;
        let mut index = Index::new();

        let mut entries: Vec<(&str, IndexEntry)> = self.index.live().collect();
        entries.sort_by_key(|(_, entry)| entry.offset);

        let mut live = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            let payload = self.log.read_at(entry.offset, entry.length)?;
            let Command::Set { key: found, value } = record::decode(&payload)? else {
                return Err(LedgerError::CorruptRecord(format!(
                    "live index entry for {:?} points at a tombstone",
                    key
                )));
            };
            if found != key {
                return Err(LedgerError::CorruptRecord(format!(
                    "index entry for {:?} holds a record for {:?}",
                    key, found
                )));
            }

            let offset = compacted.append(&payload)?;
            index.insert(
                found,
                IndexEntry {
                    offset,
                    length: entry.length,
                },
                false,
            );
            live.push((key.to_string(), value));
        }

        compacted.sync()?;
        compacted.set_sync_strategy(self.sync_strategy);
        Ok((compacted, index, live))
    }

    /// Rotated segments that never made it into an archive
    ///
    /// Partial archives left by a crash are deleted along the way.
    pub fn pending_archives(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut pending = Vec::new();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if name.ends_with(ARCHIVE_TMP_SUFFIX) {
                tracing::debug!("Removing partial archive {}", path.display());
                fs::remove_file(&path)?;
                continue;
            }

            if Self::parse_rotation_millis(name).is_some() && !archive_path(&path).exists() {
                pending.push(path);
            }
        }

        pending.sort();
        Ok(pending)
    }

    /// Force appended records to disk
    pub fn sync(&mut self) -> Result<()> {
        self.log.sync()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Size of the active segment in bytes
    pub fn segment_size(&self) -> u64 {
        self.log.len()
    }

    /// Garbage bytes in the active segment
    pub fn stale_bytes(&self) -> u64 {
        self.index.stale_bytes()
    }

    /// Number of index entries, tombstones included
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Index entry for a key
    pub fn index_entry(&self, key: &str) -> Option<IndexEntry> {
        self.index.get(key)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the active segment
    pub fn segment_path(&self) -> PathBuf {
        Self::segment_path_in(&self.data_dir)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn segment_path_in(dir: &Path) -> PathBuf {
        dir.join(SEGMENT_FILENAME)
    }

    fn compact_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}{}", SEGMENT_FILENAME, COMPACT_SUFFIX))
    }

    /// "data.table.<millis>", bumped until neither it nor its archive exists
    fn next_rotated_path(&self) -> Result<PathBuf> {
        let mut millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| LedgerError::Storage(format!("System clock before epoch: {}", e)))?
            .as_millis();

        loop {
            let path = self
                .data_dir
                .join(format!("{}.{}", SEGMENT_FILENAME, millis));
            if !path.exists() && !archive_path(&path).exists() {
                return Ok(path);
            }
            millis += 1;
        }
    }

    /// "data.table.1718000000000" → Some(1718000000000)
    fn parse_rotation_millis(name: &str) -> Option<u128> {
        let suffix = name.strip_prefix(SEGMENT_FILENAME)?.strip_prefix('.')?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        suffix.parse().ok()
    }

    /// Settle a rotation that crashed between building and swapping segments
    fn recover_interrupted_rotation(dir: &Path) -> Result<()> {
        let segment = Self::segment_path_in(dir);
        let compact = dir.join(format!("{}{}", SEGMENT_FILENAME, COMPACT_SUFFIX));

        if !compact.exists() {
            return Ok(());
        }

        if segment.exists() {
            // Crashed before the swap started; the old segment is still whole
            tracing::info!("Removing unfinished compaction {}", compact.display());
            fs::remove_file(&compact)?;
        } else {
            // Crashed after the old segment moved aside; the compacted one is complete
            tracing::info!("Promoting compacted segment {}", compact.display());
            fs::rename(&compact, &segment)?;
            sync_dir(dir)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
