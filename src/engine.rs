//! Engine Module
//!
//! The storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Recover the index and cache from the command log on startup
//! - Replay the WAL to warm the cache
//! - Serve `set`/`get`/`rm` under one reader-writer lock
//! - Run the rotation monitor and hand rotated segments to the compressor

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::cache::Cache;
use crate::config::Config;
use crate::error::{LedgerError, Result};
use crate::protocol::Request;
use crate::record::{self, Command};
use crate::storage::{Compressor, IndexEntry, RotationMonitor, RotationOutcome, StorageManager};
use crate::wal::{self, WalEntry, WalWriter};

/// The main storage engine
///
/// ## Concurrency Model
///
/// - **Store lock** (`RwLock<StorageManager>`): guards the index and the
///   active command log as one unit.
///   - `get` takes the read lock, so lookups run in parallel
///   - `set`, `rm` and rotation take the write lock
///
/// - **WAL lock** (`Mutex<WalWriter>`): independent of the store lock. Writers
///   append to the WAL after releasing the store lock, so the command log is
///   always ahead of the WAL. Only rotation holds both, always store first.
///
/// - **Compression** runs on its own worker thread, outside both locks.
pub struct Engine {
    shared: Arc<Shared>,

    /// Background rotation monitor (None once closed)
    monitor: Mutex<Option<RotationMonitor>>,

    /// Set once `close` has run
    closed: AtomicBool,
}

/// State shared with the rotation monitor
struct Shared {
    config: Config,

    /// Index + active segment (None once closed)
    store: RwLock<Option<StorageManager>>,

    /// Auxiliary operation log (None once closed)
    wal: Mutex<Option<WalWriter>>,

    /// Last-seen values, a hint only
    cache: Cache,

    /// Background archiver for rotated segments
    compressor: Compressor,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Rebuild the index and cache from the command log
    /// 3. Replay the WAL to warm the cache
    /// 4. Re-queue rotated segments that were never archived
    /// 5. Start the rotation monitor
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;

        let cache = Cache::new();

        let (store, reload) =
            StorageManager::open(&config.data_dir, config.log_sync_strategy, &cache)?;
        tracing::info!(
            "Command log recovery: {} records replayed, {} keys indexed, {} bytes discarded",
            reload.records_replayed,
            store.index_len(),
            reload.discarded_bytes
        );

        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let stats = wal::replay(&wal_path, &cache)?;
        if stats.entries_applied > 0 || stats.entries_skipped > 0 {
            tracing::info!(
                "WAL replay: {} entries applied, {} skipped",
                stats.entries_applied,
                stats.entries_skipped
            );
        }
        let wal = WalWriter::open(&wal_path)?;

        let compressor = Compressor::start(config.compression_level)?;
        for path in StorageManager::pending_archives(&config.data_dir)? {
            tracing::info!("Re-queueing {} for compression", path.display());
            compressor.submit(path);
        }

        let interval = config.rotation_interval;
        let shared = Arc::new(Shared {
            config,
            store: RwLock::new(Some(store)),
            wal: Mutex::new(Some(wal)),
            cache,
            compressor,
        });

        let monitor = Self::spawn_monitor(Arc::downgrade(&shared), interval)?;

        Ok(Self {
            shared,
            monitor: Mutex::new(Some(monitor)),
            closed: AtomicBool::new(false),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    fn spawn_monitor(shared: Weak<Shared>, interval: std::time::Duration) -> Result<RotationMonitor> {
        RotationMonitor::spawn(interval, move || {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            if let Err(e) = shared.rotate(false) {
                tracing::error!("Segment rotation failed: {}", e);
            }
        })
    }

    /// Execute a request
    ///
    /// Routes requests to appropriate handlers
    pub fn execute(&self, request: Request) -> Result<Option<String>> {
        match request {
            Request::Get { key } => self.get(&key),
            Request::Set { key, value } => {
                self.set(&key, &value)?;
                Ok(None)
            }
            Request::Rm { key } => {
                self.rm(&key)?;
                Ok(None)
            }
        }
    }

    /// Get a value by key
    ///
    /// Returns `None` both for keys never written and for keys whose latest
    /// record is a tombstone.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self.shared.store.read();
        let store = guard.as_ref().ok_or(LedgerError::Closed)?;
        store.get(key)
    }

    /// Set a key-value pair
    ///
    /// Steps:
    /// 1. Encode the command
    /// 2. Under the write lock, append it and point the index at it
    /// 3. After the lock, append to the WAL (failures only logged)
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write(Command::set(key, value))
    }

    /// Remove a key
    ///
    /// Always appends a tombstone, even for keys that were never set.
    pub fn rm(&self, key: &str) -> Result<()> {
        self.write(Command::remove(key))
    }

    fn write(&self, command: Command) -> Result<()> {
        let payload = record::encode(&command)?;

        {
            let mut guard = self.shared.store.write();
            let store = guard.as_mut().ok_or(LedgerError::Closed)?;
            store.append(&command, &payload)?;
            self.shared.cache.apply(&command);
        }

        self.shared.append_wal(&WalEntry::from(&command));
        Ok(())
    }

    /// Rotate the active segment now, regardless of its size
    ///
    /// Returns `None` when the segment is empty.
    pub fn rotate(&self) -> Result<Option<PathBuf>> {
        self.shared.rotate(true)
    }

    /// Close the engine
    ///
    /// Stops the rotation monitor, lets queued compressions finish, syncs the
    /// command log and WAL, and releases their file handles and the cache.
    /// Calling it again is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(mut monitor) = self.monitor.lock().take() {
            monitor.stop();
        }

        let store = self.shared.store.write().take();
        let wal = self.shared.wal.lock().take();

        self.shared.compressor.shutdown();

        if let Some(mut wal) = wal {
            if let Err(e) = wal.sync() {
                tracing::warn!("Failed to sync WAL on close: {}", e);
            }
        }
        self.shared.cache.clear();

        if let Some(mut store) = store {
            store.sync()?;
        }

        tracing::debug!("Engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.shared.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Number of index entries, tombstones included
    pub fn index_len(&self) -> usize {
        self.shared
            .store
            .read()
            .as_ref()
            .map(|s| s.index_len())
            .unwrap_or(0)
    }

    /// Index entry for a key
    pub fn index_entry(&self, key: &str) -> Option<IndexEntry> {
        self.shared.store.read().as_ref()?.index_entry(key)
    }

    /// Size of the active segment in bytes
    pub fn segment_size(&self) -> u64 {
        self.shared
            .store
            .read()
            .as_ref()
            .map(|s| s.segment_size())
            .unwrap_or(0)
    }

    /// Garbage bytes in the active segment
    pub fn stale_bytes(&self) -> u64 {
        self.shared
            .store
            .read()
            .as_ref()
            .map(|s| s.stale_bytes())
            .unwrap_or(0)
    }

    /// Cached value for a key (a hint, not a read)
    pub fn cached(&self, key: &str) -> Option<String> {
        self.shared.cache.get(key)
    }

    /// Number of cached keys
    pub fn cache_len(&self) -> usize {
        self.shared.cache.len()
    }
}

impl Shared {
    /// Best-effort WAL append
    fn append_wal(&self, entry: &WalEntry) {
        let mut guard = self.wal.lock();
        let Some(wal) = guard.as_mut() else {
            return;
        };
        if let Err(e) = wal.append(entry) {
            tracing::warn!("WAL append failed for key {:?}: {}", entry.key(), e);
        }
    }

    /// Rotate the segment; unless forced, only when it is due
    fn rotate(&self, force: bool) -> Result<Option<PathBuf>> {
        let outcome: RotationOutcome = {
            let mut guard = self.store.write();
            let store = guard.as_mut().ok_or(LedgerError::Closed)?;

            if !force && !store.should_rotate(self.config.segment_size_limit) {
                return Ok(None);
            }
            let Some(outcome) = store.rotate()? else {
                return Ok(None);
            };

            // Still under the store lock so no write slips between the
            // compacted segment and the checkpointed WAL
            self.checkpoint_wal(&outcome.live);
            outcome
        };

        tracing::info!(
            "Rotated segment to {} ({} live keys, {} bytes reclaimed)",
            outcome.rotated_path.display(),
            outcome.live.len(),
            outcome.reclaimed_bytes
        );

        self.compressor.submit(outcome.rotated_path.clone());
        Ok(Some(outcome.rotated_path))
    }

    fn checkpoint_wal(&self, live: &[(String, String)]) {
        let mut guard = self.wal.lock();
        let Some(wal) = guard.as_mut() else {
            return;
        };

        let entries: Vec<WalEntry> = live
            .iter()
            .map(|(key, value)| WalEntry::Set {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        if let Err(e) = wal.checkpoint(&entries) {
            tracing::warn!("WAL checkpoint failed: {}", e);
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Error closing engine: {}", e);
        }
    }
}
