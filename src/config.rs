//! Configuration for LedgerKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{LedgerError, Result};

/// Main configuration for a LedgerKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── data.table               (active segment)
    ///     ├── data.table.<millis>.zst  (compressed rotated segments)
    ///     └── wal.log                  (write-ahead log)
    pub data_dir: PathBuf,

    /// Sync strategy: how often to fsync the command log
    pub log_sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Rotation Configuration
    // -------------------------------------------------------------------------
    /// Size of the active segment (in bytes) above which it is rotated
    pub segment_size_limit: u64,

    /// How often the rotation monitor checks the segment size
    pub rotation_interval: Duration,

    /// zstd level used for rotated segment archives
    pub compression_level: i32,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// Command log sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every record (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced records (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./ledgerkv_data"),
            log_sync_strategy: SyncStrategy::EveryNEntries { count: 100 },
            segment_size_limit: 10 * 1024 * 1024, // 10 MB
            rotation_interval: Duration::from_secs(5),
            compression_level: 3,
            listen_addr: "127.0.0.1:6380".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.segment_size_limit == 0 {
            return Err(LedgerError::Config(
                "segment_size_limit must be greater than zero".to_string(),
            ));
        }
        if self.rotation_interval.is_zero() {
            return Err(LedgerError::Config(
                "rotation_interval must be greater than zero".to_string(),
            ));
        }
        if let SyncStrategy::EveryNEntries { count: 0 } = self.log_sync_strategy {
            return Err(LedgerError::Config(
                "EveryNEntries sync strategy needs a count of at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the command log sync strategy
    pub fn log_sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.log_sync_strategy = strategy;
        self
    }

    /// Set the segment size limit (in bytes)
    pub fn segment_size_limit(mut self, size: u64) -> Self {
        self.config.segment_size_limit = size;
        self
    }

    /// Set the rotation monitor interval
    pub fn rotation_interval(mut self, interval: Duration) -> Self {
        self.config.rotation_interval = interval;
        self
    }

    /// Set the zstd compression level for archives
    pub fn compression_level(mut self, level: i32) -> Self {
        self.config.compression_level = level;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
