//! # LedgerKV
//!
//! An embedded key-value store with:
//! - An append-only command log indexed in memory
//! - Crash recovery by replaying the log, tolerant of torn tails
//! - A human-readable write-ahead log that warms a cache on restart
//! - Background segment rotation with compaction and zstd archiving
//! - Single-writer/multi-reader concurrency model
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │               (One Thread per Client)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │        RwLock<{Index, CommandLog}>  +  Mutex<WAL>            │
//! └──────┬──────────────────────┬───────────────────────┬───────┘
//!        │                      │                       │
//!        ▼                      ▼                       ▼
//! ┌─────────────┐       ┌──────────────┐       ┌────────────────┐
//! │ CommandLog  │       │     WAL      │       │ RotationMonitor│
//! │ + Index     │       │  (wal.log)   │       │  + Compressor  │
//! │(data.table) │       └──────────────┘       └────────────────┘
//! └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod storage;
pub mod wal;
pub mod cache;
pub mod network;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LedgerError, Result};
pub use config::Config;
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LedgerKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
