//! Error types for LedgerKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Unified error type for LedgerKV operations
///
/// A missing key is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum LedgerError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Engine is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL error: {0}")]
    Wal(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
