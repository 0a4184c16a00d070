//! Storage Module
//!
//! Append-only command log with an in-memory index.
//!
//! ## Responsibilities
//! - Append encoded commands to the active segment
//! - Locate the latest record of every key through the index
//! - Rebuild the index by scanning the segment on startup
//! - Rotate the segment once it grows past its size limit
//! - Compress rotated segments in the background
//!
//! ## Data Directory
//! ```text
//! {data_dir}/
//!   ├── data.table                 active segment
//!   ├── data.table.compact         segment being built by a rotation
//!   ├── data.table.<millis>        rotated, awaiting compression
//!   └── data.table.<millis>.zst    compressed archive
//! ```
//!
//! ## Segment Format
//! ```text
//! ┌──────────┬─────────────┬──────────┬─────────────┬─────
//! │ Len (4)  │  Payload 1  │ Len (4)  │  Payload 2  │ ...
//! └──────────┴─────────────┴──────────┴─────────────┴─────
//! ```
//! Index entries point at payloads, not at their length prefixes.

mod command_log;
mod index;
mod manager;
mod compressor;
mod rotation;

pub use command_log::{CommandLog, LogScanner, LEN_PREFIX_SIZE};
pub use index::{Index, IndexEntry, ReloadResult};
pub use manager::{RotationOutcome, StorageManager, SEGMENT_FILENAME};
pub use compressor::{archive_path, compress_file, Compressor, ARCHIVE_EXTENSION};
pub use rotation::RotationMonitor;
