//! Write-Ahead Log (WAL) Module
//!
//! Human-readable log of accepted writes, replayed on startup to warm the
//! cache.
//!
//! ## Responsibilities
//! - Append one line per accepted `set`/`rm`
//! - Replay lines into the cache on cold start
//! - Checkpoint to the live key set at rotation so the file stays bounded
//!
//! The command log, not the WAL, is the source of truth. WAL writes happen
//! after the command log append and their failures are only logged.
//!
//! ## File Format
//! ```text
//! SET <key> <value>
//! RM <key>
//! ```
//! Fields escape `\` as `\\`, space as `\s`, newline as `\n` and carriage
//! return as `\r`.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::WalEntry;
pub use writer::WalWriter;
pub use reader::WalReader;
pub use recovery::{replay, ReplayStats};
