//! Cache Module
//!
//! In-memory view of the last value seen for each key.
//!
//! ## Responsibilities
//! - Mirror `Set` records and evict on `Remove` during log replay
//! - Absorb WAL replay on startup
//! - Track live writes as they are accepted
//!
//! The cache is a hint. Reads through the engine always resolve via the
//! index and the command log; nothing here is authoritative.

mod table;

pub use table::Cache;
