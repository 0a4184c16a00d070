//! Record Module
//!
//! Defines the commands persisted in the command log and their byte encoding.
//!
//! ## Record Format
//! ```text
//! ┌──────────────┬──────────────────────────────────────┐
//! │ Len (4, BE)  │              Payload                 │
//! └──────────────┴──────────────────────────────────────┘
//!
//! Payload:
//! ┌──────────────┬──────────────────────────────────────┐
//! │ CRC32 (4)    │        bincode(Command)              │
//! └──────────────┴──────────────────────────────────────┘
//! ```
//!
//! The length prefix is written by the command log; this module only deals
//! with the payload.

mod command;
mod codec;

pub use command::Command;
pub use codec::{decode, encode, CRC_SIZE};
