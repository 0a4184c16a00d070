//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │  Op (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Operations
//! - 0x01: GET  - Payload: key_len (4) + key
//! - 0x02: SET  - Payload: key_len (4) + key + value
//! - 0x03: RM   - Payload: key_len (4) + key
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬──────────────┬──────────────┐
//! │Status(1) │ Len (4)  │ HasValue (1) │    Value     │
//! └──────────┴──────────┴──────────────┴──────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: SUCCESS
//! - 0x01: FAILURE (value carries the error message)

mod command;
mod response;
mod codec;

pub use command::{Request, RequestKind};
pub use response::{Response, Status};
pub use codec::{
    decode_request, decode_response, encode_request, encode_response, read_request,
    read_response, write_request, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
