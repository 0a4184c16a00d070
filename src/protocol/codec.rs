//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │  Op (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Operation
//! - GET: key_len (4 bytes) + key
//! - SET: key_len (4 bytes) + key + value
//! - RM:  key_len (4 bytes) + key
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │ has_value (1) + value       │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use crate::error::{LedgerError, Result};

use super::{Request, RequestKind, Response, Status};

/// Header size: 1 byte op/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to bytes
///
/// Format: op (1) + payload_len (4) + payload
pub fn encode_request(request: &Request) -> Vec<u8> {
    let key = request.key().as_bytes();
    let value = match request {
        Request::Set { value, .. } => value.as_bytes(),
        _ => &[],
    };

    let mut payload = Vec::with_capacity(4 + key.len() + value.len());
    payload.extend_from_slice(&(key.len() as u32).to_be_bytes());
    payload.extend_from_slice(key);
    payload.extend_from_slice(value);

    frame(request.kind() as u8, &payload)
}

/// Decode a request from bytes
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let (tag, payload) = unframe(bytes, "request")?;

    let kind = RequestKind::from_u8(tag).ok_or_else(|| {
        LedgerError::Protocol(format!("Unknown operation: 0x{:02x}", tag))
    })?;
    let (key, rest) = split_key(payload, kind)?;

    match kind {
        RequestKind::Get | RequestKind::Rm if !rest.is_empty() => {
            Err(LedgerError::Protocol(format!(
                "{:?} request: unexpected {} trailing bytes",
                kind,
                rest.len()
            )))
        }
        RequestKind::Get => Ok(Request::Get { key }),
        RequestKind::Rm => Ok(Request::Rm { key }),
        RequestKind::Set => Ok(Request::Set {
            key,
            value: utf8(rest, "SET value")?,
        }),
    }
}

/// Split `key_len (4) + key` off the front of a payload
fn split_key(payload: &[u8], kind: RequestKind) -> Result<(String, &[u8])> {
    if payload.len() < 4 {
        return Err(LedgerError::Protocol(format!(
            "{:?} request: missing key length",
            kind
        )));
    }

    let key_len = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
    if payload.len() - 4 < key_len {
        return Err(LedgerError::Protocol(format!(
            "{:?} request: incomplete key (expected {}, got {})",
            kind,
            key_len,
            payload.len() - 4
        )));
    }

    let key = utf8(&payload[4..4 + key_len], "key")?;
    Ok((key, &payload[4 + key_len..]))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + has_value (1) + value
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut payload = Vec::with_capacity(1 + response.value.as_ref().map_or(0, |v| v.len()));
    match &response.value {
        Some(value) => {
            payload.push(1);
            payload.extend_from_slice(value.as_bytes());
        }
        None => payload.push(0),
    }

    frame(response.status as u8, &payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = unframe(bytes, "response")?;

    let status = match status_byte {
        0x00 => Status::Success,
        0x01 => Status::Failure,
        _ => {
            return Err(LedgerError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    let value = match payload.split_first() {
        Some((0, [])) => None,
        Some((1, value)) => Some(utf8(value, "response value")?),
        Some((0, rest)) => {
            return Err(LedgerError::Protocol(format!(
                "Response without value carries {} extra bytes",
                rest.len()
            )))
        }
        Some((flag, _)) => {
            return Err(LedgerError::Protocol(format!(
                "Invalid value flag: 0x{:02x}",
                flag
            )))
        }
        None => {
            return Err(LedgerError::Protocol(
                "Response payload missing value flag".to_string(),
            ))
        }
    };

    Ok(Response { status, value })
}

// =============================================================================
// Framing helpers
// =============================================================================

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(tag);
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(payload);
    message
}

fn unframe<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(LedgerError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = check_payload_len(&bytes[..HEADER_SIZE], what)?;
    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(LedgerError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

fn check_payload_len(header: &[u8], what: &str) -> Result<usize> {
    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(LedgerError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(payload_len as usize)
}

fn utf8(bytes: &[u8], what: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| LedgerError::Protocol(format!("{} is not valid UTF-8", what)))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = check_payload_len(&header, what)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut message[HEADER_SIZE..])?;
    Ok(message)
}

/// Read a complete request from a stream
///
/// Blocks until a complete request is received or an error occurs
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let message = read_frame(reader, "request")?;
    decode_request(&message)
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    writer.write_all(&encode_request(request))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader, "response")?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}
