//! Record codec
//!
//! Encodes a [`Command`] into a self-describing payload and back.

use crate::error::{LedgerError, Result};

use super::Command;

/// Bytes taken by the checksum at the front of every payload
pub const CRC_SIZE: usize = 4;

/// Encode a command to its payload bytes
///
/// Format: crc32 (4, big-endian) + bincode(command). The bincode encoding
/// carries the variant discriminant and the key, so decoding needs no context.
pub fn encode(command: &Command) -> Result<Vec<u8>> {
    let body = bincode::serialize(command)
        .map_err(|e| LedgerError::Serialization(format!("Failed to encode command: {}", e)))?;

    let mut payload = Vec::with_capacity(CRC_SIZE + body.len());
    payload.extend_from_slice(&crc32fast::hash(&body).to_be_bytes());
    payload.extend_from_slice(&body);
    Ok(payload)
}

/// Decode payload bytes back into a command
///
/// Fails with `CorruptRecord` on a checksum mismatch or an unknown variant.
pub fn decode(payload: &[u8]) -> Result<Command> {
    if payload.len() < CRC_SIZE {
        return Err(LedgerError::CorruptRecord(format!(
            "payload of {} bytes is shorter than its checksum",
            payload.len()
        )));
    }

    let (crc_bytes, body) = payload.split_at(CRC_SIZE);
    let stored = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
    let computed = crc32fast::hash(body);
    if stored != computed {
        return Err(LedgerError::CorruptRecord(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            stored, computed
        )));
    }

    bincode::deserialize(body).map_err(|e| LedgerError::CorruptRecord(e.to_string()))
}
