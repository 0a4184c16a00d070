//! Command Log
//!
//! Append-only segment file of length-prefixed records.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};

use crate::config::SyncStrategy;
use crate::error::{LedgerError, Result};
use crate::record::{self, Command};

use super::IndexEntry;

/// Size of the big-endian length prefix in front of every payload
pub const LEN_PREFIX_SIZE: u64 = 4;

/// Append-only log of encoded commands
///
/// Appends take `&mut self` and are serialized by the engine's write lock.
/// Reads are positioned and take `&self`, so any number of readers can share
/// the log under a read lock without touching a file cursor.
pub struct CommandLog {
    /// Current location of the segment file
    path: PathBuf,

    /// Handle opened for positioned reads and appends
    file: File,

    /// Logical end of the log (next record starts here)
    len: u64,

    /// How often appends are fsynced
    sync_strategy: SyncStrategy,

    /// Records appended since the last fsync
    unsynced: usize,
}

impl CommandLog {
    /// Open or create the segment at `path`
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append a payload, returning the offset of the payload (after its prefix)
    ///
    /// Prefix and payload go out in a single write so a reader can never see
    /// one without the other. A failed write is rolled back to the previous
    /// end of the log.
    pub fn append(&mut self, payload: &[u8]) -> Result<u32> {
        let payload_len = u32::try_from(payload.len()).map_err(|_| {
            LedgerError::Storage(format!("record of {} bytes is too large", payload.len()))
        })?;

        let offset = self.len + LEN_PREFIX_SIZE;
        let end = offset + payload.len() as u64;
        if end > u32::MAX as u64 {
            return Err(LedgerError::Storage(format!(
                "segment {} would exceed the 4 GiB offset space",
                self.path.display()
            )));
        }

        let mut record = BytesMut::with_capacity(LEN_PREFIX_SIZE as usize + payload.len());
        record.put_u32(payload_len);
        record.put_slice(payload);

        if let Err(e) = self.file.write_all(&record) {
            // Drop whatever part of the record made it to disk
            let _ = self.file.set_len(self.len);
            return Err(e.into());
        }
        self.len = end;

        self.unsynced += 1;
        let should_sync = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if should_sync {
            self.sync()?;
        }

        Ok(offset as u32)
    }

    /// Read exactly `length` bytes starting at `offset`
    pub fn read_at(&self, offset: u32, length: u32) -> Result<Vec<u8>> {
        let end = offset as u64 + length as u64;
        if end > self.len {
            return Err(LedgerError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "read of {}..{} is past the end of {} ({} bytes)",
                    offset,
                    end,
                    self.path.display(),
                    self.len
                ),
            )));
        }

        let mut buf = vec![0u8; length as usize];
        read_exact_at(&self.file, &mut buf, offset as u64)?;
        Ok(buf)
    }

    /// Start a fresh scan from offset 0
    ///
    /// Each call opens its own handle, so scans are restartable and do not
    /// interfere with appends or positioned reads.
    pub fn scan(&self) -> Result<LogScanner> {
        let file = File::open(&self.path)?;
        Ok(LogScanner {
            reader: BufReader::new(file),
            pos: 0,
            end: self.len,
            done: false,
        })
    }

    /// Cut the log back to `len` bytes, discarding a torn or corrupt tail
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        if len < self.len {
            self.file.set_len(len)?;
            self.file.sync_all()?;
            self.len = len;
        }
        Ok(())
    }

    /// Move the segment file, keeping the open handle
    pub fn rename(&mut self, to: &Path) -> Result<()> {
        std::fs::rename(&self.path, to)?;
        self.path = to.to_path_buf();
        Ok(())
    }

    /// Force all appended records to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Change how often future appends are fsynced
    pub fn set_sync_strategy(&mut self, sync_strategy: SyncStrategy) {
        self.sync_strategy = sync_strategy;
    }

    /// Size of the log in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current path of the segment file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Lazy front-to-back walk over the records of a log
///
/// Yields `(key, entry, command)` for every record that decodes cleanly and
/// stops silently at the first torn or undecodable record.
pub struct LogScanner {
    reader: BufReader<File>,
    pos: u64,
    end: u64,
    done: bool,
}

impl LogScanner {
    /// Length of the clean prefix scanned so far
    pub fn valid_len(&self) -> u64 {
        self.pos
    }

    /// Bytes of the log not yet covered by the clean prefix
    pub fn remaining(&self) -> u64 {
        self.end - self.pos
    }

    fn read_record(&mut self) -> io::Result<Option<(u32, Vec<u8>)>> {
        if self.pos + LEN_PREFIX_SIZE > self.end {
            return Ok(None);
        }

        let mut prefix = [0u8; LEN_PREFIX_SIZE as usize];
        self.reader.read_exact(&mut prefix)?;
        let length = u32::from_be_bytes(prefix);

        // A prefix that is negative as a signed int or runs past EOF is a torn write
        let payload_start = self.pos + LEN_PREFIX_SIZE;
        if (length as i32) < 0 || payload_start + length as u64 > self.end {
            return Ok(None);
        }

        let mut payload = vec![0u8; length as usize];
        self.reader.read_exact(&mut payload)?;
        Ok(Some((length, payload)))
    }
}

impl Iterator for LogScanner {
    type Item = (String, IndexEntry, Command);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let (length, payload) = match self.read_record() {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                tracing::warn!("Stopping log scan at offset {}: {}", self.pos, e);
                self.done = true;
                return None;
            }
        };

        let offset = self.pos + LEN_PREFIX_SIZE;
        match record::decode(&payload) {
            Ok(command) => {
                self.pos = offset + length as u64;
                let entry = IndexEntry {
                    offset: offset as u32,
                    length,
                };
                Some((command.key().to_string(), entry, command))
            }
            Err(e) => {
                tracing::warn!("Stopping log scan at offset {}: {}", self.pos, e);
                self.done = true;
                None
            }
        }
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
