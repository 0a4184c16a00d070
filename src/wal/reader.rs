//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{LedgerError, Result};

use super::WalEntry;

/// Reads entries from the WAL file, one line at a time
pub struct WalReader {
    reader: BufReader<File>,
    line_no: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            line_no: 0,
        })
    }

    /// Read the next entry
    ///
    /// - `Ok(None)` at end of file
    /// - `Err(Wal)` for a malformed or torn line; reading can continue after it
    /// - `Err(Io)` when the file itself cannot be read
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let mut buf = Vec::new();
        if self.reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;

        // Every appended line ends in a newline; one without it was cut off
        // mid-write
        if buf.last() != Some(&b'\n') {
            return Err(LedgerError::Wal(format!(
                "line {} is torn ({} bytes without a newline)",
                self.line_no,
                buf.len()
            )));
        }

        let line = String::from_utf8(buf).map_err(|_| {
            LedgerError::Wal(format!("line {} is not valid UTF-8", self.line_no))
        })?;
        WalEntry::parse_line(&line)
            .map(Some)
            .map_err(|e| LedgerError::Wal(format!("line {}: {}", self.line_no, e)))
    }

    /// Number of lines read so far
    pub fn line_no(&self) -> u64 {
        self.line_no
    }

    /// Iterate over all entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over WAL entries
///
/// Malformed lines come through as `Err(Wal)` and iteration continues; an I/O
/// error ends the iteration.
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e @ LedgerError::Io(_)) => {
                self.done = true;
                Some(Err(e))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
