//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{LedgerError, Result};

use super::WalEntry;

/// Appends entries to the WAL file
pub struct WalWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    /// Lines appended since open or the last checkpoint
    appended: u64,
}

impl WalWriter {
    /// Open or create a WAL file in append mode
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(Self::open_append(path)?),
            appended: 0,
        })
    }

    fn open_append(path: &Path) -> Result<File> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        Self::drop_torn_line(path, &mut file)?;
        Ok(file)
    }

    /// Cut off a line left unterminated by a crash so the next entry starts
    /// on its own line and the torn bytes are never replayed
    fn drop_torn_line(path: &Path, file: &mut File) -> Result<()> {
        const CHUNK: u64 = 4096;

        let len = file.metadata()?.len();
        let mut end = len;
        let mut buf = vec![0u8; CHUNK as usize];

        while end > 0 {
            let start = end.saturating_sub(CHUNK);
            let chunk = &mut buf[..(end - start) as usize];
            file.seek(SeekFrom::Start(start))?;
            file.read_exact(chunk)?;

            if let Some(pos) = chunk.iter().rposition(|&b| b == b'\n') {
                end = start + pos as u64 + 1;
                break;
            }
            end = start;
        }

        if end < len {
            tracing::warn!(
                "Dropping {} bytes of torn last line from {}",
                len - end,
                path.display()
            );
            file.set_len(end)?;
        }
        Ok(())
    }

    /// Append one entry as a line and flush it to the OS
    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        let mut line = entry.to_line();
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        self.appended += 1;
        Ok(())
    }

    /// Atomically replace the WAL with `entries`
    ///
    /// The new contents go to a temporary file that is synced and renamed over
    /// the old WAL, so a crash leaves either the old file or the new one.
    pub fn checkpoint(&mut self, entries: &[WalEntry]) -> Result<()> {
        self.writer.flush()?;

        let tmp_path = self.tmp_path();
        {
            let mut tmp = BufWriter::new(File::create(&tmp_path)?);
            for entry in entries {
                tmp.write_all(entry.to_line().as_bytes())?;
                tmp.write_all(b"\n")?;
            }
            let file = tmp
                .into_inner()
                .map_err(|e| LedgerError::Wal(format!("Failed to flush checkpoint: {}", e)))?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &self.path)?;
        self.writer = BufWriter::new(Self::open_append(&self.path)?);
        self.appended = 0;
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    /// Lines appended since open or the last checkpoint
    pub fn appended(&self) -> u64 {
        self.appended
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
