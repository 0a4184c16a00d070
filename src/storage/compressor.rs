//! Segment Compressor
//!
//! Turns rotated segments into zstd archives on a background worker.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;

use crate::error::{LedgerError, Result};

/// Extension appended to a rotated segment once archived
pub const ARCHIVE_EXTENSION: &str = ".zst";

/// Suffix of an archive still being written
pub const ARCHIVE_TMP_SUFFIX: &str = ".zst.tmp";

/// "data.table.1718000000000" → "data.table.1718000000000.zst"
pub fn archive_path(rotated: &Path) -> PathBuf {
    with_suffix(rotated, ARCHIVE_EXTENSION)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Stream a rotated segment into a zstd archive, then delete the segment
///
/// The archive is written under a temporary name and renamed once complete.
/// On failure the partial archive is removed and the segment is left alone.
pub fn compress_file(path: &Path, level: i32) -> Result<PathBuf> {
    let archive = archive_path(path);
    let tmp = with_suffix(path, ARCHIVE_TMP_SUFFIX);

    let written = (|| -> Result<()> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut writer = BufWriter::new(File::create(&tmp)?);
        zstd::stream::copy_encode(&mut reader, &mut writer, level)?;
        writer.flush()?;

        let file = writer
            .into_inner()
            .map_err(|e| LedgerError::Storage(format!("Failed to flush archive: {}", e)))?;
        file.sync_all()?;
        fs::rename(&tmp, &archive)?;
        Ok(())
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::remove_file(path)?;
    Ok(archive)
}

/// Background compression worker fed over a channel
///
/// Failures are logged and not retried; the rotated file stays on disk and is
/// picked up again the next time the engine opens.
pub struct Compressor {
    sender: Mutex<Option<Sender<PathBuf>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Compressor {
    /// Spawn the worker thread
    pub fn start(level: i32) -> Result<Self> {
        let (sender, receiver) = channel::unbounded::<PathBuf>();

        let worker = thread::Builder::new()
            .name("ledgerkv-compressor".to_string())
            .spawn(move || {
                for path in receiver.iter() {
                    match compress_file(&path, level) {
                        Ok(archive) => {
                            tracing::info!("Archived {} to {}", path.display(), archive.display())
                        }
                        Err(e) => {
                            tracing::error!("Failed to compress {}: {}", path.display(), e)
                        }
                    }
                }
                tracing::debug!("Compressor stopped");
            })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queue a rotated segment for compression
    pub fn submit(&self, path: PathBuf) {
        match self.sender.lock().as_ref() {
            Some(sender) => {
                if let Err(e) = sender.send(path) {
                    tracing::warn!(
                        "Compressor gone, leaving {} for next startup",
                        e.into_inner().display()
                    );
                }
            }
            None => tracing::warn!(
                "Compressor stopped, leaving {} for next startup",
                path.display()
            ),
        }
    }

    /// Finish queued work and stop the worker
    pub fn shutdown(&self) {
        // Dropping the sender ends the worker's receive loop
        self.sender.lock().take();
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::error!("Compressor thread panicked");
            }
        }
    }
}

impl Drop for Compressor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
