//! Rotation Monitor
//!
//! Periodic background check that rotates the active segment.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};

use crate::error::Result;

/// Runs a check on a fixed interval until stopped
pub struct RotationMonitor {
    /// Dropped to wake the monitor and stop it
    shutdown: Option<Sender<()>>,

    handle: Option<JoinHandle<()>>,
}

impl RotationMonitor {
    /// Spawn the monitor thread, calling `check` every `interval`
    pub fn spawn<F>(interval: Duration, mut check: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (shutdown, stop) = channel::bounded::<()>(0);
        let ticker = channel::tick(interval);

        let handle = thread::Builder::new()
            .name("ledgerkv-rotation".to_string())
            .spawn(move || loop {
                let stopped = channel::select! {
                    recv(ticker) -> _ => false,
                    recv(stop) -> _ => true,
                };
                if stopped {
                    break;
                }
                check();
            })?;

        Ok(Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Stop the monitor and wait for an in-flight check to finish
    pub fn stop(&mut self) {
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Rotation monitor panicked");
            }
        }
    }
}

impl Drop for RotationMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
