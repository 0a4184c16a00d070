//! TCP Server
//!
//! Accepts connections and hands each one to its own worker thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{LedgerError, Result};
use crate::protocol::{write_response, Response};

use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server for LedgerKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
    active_connections: Arc<AtomicUsize>,
}

/// Stops a running server from another thread
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Decrements the live connection count when a worker exits
struct ConnectionSlot(Arc<AtomicUsize>);

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Server {
    /// Bind the listen address from the config
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            LedgerError::Network(format!("Failed to bind {}: {}", config.listen_addr, e))
        })?;
        // Non-blocking accept so the loop can notice shutdown
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Accept connections until shut down (blocking)
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = self.dispatch(stream) {
                        tracing::warn!("Failed to start connection from {}: {}", addr, e);
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Server shutting down");
        Ok(())
    }

    /// Signal the server to stop accepting connections
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }

    fn dispatch(&self, stream: TcpStream) -> Result<()> {
        // Accepted sockets may inherit non-blocking mode from the listener
        stream.set_nonblocking(false)?;

        let active = self.active_connections.fetch_add(1, Ordering::SeqCst);
        let slot = ConnectionSlot(Arc::clone(&self.active_connections));

        if active >= self.config.max_connections {
            tracing::warn!(
                "Rejecting connection: {} of {} slots in use",
                active,
                self.config.max_connections
            );
            let mut stream = stream;
            let _ = write_response(&mut stream, &Response::failure("too many connections"));
            return Ok(());
        }

        let mut connection = Connection::new(stream, Arc::clone(&self.engine))?;
        connection.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;

        thread::Builder::new()
            .name(format!("ledgerkv-conn-{}", connection.peer_addr()))
            .spawn(move || {
                let _slot = slot;
                if let Err(e) = connection.handle() {
                    tracing::debug!("Connection {} ended with error: {}", connection.peer_addr(), e);
                }
            })?;

        Ok(())
    }
}
