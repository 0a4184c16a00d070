//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{LedgerError, Result};
use crate::protocol::{read_request, write_response, Request, Response};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the storage engine
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O on two handles of the same stream
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            engine,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 disables a timeout)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads requests in a loop and sends responses.
    /// Returns when the client disconnects or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let request = match read_request(&mut self.reader) {
                Ok(request) => request,
                Err(LedgerError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected ({:?})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(LedgerError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    // Windows reports read timeouts as TimedOut instead of WouldBlock
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send_response(Response::failure(&e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!("Received request from {}: {:?}", self.peer_addr, request);

            let response = self.execute_request(request);

            if let Err(e) = self.send_response(response) {
                if let LedgerError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Execute a request and return a response
    fn execute_request(&self, request: Request) -> Response {
        match self.engine.execute(request) {
            Ok(value) => Response::success(value),
            Err(e) => Response::failure(&e.to_string()),
        }
    }

    /// Send a response to the client
    pub fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}
