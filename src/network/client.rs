//! Blocking Client
//!
//! Issues requests to a LedgerKV server over one TCP connection.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{LedgerError, Result};
use crate::protocol::{read_response, write_request, Request, Response};

/// Client connection to a LedgerKV server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Get a value; `None` if the key is absent or removed
    pub fn get(&mut self, key: &str) -> Result<Option<String>> {
        self.call(Request::Get {
            key: key.to_string(),
        })
    }

    /// Set a key-value pair
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.call(Request::Set {
            key: key.to_string(),
            value: value.to_string(),
        })?;
        Ok(())
    }

    /// Remove a key
    pub fn rm(&mut self, key: &str) -> Result<()> {
        self.call(Request::Rm {
            key: key.to_string(),
        })?;
        Ok(())
    }

    /// Send a request and wait for its response
    ///
    /// A FAILURE response becomes `Err(Network)` carrying the server's message.
    pub fn call(&mut self, request: Request) -> Result<Option<String>> {
        let response = self.send(&request)?;
        if response.is_success() {
            return Ok(response.value);
        }
        Err(LedgerError::Network(format!(
            "server error: {}",
            response.value.unwrap_or_default()
        )))
    }

    /// Send a request and return the raw response
    pub fn send(&mut self, request: &Request) -> Result<Response> {
        write_request(&mut self.writer, request)?;
        read_response(&mut self.reader)
    }
}
