//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One worker thread per connection
//! - Requests routed through Engine

mod server;
mod connection;
mod client;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
pub use client::Client;
