//! Network Module
//!
//! A simulated hardware-control server speaking the same protocol as the
//! client. Used by the `arclink-sim` binary and by tests.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One thread per connection
//! - Commands routed through a [`Handler`]
//! - Everything received is reported as a [`ServerEvent`]

mod server;
mod connection;
mod handler;
mod discovery;

pub use server::{Server, ServerHandle};
pub use connection::ServerConnection;
pub use handler::{EchoHandler, Handler, Reply, Request};
pub use discovery::{DiscoveryResponder, ResponderHandle};

/// Something the server received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A well-formed command
    Command(Request),

    /// Text that could not be split into class and method
    Malformed(String),

    /// A completed file transfer
    File { declared: u64, content: Vec<u8> },

    /// The client went away before sending all declared bytes
    FileIncomplete { declared: u64, received: u64 },
}
