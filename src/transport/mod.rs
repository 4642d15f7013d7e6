//! Transport Module
//!
//! Raw byte-level socket I/O. The rest of the crate only talks to the
//! [`Transport`] trait and never sees platform socket handles.
//!
//! ## Responsibilities
//! - Connect / close (close is idempotent)
//! - Send all bytes, retrying partial writes
//! - Receive whatever is readable, blocking for at least one byte
//! - Non-blocking query of pending inbound bytes

mod tcp;

pub use tcp::{ShutdownHandle, TcpTransport};

use bytes::BytesMut;

use crate::error::Result;

/// Byte-level connection to a server
pub trait Transport {
    /// Write every byte or fail with a connection error
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Block until at least one byte is readable, then append up to
    /// `max_bytes` to `buffer`. Returns the number of bytes appended.
    fn recv(&mut self, buffer: &mut BytesMut, max_bytes: usize) -> Result<usize>;

    /// Number of bytes ready to read, without consuming them
    ///
    /// Implementations may cap the count; zero means nothing is pending.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Release the socket. Calling it again does nothing.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Peer description for logging
    fn peer(&self) -> String {
        "unknown".to_string()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes)
    }

    fn recv(&mut self, buffer: &mut BytesMut, max_bytes: usize) -> Result<usize> {
        (**self).recv(buffer, max_bytes)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn peer(&self) -> String {
        (**self).peer()
    }
}
