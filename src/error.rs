//! Error types for arclink
//!
//! Provides a unified error type for all client operations.

use std::io;

use thiserror::Error;

/// Result type alias using LinkError
pub type Result<T> = std::result::Result<T, LinkError>;

/// Unified error type for arclink operations
#[derive(Debug, Error)]
pub enum LinkError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    /// Socket connect/send/recv failure, or use of a closed connection.
    /// The connection must be re-established by the caller.
    #[error("Connection error: {0}")]
    Connection(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// Malformed response, or a local precondition failed before sending
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server reported a failure for a named method
    #[error("Remote exception in {method}: {message}")]
    RemoteException { method: String, message: String },

    // -------------------------------------------------------------------------
    // File Transfer Errors
    // -------------------------------------------------------------------------
    #[error("File transfer error: {0}")]
    FileTransfer(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LinkError {
    /// Build a connection error from an I/O failure
    ///
    /// The OS error text is looked up through [`get_system_message`] so
    /// raw codes surface as readable strings.
    pub fn connection(context: &str, err: &io::Error) -> Self {
        let detail = match err.raw_os_error() {
            Some(code) => format!("{} (code {})", get_system_message(code), code),
            None => err.to_string(),
        };
        LinkError::Connection(format!("{}: {}", context, detail))
    }

    /// Whether the socket itself failed and the connection must be reopened
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, LinkError::Connection(_))
    }
}

/// Map a platform error code to a human-readable message
///
/// Codes that do not correspond to a known error kind map to
/// `"unknown error <code>"`.
pub fn get_system_message(code: i32) -> String {
    let kind = io::Error::from_raw_os_error(code).kind();

    let message = match kind {
        io::ErrorKind::NotFound => "entity not found",
        io::ErrorKind::PermissionDenied => "permission denied",
        io::ErrorKind::ConnectionRefused => "connection refused",
        io::ErrorKind::ConnectionReset => "connection reset by peer",
        io::ErrorKind::ConnectionAborted => "connection aborted",
        io::ErrorKind::NotConnected => "socket is not connected",
        io::ErrorKind::AddrInUse => "address already in use",
        io::ErrorKind::AddrNotAvailable => "address not available",
        io::ErrorKind::BrokenPipe => "broken pipe",
        io::ErrorKind::AlreadyExists => "entity already exists",
        io::ErrorKind::WouldBlock => "operation would block",
        io::ErrorKind::InvalidInput => "invalid argument",
        io::ErrorKind::TimedOut => "operation timed out",
        io::ErrorKind::Interrupted => "operation interrupted",
        io::ErrorKind::Unsupported => "operation not supported",
        io::ErrorKind::OutOfMemory => "out of memory",
        _ => return format!("unknown error {}", code),
    };

    message.to_string()
}
