//! TCP transport
//!
//! Blocking `std::net` implementation of [`Transport`].

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use bytes::BytesMut;

use crate::config::ClientConfig;
use crate::error::{LinkError, Result};
use super::Transport;

/// Upper bound on how far `bytes_available` peeks
const PEEK_LIMIT: usize = 512;

/// Blocking TCP connection
pub struct TcpTransport {
    stream: Option<TcpStream>,

    /// Peer address for logging
    peer: String,
}

impl TcpTransport {
    /// Connect to `host:port` using the timeouts in `config`
    ///
    /// Every resolved address is tried in turn; the last failure is
    /// reported if none accepts.
    pub fn connect(host: &str, port: u16, config: &ClientConfig) -> Result<Self> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| LinkError::connection(&format!("cannot resolve {}:{}", host, port), &e))?
            .collect();

        if addrs.is_empty() {
            return Err(LinkError::Connection(format!(
                "{}:{} resolved to no addresses",
                host, port
            )));
        }

        let mut last_error = None;
        for addr in &addrs {
            let attempt = match config.connect_timeout() {
                Some(timeout) => TcpStream::connect_timeout(addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    tracing::debug!("Connected to {}", addr);
                    let transport = Self::from_stream(stream)?;
                    transport.set_timeouts(config)?;
                    return Ok(transport);
                }
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        let err = last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::NotConnected));
        Err(LinkError::connection(
            &format!("cannot connect to {}:{}", host, port),
            &err,
        ))
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm; every frame is a complete request
        stream
            .set_nodelay(true)
            .map_err(|e| LinkError::connection("set_nodelay failed", &e))?;

        Ok(Self {
            stream: Some(stream),
            peer,
        })
    }

    /// Apply read/write timeouts from `config`
    pub fn set_timeouts(&self, config: &ClientConfig) -> Result<()> {
        let stream = self.stream()?;
        stream
            .set_read_timeout(config.read_timeout())
            .map_err(|e| LinkError::connection("set_read_timeout failed", &e))?;
        stream
            .set_write_timeout(config.write_timeout())
            .map_err(|e| LinkError::connection("set_write_timeout failed", &e))?;
        Ok(())
    }

    /// Handle another thread can use to abort blocking calls
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        let stream = self
            .stream()?
            .try_clone()
            .map_err(|e| LinkError::connection("cannot clone socket", &e))?;
        Ok(ShutdownHandle { stream })
    }

    fn stream(&self) -> Result<&TcpStream> {
        self.stream
            .as_ref()
            .ok_or_else(|| LinkError::Connection("transport is closed".to_string()))
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| LinkError::Connection("transport is closed".to_string()))
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream_mut()?;
        // write_all retries partial writes and EINTR
        stream
            .write_all(bytes)
            .and_then(|_| stream.flush())
            .map_err(|e| LinkError::connection("send failed", &e))
    }

    fn recv(&mut self, buffer: &mut BytesMut, max_bytes: usize) -> Result<usize> {
        let stream = self.stream_mut()?;
        let mut chunk = vec![0u8; max_bytes.max(1)];

        loop {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(LinkError::Connection(
                        "connection closed by peer".to_string(),
                    ))
                }
                Ok(n) => {
                    buffer.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                // a read timeout surfaces as either kind depending on platform
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    let waited = match stream.read_timeout() {
                        Ok(Some(timeout)) => format!("{} ms", timeout.as_millis()),
                        _ => "the read timeout".to_string(),
                    };
                    return Err(LinkError::Connection(format!("recv timed out after {}", waited)));
                }
                Err(e) => return Err(LinkError::connection("recv failed", &e)),
            }
        }
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let stream = self.stream()?;
        let mut probe = [0u8; PEEK_LIMIT];

        stream
            .set_nonblocking(true)
            .map_err(|e| LinkError::connection("set_nonblocking failed", &e))?;
        let peeked = stream.peek(&mut probe);
        stream
            .set_nonblocking(false)
            .map_err(|e| LinkError::connection("set_nonblocking failed", &e))?;

        match peeked {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(LinkError::connection("poll failed", &e)),
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            tracing::debug!("Closed connection to {}", self.peer);
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Shuts down a connection's socket from another thread
///
/// A call blocked in `recv` or `send` on the owning connection returns a
/// connection error once the socket is shut down.
pub struct ShutdownHandle {
    stream: TcpStream,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => tracing::debug!("Socket shut down by handle"),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
            Err(e) => tracing::warn!("Socket shutdown failed: {}", e),
        }
    }
}
