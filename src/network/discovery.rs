//! Discovery responder
//!
//! Answers discovery probes so clients can find the simulated server.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::discovery::DISCOVERY_PROBE;
use crate::error::{LinkError, Result};

/// How often the responder checks for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Replies to every probe with a metadata string
pub struct DiscoveryResponder {
    socket: UdpSocket,
    metadata: String,
}

impl DiscoveryResponder {
    pub fn bind(addr: SocketAddr, metadata: impl Into<String>) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .map_err(|e| LinkError::connection(&format!("cannot bind {}", addr), &e))?;
        socket
            .set_read_timeout(Some(POLL_INTERVAL))
            .map_err(|e| LinkError::connection("set_read_timeout failed", &e))?;
        Ok(Self {
            socket,
            metadata: metadata.into(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| LinkError::connection("local_addr failed", &e))
    }

    /// Answer probes on a background thread until the handle is dropped
    pub fn spawn(self) -> Result<ResponderHandle> {
        let addr = self.local_addr()?;
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name(format!("arclink-discovery-{}", addr))
            .spawn(move || self.serve(&flag))
            .map_err(|e| LinkError::connection("cannot spawn responder thread", &e))?;

        Ok(ResponderHandle {
            addr,
            stop,
            thread: Some(thread),
        })
    }

    fn serve(&self, stop: &AtomicBool) {
        let mut buf = [0u8; 256];
        while !stop.load(Ordering::Relaxed) {
            match self.socket.recv_from(&mut buf) {
                Ok((n, from)) if &buf[..n] == DISCOVERY_PROBE => {
                    tracing::debug!("Discovery probe from {}", from);
                    if let Err(e) = self.socket.send_to(self.metadata.as_bytes(), from) {
                        tracing::warn!("Discovery reply to {} failed: {}", from, e);
                    }
                }
                Ok((_, from)) => tracing::trace!("Ignoring datagram from {}", from),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                            | io::ErrorKind::ConnectionRefused
                    ) => {}
                Err(e) => {
                    tracing::warn!("Discovery responder failed: {}", e);
                    return;
                }
            }
        }
    }
}

/// A responder running on a background thread; stops when dropped
pub struct ResponderHandle {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ResponderHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ResponderHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
