//! Server Discovery
//!
//! Finds reachable servers by sending a UDP probe and collecting replies
//! for a bounded window. Independent of any open [`Connection`].
//!
//! ```text
//! client ──── ARCLINK_DISCOVER ────► target:port   (each target)
//! client ◄─── [metadata] ────────── server         (any datagram)
//! ```
//!
//! [`Connection`]: crate::client::Connection

use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use crate::config::{ClientConfig, DEFAULT_PORT};
use crate::error::{LinkError, Result};

/// Probe datagram payload
pub const DISCOVERY_PROBE: &[u8] = b"ARCLINK_DISCOVER";

/// Largest reply datagram read
const MAX_REPLY_SIZE: usize = 1024;

/// A server that answered a probe
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoveredServer {
    /// Source address of the reply
    pub addr: SocketAddr,

    /// Reply text, if any
    pub metadata: Option<String>,
}

/// Sends discovery probes
#[derive(Debug, Clone)]
pub struct DiscoveryService {
    targets: Vec<IpAddr>,
    window: Duration,
}

impl DiscoveryService {
    /// Use the discovery targets and window from `config`
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            targets: config.discovery_targets.clone(),
            window: config.discovery_window(),
        })
    }

    /// Probe specific addresses instead of broadcasting
    pub fn with_targets(targets: Vec<IpAddr>, window: Duration) -> Result<Self> {
        if targets.is_empty() {
            return Err(LinkError::Config(
                "at least one discovery target is required".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(LinkError::Config(
                "discovery window must be greater than zero".to_string(),
            ));
        }
        Ok(Self { targets, window })
    }

    /// Start a fresh discovery round on `port`
    ///
    /// The probe goes out when the returned scan is first polled. Each
    /// call is independent; nothing is remembered between rounds.
    pub fn detect_servers(&self, port: u16) -> Result<ServerScan> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .map_err(|e| LinkError::connection("cannot bind discovery socket", &e))?;
        socket
            .set_broadcast(true)
            .map_err(|e| LinkError::connection("cannot enable broadcast", &e))?;

        Ok(ServerScan {
            socket,
            port,
            targets: self.targets.clone(),
            window: self.window,
            deadline: None,
            seen: HashSet::new(),
            finished: false,
        })
    }

    /// Discovery round on the default port
    pub fn detect_default(&self) -> Result<ServerScan> {
        self.detect_servers(DEFAULT_PORT)
    }
}

/// One discovery round; yields each distinct server once
///
/// Finite: iteration ends when the window closes. Zero replies is an
/// empty sequence, not an error.
pub struct ServerScan {
    socket: UdpSocket,
    port: u16,
    targets: Vec<IpAddr>,
    window: Duration,
    deadline: Option<Instant>,
    seen: HashSet<SocketAddr>,
    finished: bool,
}

impl ServerScan {
    fn send_probes(&self) {
        for target in &self.targets {
            let dest = SocketAddr::new(*target, self.port);
            match self.socket.send_to(DISCOVERY_PROBE, dest) {
                Ok(_) => tracing::debug!("Discovery probe sent to {}", dest),
                Err(e) => tracing::warn!("Discovery probe to {} failed: {}", dest, e),
            }
        }
    }

    fn finish(&mut self) -> Option<DiscoveredServer> {
        if !self.finished {
            tracing::debug!("Discovery window closed, {} server(s) found", self.seen.len());
        }
        self.finished = true;
        None
    }
}

impl Iterator for ServerScan {
    type Item = DiscoveredServer;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let deadline = match self.deadline {
            Some(deadline) => deadline,
            None => {
                self.send_probes();
                let deadline = Instant::now() + self.window;
                self.deadline = Some(deadline);
                deadline
            }
        };

        let mut buf = [0u8; MAX_REPLY_SIZE];
        loop {
            let now = Instant::now();
            if now >= deadline {
                return self.finish();
            }
            if let Err(e) = self.socket.set_read_timeout(Some(deadline - now)) {
                tracing::warn!("Discovery socket timeout failed: {}", e);
                return self.finish();
            }

            match self.socket.recv_from(&mut buf) {
                Ok((n, from)) => {
                    let reply = &buf[..n];
                    if reply == DISCOVERY_PROBE || !self.seen.insert(from) {
                        continue;
                    }
                    let metadata = std::str::from_utf8(reply)
                        .ok()
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string);
                    tracing::debug!("Discovered server at {}", from);
                    return Some(DiscoveredServer { addr: from, metadata });
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return self.finish();
                }
                // ICMP unreachable from one target must not end the round
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionRefused
                    ) =>
                {
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Discovery receive failed: {}", e);
                    return self.finish();
                }
            }
        }
    }
}

impl std::iter::FusedIterator for ServerScan {}
