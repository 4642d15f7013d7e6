//! Configuration for arclink
//!
//! Centralized client configuration with sensible defaults.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::error::{LinkError, Result};

/// Default server port for both commands and discovery
pub const DEFAULT_PORT: u16 = 5000;

/// Main configuration for a client connection
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Server host name or address
    pub host: String,

    /// Server TCP port
    pub port: u16,

    /// Connect timeout (milliseconds, 0 = OS default)
    pub connect_timeout_ms: u64,

    /// Socket read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Socket write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Framing Configuration
    // -------------------------------------------------------------------------
    /// How frames are delimited on the wire
    pub eol_mode: EolMode,

    /// Largest response frame accepted (in bytes)
    pub max_response_size: usize,

    /// Bytes requested from the transport per receive
    pub recv_chunk_size: usize,

    // -------------------------------------------------------------------------
    // File Transfer Configuration
    // -------------------------------------------------------------------------
    /// Chunk size used when streaming file content (in bytes)
    pub file_chunk_size: usize,

    // -------------------------------------------------------------------------
    // Discovery Configuration
    // -------------------------------------------------------------------------
    /// How long to collect discovery replies (milliseconds)
    pub discovery_window_ms: u64,

    /// Addresses the discovery probe is sent to
    pub discovery_targets: Vec<IpAddr>,
}

/// Frame delimiting mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EolMode {
    /// Frames end with a single `\n`
    #[default]
    Line,

    /// Frames are preceded by a 4-byte big-endian byte count
    LengthPrefixed,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: 5000,
            read_timeout_ms: 30_000,
            write_timeout_ms: 5000,
            eol_mode: EolMode::Line,
            max_response_size: 16 * 1024 * 1024, // 16 MB
            recv_chunk_size: 4096,
            file_chunk_size: 64 * 1024,
            discovery_window_ms: 1000,
            discovery_targets: vec![IpAddr::V4(Ipv4Addr::BROADCAST)],
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Check the configuration for values the client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(LinkError::Config("host must not be empty".to_string()));
        }
        if self.max_response_size == 0 {
            return Err(LinkError::Config(
                "max_response_size must be greater than zero".to_string(),
            ));
        }
        if self.recv_chunk_size == 0 {
            return Err(LinkError::Config(
                "recv_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.file_chunk_size == 0 {
            return Err(LinkError::Config(
                "file_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.discovery_window_ms == 0 {
            return Err(LinkError::Config(
                "discovery_window_ms must be greater than zero".to_string(),
            ));
        }
        if self.discovery_targets.is_empty() {
            return Err(LinkError::Config(
                "at least one discovery target is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }

    pub fn discovery_window(&self) -> Duration {
        Duration::from_millis(self.discovery_window_ms)
    }
}

fn millis(ms: u64) -> Option<Duration> {
    if ms > 0 {
        Some(Duration::from_millis(ms))
    } else {
        None
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the frame delimiting mode
    pub fn eol_mode(mut self, mode: EolMode) -> Self {
        self.config.eol_mode = mode;
        self
    }

    /// Set the maximum accepted response size (in bytes)
    pub fn max_response_size(mut self, size: usize) -> Self {
        self.config.max_response_size = size;
        self
    }

    /// Set the per-receive chunk size (in bytes)
    pub fn recv_chunk_size(mut self, size: usize) -> Self {
        self.config.recv_chunk_size = size;
        self
    }

    /// Set the file transfer chunk size (in bytes)
    pub fn file_chunk_size(mut self, size: usize) -> Self {
        self.config.file_chunk_size = size;
        self
    }

    /// Set the discovery window (in milliseconds)
    pub fn discovery_window_ms(mut self, ms: u64) -> Self {
        self.config.discovery_window_ms = ms;
        self
    }

    /// Replace the discovery probe targets
    pub fn discovery_targets(mut self, targets: Vec<IpAddr>) -> Self {
        self.config.discovery_targets = targets;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

// =============================================================================
// Simulated Server Configuration
// =============================================================================

/// Configuration for the simulated server in [`crate::network`]
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// Frame delimiting mode; must match the clients
    pub eol_mode: EolMode,

    /// Largest command frame or file accepted (in bytes)
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            max_connections: 64,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            eol_mode: EolMode::Line,
            max_request_size: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn eol_mode(mut self, mode: EolMode) -> Self {
        self.config.eol_mode = mode;
        self
    }

    pub fn max_request_size(mut self, size: usize) -> Self {
        self.config.max_request_size = size;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
