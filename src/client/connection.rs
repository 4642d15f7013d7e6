//! Client Connection
//!
//! Owns one transport and runs the strictly synchronous
//! request/response cycle: encode, send, receive one frame, parse.

use bytes::BytesMut;

use crate::config::{ClientConfig, EolMode};
use crate::error::{LinkError, Result};
use crate::protocol::{
    decode_text, encode_frame, read_frame, Arg, ClassToken, Command, Method, MethodRegistry,
    Response,
};
use crate::transport::{ShutdownHandle, TcpTransport, Transport};

/// Lifecycle state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Ready for the next command
    Open,

    /// Closed by the caller
    Closed,

    /// The socket failed mid-call; must be closed and re-established
    Broken,
}

/// A connection to one server
///
/// Every call takes `&mut self`, so at most one command is outstanding.
/// Sharing a connection across threads needs external locking.
pub struct Connection<T: Transport = TcpTransport> {
    transport: T,

    state: ConnectionState,

    /// Peer address for logging
    peer: String,

    config: ClientConfig,

    registry: MethodRegistry,

    /// Received bytes not yet consumed by a frame
    rx: BytesMut,
}

impl Connection<TcpTransport> {
    /// Connect to the server named in `config`
    pub fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = TcpTransport::connect(&config.host, config.port, &config)?;
        Ok(Self::with_transport(transport, config))
    }

    /// Connect to `host:port` with default settings
    pub fn connect_to(host: &str, port: u16) -> Result<Self> {
        let config = ClientConfig::builder().host(host).port(port).build();
        Self::connect(config)
    }

    /// Handle for aborting a blocked call from another thread
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        self.transport.shutdown_handle()
    }
}

impl<T: Transport> Connection<T> {
    /// Wrap an open transport
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        let peer = transport.peer();
        let state = if transport.is_open() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        };
        tracing::debug!("Connection to {} is {:?}", peer, state);

        Self {
            transport,
            state,
            peer,
            config,
            registry: MethodRegistry::default(),
            rx: BytesMut::new(),
        }
    }

    // =========================================================================
    // Calls
    // =========================================================================

    /// Invoke `class.method` with printf-style arguments
    ///
    /// Returns the payload (empty for a bare ok). A remote failure is
    /// returned as [`LinkError::RemoteException`].
    pub fn call_method(
        &mut self,
        class: ClassToken,
        method: Method,
        format: &str,
        args: &[Arg],
    ) -> Result<String> {
        self.call_method_response(class, method, format, args)?
            .into_result()
    }

    /// Like [`call_method`](Self::call_method) but returns the parsed response
    ///
    /// Remote exceptions are returned as a response status, not an error.
    pub fn call_method_response(
        &mut self,
        class: ClassToken,
        method: Method,
        format: &str,
        args: &[Arg],
    ) -> Result<Response> {
        self.ensure_open()?;
        let command = Command::new(class, method, format, args)?;
        self.execute(&command)
    }

    /// Invoke a method whose payload is a list of strings
    pub fn call_method_list(
        &mut self,
        class: ClassToken,
        method: Method,
        format: &str,
        args: &[Arg],
    ) -> Result<Vec<String>> {
        let response = self.call_method_response(class, method, format, args)?;
        let list = response.string_list();
        response.into_result()?;
        Ok(list)
    }

    /// Send a prepared command and wait for its response
    pub fn execute(&mut self, command: &Command) -> Result<Response> {
        self.round_trip(&command.to_wire())
    }

    /// Send arbitrary text as a command, bypassing the encoder
    ///
    /// Meant for exercising the server's handling of malformed input;
    /// the outcome surfaces as a remote exception or protocol error.
    pub fn send_invalid_command(&mut self, text: &str) -> Result<String> {
        self.round_trip(text)?.into_result()
    }

    fn round_trip(&mut self, text: &str) -> Result<Response> {
        self.ensure_ready()?;
        self.send_frame(text)?;
        self.receive()
    }

    // =========================================================================
    // Building blocks shared with file transfer
    // =========================================================================

    pub(crate) fn ensure_open(&self) -> Result<()> {
        match self.state {
            ConnectionState::Open => Ok(()),
            ConnectionState::Closed => Err(LinkError::Connection(format!(
                "connection to {} is closed",
                self.peer
            ))),
            ConnectionState::Broken => Err(LinkError::Connection(format!(
                "connection to {} is broken; reconnect first",
                self.peer
            ))),
        }
    }

    /// Check that the previous response was fully consumed
    pub(crate) fn ensure_ready(&mut self) -> Result<()> {
        self.ensure_open()?;

        if !self.rx.is_empty() {
            tracing::warn!("{} unread bytes buffered from {}", self.rx.len(), self.peer);
            return Err(LinkError::Protocol(format!(
                "{} bytes of a previous response are unconsumed",
                self.rx.len()
            )));
        }

        let pending = self.track(|t| t.bytes_available())?;
        if pending > 0 {
            tracing::warn!("{} unsolicited bytes pending from {}", pending, self.peer);
            return Err(LinkError::Protocol(format!(
                "{} bytes pending before command was sent",
                pending
            )));
        }
        Ok(())
    }

    pub(crate) fn send_frame(&mut self, text: &str) -> Result<()> {
        let frame = encode_frame(text, self.config.eol_mode)?;
        tracing::trace!("-> {}: {}", self.peer, text);
        self.track(|t| t.send(&frame))
    }

    pub(crate) fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.track(|t| t.send(bytes))
    }

    /// Receive and parse exactly one response frame
    pub(crate) fn receive(&mut self) -> Result<Response> {
        let mode = self.config.eol_mode;
        let max = self.config.max_response_size;
        let chunk = self.config.recv_chunk_size;

        let frame = match read_frame(&mut self.transport, &mut self.rx, mode, max, chunk) {
            Ok(frame) => frame,
            Err(e) => {
                // stream position is unknown after a framing failure
                self.state = ConnectionState::Broken;
                tracing::warn!("Receive from {} failed: {}", self.peer, e);
                return Err(e);
            }
        };

        let text = decode_text(&frame)?;
        tracing::trace!("<- {}: {}", self.peer, text);

        Response::parse_with(&text, &self.registry).map_err(|e| {
            tracing::warn!("Malformed response from {}: {}", self.peer, e);
            e
        })
    }

    /// The stream is out of step with the server; only `close` helps
    pub(crate) fn mark_broken(&mut self) {
        if self.state == ConnectionState::Open {
            tracing::warn!("Connection to {} is broken", self.peer);
            self.state = ConnectionState::Broken;
        }
    }

    /// Run a transport operation, marking the connection broken on failure
    fn track<R>(&mut self, op: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        let result = op(&mut self.transport);
        if let Err(e) = &result {
            if e.is_connection_fatal() {
                self.state = ConnectionState::Broken;
            }
        }
        result
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Drop any bytes left over from an earlier exchange
    ///
    /// Returns how many bytes were discarded.
    pub fn discard_pending(&mut self) -> Result<usize> {
        self.ensure_open()?;
        let mut discarded = self.rx.len();
        self.rx.clear();

        loop {
            let pending = self.track(|t| t.bytes_available())?;
            if pending == 0 {
                break;
            }
            let chunk = self.config.recv_chunk_size;
            let rx = &mut self.rx;
            let n = match self.transport.recv(rx, pending.min(chunk)) {
                Ok(n) => n,
                Err(e) => {
                    self.state = ConnectionState::Broken;
                    return Err(e);
                }
            };
            discarded += n;
            self.rx.clear();
        }

        if discarded > 0 {
            tracing::debug!("Discarded {} stale bytes from {}", discarded, self.peer);
        }
        Ok(discarded)
    }

    /// Close the connection. Safe to call more than once.
    pub fn close(&mut self) {
        if self.state != ConnectionState::Closed {
            self.transport.close();
            self.rx.clear();
            self.state = ConnectionState::Closed;
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn eol_mode(&self) -> EolMode {
        self.config.eol_mode
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
