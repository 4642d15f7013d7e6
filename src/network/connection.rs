//! Connection Handler
//!
//! Serves one client connection on the simulated server.

use std::net::TcpStream;
use std::sync::Arc;

use bytes::BytesMut;
use crossbeam::channel::Sender;

use crate::config::{ClientConfig, ServerConfig};
use crate::error::{LinkError, Result};
use crate::protocol::{
    decode_text, encode_frame, read_exact_bytes, read_frame, ClassToken, Method,
};
use crate::transport::{TcpTransport, Transport};
use super::handler::{Handler, Reply, Request};
use super::ServerEvent;

/// Receive chunk size on the server side
const CHUNK_SIZE: usize = 64 * 1024;

/// Handles a single client connection
pub struct ServerConnection {
    transport: TcpTransport,

    /// Received bytes not yet consumed
    rx: BytesMut,

    handler: Arc<dyn Handler>,

    events: Sender<ServerEvent>,

    config: ServerConfig,

    /// Peer address for logging
    peer_addr: String,
}

impl ServerConnection {
    /// Create a new connection handler
    ///
    /// Configures timeouts from the server config
    pub fn new(
        stream: TcpStream,
        handler: Arc<dyn Handler>,
        events: Sender<ServerEvent>,
        config: ServerConfig,
    ) -> Result<Self> {
        let transport = TcpTransport::from_stream(stream)?;
        let timeouts = ClientConfig::builder()
            .read_timeout_ms(config.read_timeout_ms)
            .write_timeout_ms(config.write_timeout_ms)
            .build();
        transport.set_timeouts(&timeouts)?;

        Ok(Self {
            peer_addr: transport.peer(),
            transport,
            rx: BytesMut::new(),
            handler,
            events,
            config,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads commands in a loop and sends replies.
    /// Returns when the client disconnects or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let frame = match read_frame(
                &mut self.transport,
                &mut self.rx,
                self.config.eol_mode,
                self.config.max_request_size,
                CHUNK_SIZE,
            ) {
                Ok(frame) => frame,
                Err(LinkError::Connection(reason)) => {
                    tracing::debug!("Client {} disconnected: {}", self.peer_addr, reason);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send_reply(&Reply::exception("Server", &e.to_string()));
                    return Err(e);
                }
            };

            let reply = match decode_text(&frame) {
                Ok(text) => {
                    tracing::trace!("Received command from {}: {}", self.peer_addr, text);
                    match self.dispatch(&text) {
                        Ok(reply) => reply,
                        Err(LinkError::Connection(reason)) => {
                            tracing::debug!(
                                "Client {} disconnected mid-request: {}",
                                self.peer_addr,
                                reason
                            );
                            return Ok(());
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => Reply::exception("Server", &e.to_string()),
            };

            if let Err(e) = self.send_reply(&reply) {
                if let LinkError::Connection(_) = e {
                    tracing::debug!(
                        "Client {} disconnected before reply could be sent: {}",
                        self.peer_addr,
                        e
                    );
                    return Ok(());
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Route a command to the handler or the file receiver
    fn dispatch(&mut self, text: &str) -> Result<Reply> {
        let request = match Request::parse(text) {
            Some(request) => request,
            None => {
                let _ = self.events.send(ServerEvent::Malformed(text.to_string()));
                return Ok(Reply::exception("Unknown", "malformed command"));
            }
        };

        if request.class == ClassToken::Server.token()
            && request.method == Method::SendFile.token()
        {
            return self.receive_file(&request);
        }

        let _ = self.events.send(ServerEvent::Command(request.clone()));
        Ok(self.handler.handle(&request))
    }

    /// Read the declared number of raw bytes that follow `SendFile`
    fn receive_file(&mut self, request: &Request) -> Result<Reply> {
        let declared = match request.args.first().and_then(|a| a.parse::<u64>().ok()) {
            Some(len) => len,
            None => return Ok(Reply::exception(Method::SendFile.token(), "missing file length")),
        };

        if declared > self.config.max_request_size as u64 {
            // the content that follows cannot be skipped safely
            let _ = self.send_reply(&Reply::exception(
                Method::SendFile.token(),
                &format!("file of {} bytes exceeds limit", declared),
            ));
            return Err(LinkError::Protocol(format!(
                "declared file length {} exceeds limit",
                declared
            )));
        }

        match read_exact_bytes(&mut self.transport, &mut self.rx, declared as usize, CHUNK_SIZE) {
            Ok(content) => {
                tracing::debug!("Received {} file bytes from {}", content.len(), self.peer_addr);
                let reply = self.handler.file_received(&content);
                let _ = self.events.send(ServerEvent::File {
                    declared,
                    content: content.to_vec(),
                });
                Ok(reply)
            }
            Err(e) => {
                let received = self.rx.len() as u64;
                tracing::warn!(
                    "File from {} incomplete: {} of {} bytes",
                    self.peer_addr,
                    received,
                    declared
                );
                let _ = self.events.send(ServerEvent::FileIncomplete { declared, received });
                Err(e)
            }
        }
    }

    /// Send a reply to the client
    fn send_reply(&mut self, reply: &Reply) -> Result<()> {
        let frame = encode_frame(&reply.to_wire(), self.config.eol_mode)?;
        self.transport.send(&frame)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
