//! TCP Server
//!
//! Accepts connections and serves each one on its own thread.

use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::config::ServerConfig;
use crate::error::{LinkError, Result};
use super::connection::ServerConnection;
use super::handler::Handler;
use super::ServerEvent;

/// How often the accept loop checks for shutdown
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Simulated hardware-control server
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    handler: Arc<dyn Handler>,
    events_tx: Sender<ServerEvent>,
    events_rx: Receiver<ServerEvent>,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,

    /// Clones of live client sockets by connection id, shut down when
    /// the server stops. A worker removes its own entry on exit.
    clients: Arc<Mutex<HashMap<u64, TcpStream>>>,

    next_id: AtomicU64,
}

impl Server {
    /// Bind the listener; connections are accepted once `run` is called
    pub fn bind(config: ServerConfig, handler: impl Handler) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            LinkError::connection(&format!("cannot listen on {}", config.listen_addr), &e)
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|e| LinkError::connection("set_nonblocking failed", &e))?;

        let (events_tx, events_rx) = channel::unbounded();
        Ok(Self {
            config,
            listener,
            handler: Arc::new(handler),
            events_tx,
            events_rx,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
            clients: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| LinkError::connection("local_addr failed", &e))
    }

    /// Stream of everything the server received
    pub fn events(&self) -> Receiver<ServerEvent> {
        self.events_rx.clone()
    }

    /// Signal the server to shut down
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    workers.retain(|w| !w.is_finished());
                    if let Some(worker) = self.serve(stream, addr) {
                        workers.push(worker);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }
        }

        tracing::info!("Shutting down, closing {} client(s)", self.clients.lock().len());
        for (_, client) in self.clients.lock().drain() {
            let _ = client.shutdown(Shutdown::Both);
        }
        for worker in workers {
            let _ = worker.join();
        }
        Ok(())
    }

    /// Spawn a worker thread for one accepted client
    fn serve(&self, stream: TcpStream, addr: SocketAddr) -> Option<JoinHandle<()>> {
        if self.active.load(Ordering::Relaxed) >= self.config.max_connections {
            tracing::warn!("Rejecting {}: connection limit reached", addr);
            let _ = stream.shutdown(Shutdown::Both);
            return None;
        }

        // accepted sockets may inherit the listener's non-blocking mode
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Cannot configure socket for {}: {}", addr, e);
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        match stream.try_clone() {
            Ok(clone) => {
                self.clients.lock().insert(id, clone);
            }
            Err(e) => tracing::warn!("Cannot track socket for {}: {}", addr, e),
        }

        let handler = Arc::clone(&self.handler);
        let events = self.events_tx.clone();
        let config = self.config.clone();
        let active = Arc::clone(&self.active);
        let clients = Arc::clone(&self.clients);
        active.fetch_add(1, Ordering::Relaxed);

        let spawned = thread::Builder::new()
            .name(format!("arclink-conn-{}", addr))
            .spawn(move || {
                match ServerConnection::new(stream, handler, events, config) {
                    Ok(mut conn) => {
                        if let Err(e) = conn.handle() {
                            tracing::warn!("Connection {} ended with error: {}", conn.peer_addr(), e);
                        }
                    }
                    Err(e) => tracing::warn!("Cannot set up connection {}: {}", addr, e),
                }
                clients.lock().remove(&id);
                active.fetch_sub(1, Ordering::Relaxed);
            });

        match spawned {
            Ok(worker) => Some(worker),
            Err(e) => {
                tracing::warn!("Cannot spawn worker for {}: {}", addr, e);
                self.clients.lock().remove(&id);
                self.active.fetch_sub(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Run the server on a background thread
    pub fn spawn(self) -> Result<ServerHandle> {
        let addr = self.local_addr()?;
        let events = self.events();
        let shutdown = Arc::clone(&self.shutdown);
        let clients = Arc::clone(&self.clients);

        let thread = thread::Builder::new()
            .name("arclink-server".to_string())
            .spawn(move || self.run())
            .map_err(|e| LinkError::connection("cannot spawn server thread", &e))?;

        Ok(ServerHandle {
            addr,
            events,
            shutdown,
            clients,
            thread: Some(thread),
        })
    }
}

/// A server running on a background thread; stops when dropped
pub struct ServerHandle {
    addr: SocketAddr,
    events: Receiver<ServerEvent>,
    shutdown: Arc<AtomicBool>,
    clients: Arc<Mutex<HashMap<u64, TcpStream>>>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn events(&self) -> &Receiver<ServerEvent> {
        &self.events
    }

    /// Number of client sockets currently being served
    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Stop accepting, close clients and wait for the server thread
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            match thread.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("Server stopped with error: {}", e),
                Err(_) => tracing::warn!("Server thread panicked"),
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
