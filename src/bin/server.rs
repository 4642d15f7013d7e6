//! arclink Simulated Server Binary
//!
//! Runs a stand-in hardware-control server and discovery responder for
//! exercising clients without real hardware.

use std::net::SocketAddr;
use std::thread;

use arclink::config::{EolMode, ServerConfig};
use arclink::network::{DiscoveryResponder, EchoHandler, Server, ServerEvent};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

/// arclink simulated server
#[derive(Parser, Debug)]
#[command(name = "arclink-sim")]
#[command(about = "Simulated hardware-control server for arclink clients")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:5000")]
    listen: String,

    /// UDP discovery address; disabled when omitted
    #[arg(short, long)]
    discovery: Option<SocketAddr>,

    /// Frame delimiting mode
    #[arg(short, long, value_enum, default_value_t = Framing::Line)]
    eol: Framing,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "64")]
    max_connections: usize,

    /// Name reported by ToString and discovery replies
    #[arg(short, long, default_value = "arclink simulated server")]
    name: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Framing {
    Line,
    Length,
}

impl From<Framing> for EolMode {
    fn from(framing: Framing) -> Self {
        match framing {
            Framing::Line => EolMode::Line,
            Framing::Length => EolMode::LengthPrefixed,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,arclink=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("arclink simulated server v{}", arclink::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let config = ServerConfig::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .eol_mode(args.eol.into())
        .build();

    let handler = EchoHandler {
        name: args.name.clone(),
        ..EchoHandler::default()
    };

    // Keep the responder alive for the life of the server
    let _responder = match args.discovery {
        Some(addr) => match DiscoveryResponder::bind(addr, args.name.as_str())
            .and_then(|r| r.spawn())
        {
            Ok(handle) => {
                tracing::info!("Discovery responder on {}", handle.addr());
                Some(handle)
            }
            Err(e) => {
                tracing::error!("Failed to start discovery responder: {}", e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let server = match Server::bind(config, handler) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind server: {}", e);
            std::process::exit(1);
        }
    };

    // Log what clients send
    let events = server.events();
    thread::spawn(move || {
        for event in events {
            match event {
                ServerEvent::Command(request) => tracing::info!("Command: {}", request.raw),
                ServerEvent::Malformed(text) => tracing::warn!("Malformed command: {:?}", text),
                ServerEvent::File { declared, .. } => {
                    tracing::info!("Received file of {} bytes", declared)
                }
                ServerEvent::FileIncomplete { declared, received } => {
                    tracing::warn!("Incomplete file: {} of {} bytes", received, declared)
                }
            }
        }
    });

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
