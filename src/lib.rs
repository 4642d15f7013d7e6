//! # arclink
//!
//! Client for a text-based remote-procedure-call protocol that drives a
//! remote hardware-control server over TCP:
//! - printf-style command encoding with typed, validated arguments
//! - response parsing with an embedded ok/exception protocol
//! - length-prefixed file transfer over the command connection
//! - UDP broadcast discovery of reachable servers
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Calling Application                       │
//! └───────────────┬─────────────────────────────┬───────────────┘
//!                 │                             │
//! ┌───────────────▼───────────────┐     ┌───────▼───────────────┐
//! │          Connection           │     │   DiscoveryService    │
//! │ call_method / send_file       │     │   (own UDP socket)    │
//! └───────┬───────────────┬───────┘     └───────────────────────┘
//!         │               │
//!         ▼               ▼
//!  ┌─────────────┐  ┌─────────────┐
//!  │  Command +  │  │  Response   │
//!  │ FormatSpec  │  │   parser    │
//!  └──────┬──────┘  └──────▲──────┘
//!         │     codec      │
//!         ▼                │
//!  ┌──────────────────────────────┐
//!  │     Transport (TCP)          │
//!  └──────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use arclink::{args, ClassToken, Connection, Method};
//!
//! let mut conn = Connection::connect_to("127.0.0.1", 5000)?;
//! let reply = conn.call_method(ClassToken::Device, Method::Command, "%u %#x", &args![2u32, 0x544444u32])?;
//! println!("{}", reply);
//! # Ok::<(), arclink::LinkError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod transport;
pub mod client;
pub mod discovery;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{get_system_message, LinkError, Result};
pub use config::{ClientConfig, EolMode, ServerConfig, DEFAULT_PORT};
pub use protocol::{Arg, ClassToken, Method, MethodRegistry, Response, Status};
pub use client::{Connection, ConnectionState, Device};
pub use discovery::{DiscoveredServer, DiscoveryService};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of arclink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
