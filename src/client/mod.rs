//! Client Module
//!
//! The controlling side of the protocol.
//!
//! ## Call Path
//! ```text
//! call_method(class, method, fmt, args)
//!     │  FormatSpec::render  (count/type check, nothing sent on mismatch)
//!     ▼
//! Command::to_wire ──► encode_frame ──► Transport::send
//!                                            │
//!                                   server executes
//!                                            │
//! Response::parse ◄── read_frame ◄── Transport::recv
//!     │
//!     ▼
//! payload  |  LinkError::RemoteException
//! ```

mod connection;
mod transfer;
mod device;

pub use connection::{Connection, ConnectionState};
pub use transfer::FileTransferDescriptor;
pub use device::Device;
