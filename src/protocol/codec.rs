//! Protocol codec
//!
//! Framing for command and response text.
//!
//! ## Wire Format
//!
//! ### Line mode
//! ```text
//! ┌─────────────────────────────────┬──────┐
//! │            Text                 │ '\n' │
//! └─────────────────────────────────┴──────┘
//! ```
//!
//! ### Length-prefixed mode
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │            Text             │
//! └──────────┴─────────────────────────────┘
//! ```
//! Length is a big-endian `u32` byte count of the text.

use bytes::{Buf, Bytes, BytesMut};

use crate::config::EolMode;
use crate::error::{LinkError, Result};
use crate::transport::Transport;
use super::command::Command;

/// Length prefix size in length-prefixed mode
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Line terminator in line mode
pub const LINE_TERMINATOR: u8 = b'\n';

// =============================================================================
// Encoding
// =============================================================================

/// Frame `text` for the wire
pub fn encode_frame(text: &str, mode: EolMode) -> Result<Vec<u8>> {
    match mode {
        EolMode::Line => {
            Command::check_line_safe(text)?;
            let mut frame = Vec::with_capacity(text.len() + 1);
            frame.extend_from_slice(text.as_bytes());
            frame.push(LINE_TERMINATOR);
            Ok(frame)
        }
        EolMode::LengthPrefixed => {
            let len = u32::try_from(text.len()).map_err(|_| {
                LinkError::Protocol(format!("Frame too large: {} bytes", text.len()))
            })?;
            let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + text.len());
            frame.extend_from_slice(&len.to_be_bytes());
            frame.extend_from_slice(text.as_bytes());
            Ok(frame)
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Read one complete frame, receiving from `transport` as needed
///
/// Bytes after the frame stay in `buffer`. Returns the frame text bytes
/// without the terminator or length prefix.
pub fn read_frame<T: Transport + ?Sized>(
    transport: &mut T,
    buffer: &mut BytesMut,
    mode: EolMode,
    max_size: usize,
    chunk_size: usize,
) -> Result<Bytes> {
    match mode {
        EolMode::Line => loop {
            if let Some(pos) = buffer.iter().position(|b| *b == LINE_TERMINATOR) {
                if pos > max_size {
                    return Err(LinkError::Protocol(format!(
                        "Response too large: {} bytes (max {})",
                        pos, max_size
                    )));
                }
                let mut frame = buffer.split_to(pos + 1);
                frame.truncate(pos);
                if frame.last() == Some(&b'\r') {
                    frame.truncate(pos - 1);
                }
                return Ok(frame.freeze());
            }
            if buffer.len() > max_size {
                return Err(LinkError::Protocol(format!(
                    "Response exceeds {} bytes without a line terminator",
                    max_size
                )));
            }
            transport.recv(buffer, chunk_size)?;
        },
        EolMode::LengthPrefixed => {
            fill(transport, buffer, LENGTH_PREFIX_SIZE, chunk_size)?;
            let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
            if len > max_size {
                return Err(LinkError::Protocol(format!(
                    "Response too large: {} bytes (max {})",
                    len, max_size
                )));
            }
            fill(transport, buffer, LENGTH_PREFIX_SIZE + len, chunk_size)?;
            buffer.advance(LENGTH_PREFIX_SIZE);
            Ok(buffer.split_to(len).freeze())
        }
    }
}

/// Read exactly `len` raw bytes, receiving from `transport` as needed
pub fn read_exact_bytes<T: Transport + ?Sized>(
    transport: &mut T,
    buffer: &mut BytesMut,
    len: usize,
    chunk_size: usize,
) -> Result<Bytes> {
    fill(transport, buffer, len, chunk_size)?;
    Ok(buffer.split_to(len).freeze())
}

/// Decode frame bytes as UTF-8 text
pub fn decode_text(frame: &[u8]) -> Result<String> {
    String::from_utf8(frame.to_vec())
        .map_err(|e| LinkError::Protocol(format!("Response is not valid UTF-8: {}", e)))
}

fn fill<T: Transport + ?Sized>(
    transport: &mut T,
    buffer: &mut BytesMut,
    want: usize,
    chunk_size: usize,
) -> Result<()> {
    while buffer.len() < want {
        let missing = want - buffer.len();
        transport.recv(buffer, missing.min(chunk_size))?;
    }
    Ok(())
}
