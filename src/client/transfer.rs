//! File transfer
//!
//! Pushes a local file to the server: a `Server SendFile <len>` command
//! frame, then exactly `len` raw bytes, then one ordinary response.
//! Chunk boundaries carry no meaning on the wire.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::{LinkError, Result};
use crate::protocol::{Arg, ClassToken, Command, Method};
use crate::transport::Transport;
use super::connection::Connection;

/// A local file resolved for transfer
#[derive(Debug)]
pub struct FileTransferDescriptor {
    pub path: PathBuf,
    pub length: u64,
    file: File,
}

impl FileTransferDescriptor {
    /// Open `path` and resolve its length
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|e| {
            LinkError::FileTransfer(format!("cannot stat {}: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(LinkError::FileTransfer(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        let file = File::open(path).map_err(|e| {
            LinkError::FileTransfer(format!("cannot open {}: {}", path.display(), e))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            length: metadata.len(),
            file,
        })
    }
}

impl<T: Transport> Connection<T> {
    /// Send a local file to the server
    ///
    /// Returns the number of content bytes written.
    pub fn send_file(&mut self, path: impl AsRef<Path>) -> Result<u64> {
        self.ensure_open()?;
        let descriptor = FileTransferDescriptor::open(path)?;
        tracing::debug!(
            "Sending {} ({} bytes) to {}",
            descriptor.path.display(),
            descriptor.length,
            self.peer()
        );
        self.send_reader(descriptor.length, descriptor.file)
    }

    /// Declare `length` bytes and stream them from `reader`
    ///
    /// If `reader` ends early or fails the transfer fails with
    /// [`LinkError::FileTransfer`]. The length already declared to the
    /// server is left unsatisfied, so the connection is marked broken, as
    /// it is on a socket failure.
    pub fn send_reader<R: Read>(&mut self, length: u64, mut reader: R) -> Result<u64> {
        self.ensure_ready()?;

        let command = Command::new(ClassToken::Server, Method::SendFile, "%u", &[Arg::UInt(length)])?;
        self.send_frame(&command.to_wire())?;

        let mut chunk = vec![0u8; self.config().file_chunk_size];
        let mut sent: u64 = 0;

        while sent < length {
            let want = (length - sent).min(chunk.len() as u64) as usize;
            let n = match reader.read(&mut chunk[..want]) {
                Ok(0) => {
                    // the server still expects the rest of the declared length
                    tracing::warn!("Source ended after {} of {} bytes", sent, length);
                    self.mark_broken();
                    return Err(LinkError::FileTransfer(format!(
                        "source ended after {} of {} declared bytes; reconnect before the next call",
                        sent, length
                    )));
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.mark_broken();
                    return Err(LinkError::FileTransfer(format!(
                        "read failed after {} of {} bytes: {}; reconnect before the next call",
                        sent, length, e
                    )));
                }
            };

            self.send_raw(&chunk[..n]).map_err(|e| match e {
                LinkError::Connection(msg) => LinkError::FileTransfer(format!(
                    "send failed after {} of {} bytes: {}",
                    sent, length, msg
                )),
                other => other,
            })?;
            sent += n as u64;
        }

        self.receive()?.into_result()?;
        tracing::debug!("Transferred {} bytes to {}", sent, self.peer());
        Ok(sent)
    }
}
