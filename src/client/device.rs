//! Device facade
//!
//! Typed shortcuts for a handful of `Device` and `FitsFile` methods.
//! Each one is a single `call_method`; the server decides what they do.

use crate::error::{LinkError, Result};
use crate::protocol::{Arg, ClassToken, Method};
use crate::transport::Transport;
use super::connection::Connection;

/// Borrowed view of a connection addressing the remote device class
pub struct Device<'a, T: Transport> {
    conn: &'a mut Connection<T>,
}

impl<'a, T: Transport> Device<'a, T> {
    pub fn new(conn: &'a mut Connection<T>) -> Self {
        Self { conn }
    }

    fn call(&mut self, method: Method, format: &str, args: &[Arg]) -> Result<String> {
        self.conn.call_method(ClassToken::Device, method, format, args)
    }

    /// Server-side description of the device
    pub fn describe(&mut self) -> Result<String> {
        self.call(Method::ToString, "", &[])
    }

    /// Names of the devices the server can open
    pub fn device_list(&mut self) -> Result<Vec<String>> {
        self.conn
            .call_method_list(ClassToken::Device, Method::GetDeviceList, "", &[])
    }

    pub fn open(&mut self, index: u32) -> Result<()> {
        self.call(Method::Open, "%u", &[Arg::from(index)]).map(|_| ())
    }

    pub fn close(&mut self) -> Result<()> {
        self.call(Method::Close, "", &[]).map(|_| ())
    }

    pub fn is_open(&mut self) -> Result<bool> {
        let reply = self.call(Method::IsOpen, "", &[])?;
        parse_bool(&reply)
    }

    pub fn reset(&mut self) -> Result<()> {
        self.call(Method::Reset, "", &[]).map(|_| ())
    }

    /// Send a controller command to `board` and return its reply word
    pub fn command(&mut self, board: u32, cmd: u32, args: &[u32]) -> Result<u32> {
        let mut format = String::from("%u %#x");
        let mut values = vec![Arg::from(board), Arg::from(cmd)];
        for arg in args {
            format.push_str(" %#x");
            values.push(Arg::from(*arg));
        }
        let reply = self.call(Method::Command, &format, &values)?;
        parse_word(&reply)
    }

    /// Start an exposure of `exp_time_ms` on a `rows` x `cols` image
    pub fn expose(&mut self, exp_time_ms: f32, rows: u32, cols: u32) -> Result<()> {
        self.call(
            Method::Expose,
            "%f %u %u",
            &[Arg::from(exp_time_ms), Arg::from(rows), Arg::from(cols)],
        )
        .map(|_| ())
    }

    /// Write a keyword into a FITS file on the server
    pub fn write_fits_keyword(
        &mut self,
        file: &str,
        key: &str,
        value: &str,
        comment: &str,
    ) -> Result<()> {
        self.conn
            .call_method(
                ClassToken::FitsFile,
                Method::WriteFitsKeyword,
                "%s %s %s %s",
                &[Arg::from(file), Arg::from(key), Arg::from(value), Arg::from(comment)],
            )
            .map(|_| ())
    }
}

fn parse_bool(reply: &str) -> Result<bool> {
    match reply.trim() {
        "1" | "true" | "TRUE" => Ok(true),
        "0" | "false" | "FALSE" => Ok(false),
        other => Err(LinkError::Protocol(format!(
            "Expected a boolean reply, got {:?}",
            other
        ))),
    }
}

fn parse_word(reply: &str) -> Result<u32> {
    let text = reply.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| LinkError::Protocol(format!("Expected a reply word, got {:?}", text)))
}
