//! Response definitions
//!
//! Classifies a received frame as ok, ok-with-payload, or a remote
//! exception. Sentinels only ever match whole whitespace-delimited tokens.
//!
//! ## Grammar
//! ```text
//! <ok> [payload]            payload follows a leading ok token
//! [payload] <ok>            payload precedes a trailing ok token
//! EXCEPTION <method> <msg>  remote failure
//! <method> EXCEPTION <msg>  remote failure, method named first
//! ```
//! A frame starting with an ok token is never treated as an exception,
//! even if its payload contains the exception token as data.

use crate::error::{LinkError, Result};
use super::registry::{MethodRegistry, EXCEPTION_TOKEN};

/// Separator between strings in a multi-string payload
pub const LIST_SEPARATOR: char = '\0';

/// Derived status of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    OkWithPayload(String),
    RemoteException { method: String, message: String },
}

/// A parsed response frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Frame text as received, without framing
    raw: String,

    status: Status,
}

impl Response {
    /// Parse a response using the default sentinels
    pub fn parse(raw: &str) -> Result<Self> {
        Self::parse_with(raw, &MethodRegistry::default())
    }

    /// Parse a response against the given registry's sentinels
    pub fn parse_with(raw: &str, registry: &MethodRegistry) -> Result<Self> {
        let status = classify(raw, registry)?;
        Ok(Self {
            raw: raw.to_string(),
            status,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self.status, Status::RemoteException { .. })
    }

    /// Payload text for successful responses
    pub fn payload(&self) -> Option<&str> {
        match &self.status {
            Status::OkWithPayload(payload) => Some(payload),
            _ => None,
        }
    }

    /// Unpack a multi-string payload, preserving order
    ///
    /// A single trailing separator is tolerated. An empty payload yields
    /// an empty list.
    pub fn string_list(&self) -> Vec<String> {
        match self.payload() {
            Some(payload) => split_list(payload),
            None => Vec::new(),
        }
    }

    /// Payload for success (empty for a bare ok), error for a remote exception
    pub fn into_result(self) -> Result<String> {
        match self.status {
            Status::Ok => Ok(String::new()),
            Status::OkWithPayload(payload) => Ok(payload),
            Status::RemoteException { method, message } => {
                Err(LinkError::RemoteException { method, message })
            }
        }
    }
}

/// True only if `word` is exactly the exception sentinel
///
/// Used when a response is assembled one token at a time. Prefix, suffix
/// and substring matches do not count.
pub fn contains_error_word(word: &str) -> bool {
    word.trim() == EXCEPTION_TOKEN
}

/// Split a NUL-separated payload into its strings
pub fn split_list(payload: &str) -> Vec<String> {
    if payload.is_empty() {
        return Vec::new();
    }
    let body = payload.strip_suffix(LIST_SEPARATOR).unwrap_or(payload);
    body.split(LIST_SEPARATOR).map(str::to_string).collect()
}

/// Whitespace-delimited tokens with their byte offsets
fn tokens(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                out.push((s, &text[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, &text[s..]));
    }
    out
}

fn classify(raw: &str, registry: &MethodRegistry) -> Result<Status> {
    let tokens = tokens(raw);
    let (first, last) = match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(LinkError::Protocol("Empty response".to_string())),
    };

    if registry.is_ok_token(first.1) {
        let payload = raw[first.0 + first.1.len()..].trim();
        return Ok(ok_status(payload));
    }

    let exception = tokens
        .iter()
        .find(|(_, t)| registry.is_exception_token(t));
    if let Some(&(start, token)) = exception {
        let before = raw[..start].trim();
        let after = raw[start + token.len()..].trim();

        let (method, message) = if before.is_empty() {
            match after.split_once(char::is_whitespace) {
                Some((method, message)) => (method, message.trim()),
                None => (after, ""),
            }
        } else {
            (before, after)
        };

        if method.is_empty() {
            return Err(LinkError::Protocol(format!(
                "Exception without method name: {:?}",
                raw
            )));
        }

        return Ok(Status::RemoteException {
            method: method.to_string(),
            message: message.to_string(),
        });
    }

    if registry.is_ok_token(last.1) {
        let payload = raw[..last.0].trim();
        return Ok(ok_status(payload));
    }

    Err(LinkError::Protocol(format!(
        "Response has no status token: {:?}",
        truncate(raw, 80)
    )))
}

fn ok_status(payload: &str) -> Status {
    if payload.is_empty() {
        Status::Ok
    } else {
        Status::OkWithPayload(payload.to_string())
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}
