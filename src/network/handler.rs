//! Request handlers for the simulated server

use crate::protocol::{
    ClassToken, Method, EXCEPTION_TOKEN, LIST_SEPARATOR, SERVER_OK_TOKEN,
};

/// A command as seen by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub class: String,
    pub method: String,
    pub args: Vec<String>,

    /// Full command text
    pub raw: String,
}

impl Request {
    /// Split command text into class, method and arguments
    ///
    /// Returns `None` when fewer than two tokens are present.
    pub fn parse(text: &str) -> Option<Self> {
        let mut tokens = text.split_whitespace();
        let class = tokens.next()?.to_string();
        let method = tokens.next()?.to_string();
        Some(Self {
            class,
            method,
            args: tokens.map(str::to_string).collect(),
            raw: text.to_string(),
        })
    }
}

/// What the server sends back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Payload(String),
    List(Vec<String>),
    Exception { method: String, message: String },

    /// Sent verbatim, for exercising client error paths
    Raw(String),
}

impl Reply {
    pub fn exception(method: &str, message: &str) -> Self {
        Reply::Exception {
            method: method.to_string(),
            message: message.to_string(),
        }
    }

    /// Response text without framing
    pub fn to_wire(&self) -> String {
        match self {
            Reply::Ok => SERVER_OK_TOKEN.to_string(),
            Reply::Payload(payload) => format!("{} {}", SERVER_OK_TOKEN, payload),
            Reply::List(items) => {
                let separator = LIST_SEPARATOR.to_string();
                format!("{} {}", SERVER_OK_TOKEN, items.join(&separator))
            }
            Reply::Exception { method, message } => {
                format!("{} {} {}", EXCEPTION_TOKEN, method, message)
            }
            Reply::Raw(text) => text.clone(),
        }
    }
}

/// Decides the reply to each command
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: &Request) -> Reply;

    /// Called after a `SendFile` transfer completed
    fn file_received(&self, _content: &[u8]) -> Reply {
        Reply::Ok
    }
}

impl<F> Handler for F
where
    F: Fn(&Request) -> Reply + Send + Sync + 'static,
{
    fn handle(&self, request: &Request) -> Reply {
        self(request)
    }
}

/// Default behaviour of the simulated server
///
/// - `ToString` describes the server
/// - `GetDeviceList` returns two fake devices
/// - `IsOpen` answers `1`
/// - methods unknown to the registry raise a remote exception
/// - anything else echoes its arguments, or replies a bare ok
#[derive(Debug, Clone)]
pub struct EchoHandler {
    pub name: String,
    pub devices: Vec<String>,
}

impl Default for EchoHandler {
    fn default() -> Self {
        Self {
            name: "arclink simulated server".to_string(),
            devices: vec!["PCIe:0".to_string(), "PCI:0".to_string()],
        }
    }
}

impl Handler for EchoHandler {
    fn handle(&self, request: &Request) -> Reply {
        if ClassToken::from_token(&request.class).is_none() {
            return Reply::exception(&request.method, &format!("unknown class {}", request.class));
        }

        match Method::from_token(&request.method) {
            None => Reply::exception(&request.method, "unknown method"),
            Some(Method::ToString) => Reply::Payload(self.name.clone()),
            Some(Method::Version) => Reply::Payload(crate::VERSION.to_string()),
            Some(Method::GetDeviceList) => Reply::List(self.devices.clone()),
            Some(Method::IsOpen) => Reply::Payload("1".to_string()),
            Some(_) if request.args.is_empty() => Reply::Ok,
            Some(_) => Reply::Payload(request.args.join(" ")),
        }
    }
}
