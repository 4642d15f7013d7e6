//! Command definitions
//!
//! A command addresses one method on one remote class and carries its
//! arguments already rendered to text.

use std::fmt;

use crate::error::{LinkError, Result};
use super::format::{Arg, FormatSpec};
use super::registry::{ClassToken, Method};

/// A fully rendered command, built fresh for every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    class: ClassToken,
    method: Method,
    arguments: String,
}

impl Command {
    /// Render `args` into `format` and build the command
    ///
    /// Fails with a protocol error when the argument list does not match
    /// the format. Nothing is sent in that case.
    pub fn new(class: ClassToken, method: Method, format: &str, args: &[Arg]) -> Result<Self> {
        let spec = FormatSpec::parse(format)?;
        let arguments = spec.render(args)?;
        Ok(Self {
            class,
            method,
            arguments,
        })
    }

    /// A command with no arguments
    pub fn bare(class: ClassToken, method: Method) -> Self {
        Self {
            class,
            method,
            arguments: String::new(),
        }
    }

    pub fn class(&self) -> ClassToken {
        self.class
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The formatted argument text
    pub fn arguments(&self) -> &str {
        &self.arguments
    }

    /// Wire text without any framing: `<class> <method>[ <args>]`
    pub fn to_wire(&self) -> String {
        if self.arguments.is_empty() {
            format!("{} {}", self.class.token(), self.method.token())
        } else {
            format!("{} {} {}", self.class.token(), self.method.token(), self.arguments)
        }
    }

    /// Reject text that would break line framing
    pub fn check_line_safe(text: &str) -> Result<()> {
        if text.contains('\n') || text.contains('\r') {
            return Err(LinkError::Protocol(
                "Line terminator inside command text".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}
