//! Protocol Module
//!
//! Defines the text wire protocol spoken with the hardware server.
//!
//! ## Command Format
//! ```text
//! <ClassToken> <MethodToken>[ <formatted arguments>]
//! ```
//!
//! ### Examples
//! - `Device ToString`
//! - `Device Open 0`
//! - `Device Command 2 0x544444 0x30`
//! - `Server SendFile 20480`  (followed by 20480 raw bytes)
//!
//! ## Response Format
//! ```text
//! SERVER_OK [payload]
//! CLIENT_OK [payload]
//! EXCEPTION <method> <message>
//! ```
//!
//! Frames are delimited by `\n` or by a 4-byte length prefix depending
//! on [`EolMode`](crate::config::EolMode).

mod registry;
mod format;
mod command;
mod response;
mod codec;

pub use registry::{
    ClassToken, Method, MethodRegistry, CLIENT_OK_TOKEN, EXCEPTION_TOKEN, SERVER_OK_TOKEN,
};
pub use format::{format_args, Arg, Conversion, ConversionKind, Flags, FormatSpec};
pub use command::Command;
pub use response::{contains_error_word, split_list, Response, Status, LIST_SEPARATOR};
pub use codec::{
    decode_text, encode_frame, read_exact_bytes, read_frame, LENGTH_PREFIX_SIZE,
    LINE_TERMINATOR,
};
