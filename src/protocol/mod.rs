//! Protocol Module
//!
//! Defines the line protocol spoken by the backend.
//!
//! ## Protocol Format (text lines over TCP)
//!
//! ### Exchange
//! ```text
//! backend  → 220 Welcome.\n
//! gateway  → cmd:<name>\n <params> commit:1\n end\n
//! backend  → <fields> end\n   (then closes)
//! ```
//!
//! ### Fields
//! - `key:value\n` for values without newlines
//! - `blob:<len>:key\n<value>\n` for values that may hold newlines
//!
//! ### Reserved Response Keys
//! - `status`: overall outcome (`TRANS_OK`, `TRANS_ERROR`, ...)
//! - `error`: human-readable message

mod command;
mod response;
mod codec;

pub use command::{Command, Parameter, ParamValue};
pub use response::{
    Body, Record, Response, ResponseFormat, ResponseView, ERROR_KEY, STATUS_DATABASE_ERROR,
    STATUS_ERROR, STATUS_KEY, STATUS_NO_SUCH_COMMAND, STATUS_OK,
};
pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_request,
    strip_terminator, write_command, write_response, GREETING, TERMINATOR,
};
