//! Protocol codec
//!
//! Encoding and decoding functions for the line protocol.
//!
//! ## Wire Format
//!
//! ### Request Format
//! ```text
//! cmd:<name>\n
//! <key>:<value>\n                      (plain parameter)
//! blob:<len>:<key>\n<len bytes>\n      (blob parameter)
//! commit:1\n
//! end\n
//! ```
//!
//! ### Response Format
//! ```text
//! <key>:<value>\n | blob:<len>:<key>\n<len bytes>\n   (repeated)
//! end\n
//! ```
//!
//! Values are never escaped: a plain value may contain `:` but never `\n`.
//! Anything holding a newline is framed as a blob.

use std::io::{BufRead, Write};

use crate::error::{GatewayError, Result};
use super::{Command, Parameter, Response, ERROR_KEY, STATUS_KEY};

/// Line the backend sends as soon as it accepts a connection
pub const GREETING: &[u8] = b"220 Welcome.\n";

/// Terminates every request and response
pub const TERMINATOR: &[u8] = b"end\n";

/// Fixed commit marker written before the request terminator
pub const COMMIT_LINE: &[u8] = b"commit:1\n";

/// Prefix of a length-framed field
pub const BLOB_PREFIX: &[u8] = b"blob:";

/// Key of the first request line
pub const COMMAND_KEY: &str = "cmd";

/// Key of the commit marker
pub const COMMIT_KEY: &str = "commit";

// =============================================================================
// Field Encoding
// =============================================================================

/// Append one field, promoting it to blob framing when needed
fn put_field(buf: &mut Vec<u8>, key: &str, value: &str, is_blob: bool) {
    if is_blob || value.contains('\n') {
        buf.extend_from_slice(BLOB_PREFIX);
        buf.extend_from_slice(value.len().to_string().as_bytes());
        buf.push(b':');
        buf.extend_from_slice(key.as_bytes());
        buf.push(b'\n');
    } else {
        buf.extend_from_slice(key.as_bytes());
        buf.push(b':');
    }
    buf.extend_from_slice(value.as_bytes());
    buf.push(b'\n');
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Parameters are written in order; integers are rendered in decimal.
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);

    buf.extend_from_slice(COMMAND_KEY.as_bytes());
    buf.push(b':');
    buf.extend_from_slice(command.name.as_bytes());
    buf.push(b'\n');

    for param in &command.params {
        put_field(&mut buf, &param.key, &param.value.to_wire(), param.is_blob);
    }

    buf.extend_from_slice(COMMIT_LINE);
    buf.extend_from_slice(TERMINATOR);
    buf
}

/// Decode a request body (terminator already stripped) back into a command
///
/// The first field must be `cmd`; the commit marker is dropped.
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let mut command: Option<Command> = None;

    scan_fields(bytes, |field| {
        match command.as_mut() {
            None if field.key == COMMAND_KEY => {
                command = Some(Command::new(field.value));
            }
            None => {
                return Err(GatewayError::DecodeMalformed(format!(
                    "request must start with {:?}, got {:?}",
                    COMMAND_KEY, field.key
                )));
            }
            Some(_) if field.key == COMMIT_KEY => {}
            Some(cmd) => cmd.params.push(Parameter {
                key: field.key.to_string(),
                value: field.value.into(),
                is_blob: field.blob,
            }),
        }
        Ok(())
    })?;

    command.ok_or_else(|| GatewayError::DecodeMalformed("empty request".to_string()))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes, terminator included
///
/// `status` and `error` lead, followed by the data fields in order.
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    if !response.status().is_empty() {
        put_field(&mut buf, STATUS_KEY, response.status(), false);
    }
    if let Some(error) = response.error() {
        put_field(&mut buf, ERROR_KEY, error, false);
    }
    for (key, value) in response.data_fields() {
        put_field(&mut buf, key, value, false);
    }
    buf.extend_from_slice(TERMINATOR);
    buf
}

/// Decode a response body (everything after the greeting, terminator stripped)
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let mut response = Response::default();
    scan_fields(bytes, |field| {
        response.push(field.key, field.value);
        Ok(())
    })?;
    Ok(response)
}

/// Verify and strip the trailing terminator of a received buffer
pub fn strip_terminator(bytes: &[u8]) -> Result<&[u8]> {
    bytes.strip_suffix(TERMINATOR).ok_or_else(|| {
        let tail = &bytes[bytes.len().saturating_sub(32)..];
        GatewayError::ResponseTruncated(format!(
            "missing terminator after {} bytes, tail {:?}",
            bytes.len(),
            String::from_utf8_lossy(tail)
        ))
    })
}

// =============================================================================
// Field Scanner
// =============================================================================

/// A single decoded field borrowed from the buffer
struct Field<'a> {
    key: &'a str,
    value: &'a str,
    blob: bool,
}

fn utf8<'a>(bytes: &'a [u8], what: &str) -> Result<&'a str> {
    std::str::from_utf8(bytes)
        .map_err(|e| GatewayError::DecodeMalformed(format!("{} is not valid UTF-8: {}", what, e)))
}

fn find(bytes: &[u8], needle: u8) -> Option<usize> {
    bytes.iter().position(|&b| b == needle)
}

/// Walk the buffer left to right, yielding each field in order
fn scan_fields<'a, F>(bytes: &'a [u8], mut on_field: F) -> Result<()>
where
    F: FnMut(Field<'a>) -> Result<()>,
{
    let mut n = 0;

    while n < bytes.len() {
        let rest = &bytes[n..];

        let field = if rest.starts_with(BLOB_PREFIX) {
            // blob:<len>:<key>\n<value>\n
            let after_prefix = &rest[BLOB_PREFIX.len()..];
            let len_end = find(after_prefix, b':').ok_or_else(|| {
                GatewayError::DecodeMalformed(format!(
                    "blob header without length separator at offset {}",
                    n
                ))
            })?;
            let len_text = utf8(&after_prefix[..len_end], "blob length")?;
            let value_len: usize = len_text.parse().map_err(|_| {
                GatewayError::DecodeMalformed(format!("invalid blob length {:?}", len_text))
            })?;

            let key_start = BLOB_PREFIX.len() + len_end + 1;
            let key_len = find(&rest[key_start..], b'\n').ok_or_else(|| {
                GatewayError::DecodeMalformed(format!("blob key without newline at offset {}", n))
            })?;
            let key = utf8(&rest[key_start..key_start + key_len], "blob key")?;

            let value_start = key_start + key_len + 1;
            let value_end = value_start
                .checked_add(value_len)
                .filter(|&end| end < rest.len())
                .ok_or_else(|| {
                    GatewayError::DecodeMalformed(format!(
                        "blob {:?} declares {} bytes but only {} remain",
                        key,
                        value_len,
                        rest.len().saturating_sub(value_start)
                    ))
                })?;
            if rest[value_end] != b'\n' {
                return Err(GatewayError::DecodeMalformed(format!(
                    "blob {:?} is not followed by a newline",
                    key
                )));
            }
            let value = utf8(&rest[value_start..value_end], "blob value")?;

            n += value_end + 1;
            Field { key, value, blob: true }
        } else {
            // <key>:<value>\n
            let line_len = find(rest, b'\n').ok_or_else(|| {
                GatewayError::DecodeMalformed(format!(
                    "line without newline at offset {}: {:?}",
                    n,
                    String::from_utf8_lossy(rest)
                ))
            })?;
            let line = &rest[..line_len];
            let sep = find(line, b':').ok_or_else(|| {
                GatewayError::DecodeMalformed(format!(
                    "line without key separator: {:?}",
                    String::from_utf8_lossy(line)
                ))
            })?;
            let key = utf8(&line[..sep], "key")?;
            let value = utf8(&line[sep + 1..], "value")?;

            n += line_len + 1;
            Field { key, value, blob: false }
        };

        on_field(field)?;
    }

    Ok(())
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write an encoded command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes).map_err(GatewayError::WriteFailed)?;
    writer.flush().map_err(GatewayError::WriteFailed)?;
    Ok(())
}

/// Write an encoded response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}

/// Read one request from a stream, up to and including its terminator
///
/// Blob headers are honored so a blob value holding an `end` line does not end
/// the request early. Returns the raw bytes with the terminator stripped.
pub fn read_request<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line)?;
        if read == 0 || !line.ends_with(b"\n") {
            return Err(GatewayError::ResponseTruncated(format!(
                "request ended after {} bytes without terminator",
                buf.len() + line.len()
            )));
        }
        if line == TERMINATOR {
            return Ok(buf);
        }

        buf.extend_from_slice(&line);

        if let Some(header) = line.strip_prefix(BLOB_PREFIX) {
            let len_end = find(header, b':').ok_or_else(|| {
                GatewayError::DecodeMalformed("blob header without length separator".to_string())
            })?;
            let len_text = utf8(&header[..len_end], "blob length")?;
            let value_len: usize = len_text.parse().map_err(|_| {
                GatewayError::DecodeMalformed(format!("invalid blob length {:?}", len_text))
            })?;

            let start = buf.len();
            buf.resize(start + value_len + 1, 0);
            reader.read_exact(&mut buf[start..])?;
        }
    }
}
