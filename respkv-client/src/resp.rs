//! # RESP2 Encoding and Parsing
//!
//! Purpose: Encode client commands and parse server replies without any I/O
//! beyond the reader handed in, keeping allocations under control.
//!
//! ## Design Principles
//! 1. **State-Free Parsing**: Replies are parsed top-down with minimal state.
//! 2. **Buffer Reuse**: Caller provides buffers to avoid per-call allocations.
//! 3. **Binary-Safe**: Bulk strings are treated as raw bytes.
//! 4. **Fail Fast**: Invalid framing returns protocol errors immediately.
//!
//! ## Wire Format
//!
//! ```text
//! request:  *<n>\r\n ( $<len>\r\n <bytes>\r\n ){n}
//! reply:    +<text>\r\n | -<message>\r\n | :<i64>\r\n
//!           | $<len>\r\n<bytes>\r\n | $-1\r\n
//!           | *<n>\r\n<reply>{n} | *-1\r\n
//! ```

use std::io::{self, BufRead, ErrorKind, Read};

use crate::command::Command;
use crate::error::{ClientError, ClientResult};

/// RESP reply value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// +OK or +QUEUED style replies.
    Simple(String),
    /// -ERR ... replies, kept as data only inside `read_reply`.
    Error(String),
    /// :123 replies.
    Integer(i64),
    /// $... bulk strings, with None for nil.
    Bulk(Option<Vec<u8>>),
    /// *... arrays, with None for a nil array.
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    /// Converts error replies (at any depth) into `ClientError::Server`.
    pub fn into_checked(self) -> ClientResult<RespValue> {
        match self {
            RespValue::Error(message) => Err(ClientError::Server(message)),
            RespValue::Array(Some(items)) => {
                let items = items
                    .into_iter()
                    .map(RespValue::into_checked)
                    .collect::<ClientResult<Vec<_>>>()?;
                Ok(RespValue::Array(Some(items)))
            }
            other => Ok(other),
        }
    }

    pub fn into_integer(self) -> ClientResult<i64> {
        match self {
            RespValue::Integer(value) => Ok(value),
            other => Err(unexpected("integer", &other)),
        }
    }

    pub fn into_bulk(self) -> ClientResult<Option<Vec<u8>>> {
        match self {
            RespValue::Bulk(data) => Ok(data),
            other => Err(unexpected("bulk string", &other)),
        }
    }

    pub fn into_simple(self) -> ClientResult<String> {
        match self {
            RespValue::Simple(text) => Ok(text),
            other => Err(unexpected("simple string", &other)),
        }
    }

    /// Array items; a nil array is `None`.
    pub fn into_array(self) -> ClientResult<Option<Vec<RespValue>>> {
        match self {
            RespValue::Array(items) => Ok(items),
            other => Err(unexpected("array", &other)),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            RespValue::Simple(_) => "simple string",
            RespValue::Error(_) => "error",
            RespValue::Integer(_) => "integer",
            RespValue::Bulk(_) => "bulk string",
            RespValue::Array(_) => "array",
        }
    }
}

fn unexpected(expected: &str, actual: &RespValue) -> ClientError {
    ClientError::protocol(format!(
        "expected {} reply, got {}",
        expected,
        actual.type_name()
    ))
}

/// Encodes a RESP2 array command into the provided buffer.
pub fn encode_command(command: Command, args: &[&[u8]], out: &mut Vec<u8>) {
    out.push(b'*');
    push_usize(out, args.len() + 1);
    out.extend_from_slice(b"\r\n");
    push_bulk(out, command.as_bytes());
    for arg in args {
        push_bulk(out, arg);
    }
}

/// Encodes a reply frame, the inverse of [`read_reply`].
pub fn encode_reply(value: &RespValue, out: &mut Vec<u8>) {
    match value {
        RespValue::Simple(text) => push_line(out, b'+', text.as_bytes()),
        RespValue::Error(message) => push_line(out, b'-', message.as_bytes()),
        RespValue::Integer(value) => push_line(out, b':', value.to_string().as_bytes()),
        RespValue::Bulk(None) => out.extend_from_slice(b"$-1\r\n"),
        RespValue::Bulk(Some(data)) => push_bulk(out, data),
        RespValue::Array(None) => out.extend_from_slice(b"*-1\r\n"),
        RespValue::Array(Some(items)) => {
            out.push(b'*');
            push_usize(out, items.len());
            out.extend_from_slice(b"\r\n");
            for item in items {
                encode_reply(item, out);
            }
        }
    }
}

/// Largest bulk string accepted from the peer (the store's `proto-max-bulk-len`).
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Longest header or simple line accepted from the peer, CRLF included.
const MAX_LINE_LEN: usize = 64 * 1024;

/// Deepest array nesting accepted from the peer.
const MAX_DEPTH: usize = 64;

/// Reads one RESP value from the buffered reader.
///
/// Error replies are returned as `RespValue::Error`; use [`read_value`] to
/// have them raised as `ClientError::Server`. A stream that ends before the
/// first byte of the reply is a transport failure (`ClientError::Io` with
/// `UnexpectedEof`); one that ends inside a frame is a protocol failure.
pub fn read_reply<R: BufRead>(reader: &mut R, line_buf: &mut Vec<u8>) -> ClientResult<RespValue> {
    if reader.fill_buf()?.is_empty() {
        return Err(ClientError::Io(io::Error::new(
            ErrorKind::UnexpectedEof,
            "connection closed by peer",
        )));
    }
    read_frame(reader, line_buf, 0)
}

fn read_frame<R: BufRead>(
    reader: &mut R,
    line_buf: &mut Vec<u8>,
    depth: usize,
) -> ClientResult<RespValue> {
    read_line(reader, line_buf)?;
    if line_buf.is_empty() {
        return Err(ClientError::protocol("empty reply line"));
    }

    match line_buf[0] {
        b'+' => Ok(RespValue::Simple(utf8_line(&line_buf[1..])?)),
        b'-' => Ok(RespValue::Error(utf8_line(&line_buf[1..])?)),
        b':' => Ok(RespValue::Integer(parse_i64(&line_buf[1..])?)),
        b'$' => {
            let len = parse_i64(&line_buf[1..])?;
            parse_bulk_len(reader, len, line_buf)
        }
        b'*' => {
            let len = parse_i64(&line_buf[1..])?;
            parse_array_len(reader, len, line_buf, depth)
        }
        other => Err(ClientError::protocol(format!(
            "unknown reply type byte 0x{:02x}",
            other
        ))),
    }
}

/// Reads one reply and raises store error replies.
pub fn read_value<R: BufRead>(reader: &mut R, line_buf: &mut Vec<u8>) -> ClientResult<RespValue> {
    read_reply(reader, line_buf)?.into_checked()
}

/// Decodes UTF-8 bytes coming back from the store.
pub fn decode_utf8(data: Vec<u8>) -> ClientResult<String> {
    String::from_utf8(data).map_err(|_| ClientError::protocol("reply is not valid UTF-8"))
}

fn parse_bulk_len<R: BufRead>(
    reader: &mut R,
    len: i64,
    line_buf: &mut Vec<u8>,
) -> ClientResult<RespValue> {
    if len == -1 {
        return Ok(RespValue::Bulk(None));
    }
    if len < 0 {
        return Err(ClientError::protocol(format!("invalid bulk length {}", len)));
    }
    if len as u64 > MAX_BULK_LEN as u64 {
        return Err(ClientError::protocol(format!("bulk length {} exceeds limit", len)));
    }
    let len = len as usize;
    // Grow with the bytes that actually arrive rather than trusting the header.
    let mut data = Vec::with_capacity(len.min(64 * 1024));
    reader.by_ref().take(len as u64).read_to_end(&mut data)?;
    if data.len() != len {
        return Err(ClientError::protocol("unexpected end of stream"));
    }

    let mut crlf = [0u8; 2];
    read_exact(reader, &mut crlf)?;
    if crlf != [b'\r', b'\n'] {
        return Err(ClientError::protocol("bulk string not terminated by CRLF"));
    }

    line_buf.clear();
    Ok(RespValue::Bulk(Some(data)))
}

fn parse_array_len<R: BufRead>(
    reader: &mut R,
    len: i64,
    line_buf: &mut Vec<u8>,
    depth: usize,
) -> ClientResult<RespValue> {
    if len == -1 {
        return Ok(RespValue::Array(None));
    }
    if len < 0 {
        return Err(ClientError::protocol(format!("invalid array length {}", len)));
    }
    if depth >= MAX_DEPTH {
        return Err(ClientError::protocol(format!("arrays nested deeper than {}", MAX_DEPTH)));
    }

    // The count comes from the peer; cap the pre-allocation.
    let mut items = Vec::with_capacity((len as usize).min(1024));
    for _ in 0..len {
        items.push(read_frame(reader, line_buf, depth + 1)?);
    }
    Ok(RespValue::Array(Some(items)))
}

fn read_exact<R: BufRead>(reader: &mut R, buf: &mut [u8]) -> ClientResult<()> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => ClientError::protocol("unexpected end of stream"),
        _ => ClientError::Io(err),
    })
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> ClientResult<()> {
    buf.clear();
    let bytes = reader.by_ref().take(MAX_LINE_LEN as u64).read_until(b'\n', buf)?;
    if bytes == 0 {
        return Err(ClientError::protocol("unexpected end of stream"));
    }
    if bytes == MAX_LINE_LEN && buf.last() != Some(&b'\n') {
        return Err(ClientError::protocol("reply line exceeds limit"));
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' || buf[buf.len() - 1] != b'\n' {
        return Err(ClientError::protocol("reply line not terminated by CRLF"));
    }
    buf.truncate(buf.len() - 2);
    Ok(())
}

fn utf8_line(data: &[u8]) -> ClientResult<String> {
    std::str::from_utf8(data)
        .map(str::to_owned)
        .map_err(|_| ClientError::protocol("reply line is not valid UTF-8"))
}

fn parse_i64(data: &[u8]) -> ClientResult<i64> {
    let invalid = || ClientError::protocol(format!("invalid integer {:?}", String::from_utf8_lossy(data)));
    if data.is_empty() {
        return Err(invalid());
    }
    let (negative, digits) = match data[0] {
        b'-' => (true, &data[1..]),
        _ => (false, data),
    };
    if digits.is_empty() {
        return Err(invalid());
    }

    // Accumulate as a negative number so i64::MIN parses without overflow.
    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(invalid());
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_sub((b - b'0') as i64))
            .ok_or_else(invalid)?;
    }

    if negative {
        Ok(value)
    } else {
        value.checked_neg().ok_or_else(invalid)
    }
}

fn push_bulk(out: &mut Vec<u8>, data: &[u8]) {
    out.push(b'$');
    push_usize(out, data.len());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
}

fn push_line(out: &mut Vec<u8>, prefix: u8, text: &[u8]) {
    out.push(prefix);
    out.extend_from_slice(text);
    out.extend_from_slice(b"\r\n");
}

fn push_usize(out: &mut Vec<u8>, mut value: usize) {
    // Write digits into a small stack buffer to avoid heap allocations.
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        len = 1;
    } else {
        while value > 0 {
            buf[len] = b'0' + (value % 10) as u8;
            value /= 10;
            len += 1;
        }
    }
    for idx in (0..len).rev() {
        out.push(buf[idx]);
    }
}
