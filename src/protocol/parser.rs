//! Incremental RESP Parser
//!
//! The parser works on a byte slice holding whatever has arrived from the
//! socket so far and returns one of:
//! - `Ok(Some((value, consumed)))` - a complete frame, `consumed` bytes used
//! - `Ok(None)` - the frame is incomplete, read more bytes and retry
//! - `Err(ParseError)` - the bytes can never form a valid frame
//!
//! This lets the connection loop pull every complete pipelined request out
//! of its buffer without waiting for the client to stop sending. A request
//! that arrives in pieces is not re-parsed from the start: the parser keeps
//! the arguments it has already decoded and resumes after them.
//!
//! Requests are decoded strictly with [`RespParser::decode`]: an array of one
//! or more bulk strings. [`RespParser::parse`] accepts any RESP value and is
//! used to read replies.

use crate::protocol::types::{prefix, Command, RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
///
/// Every variant is terminal for the connection that produced it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// A frame started with a marker that is not allowed at that position
    #[error("expected '{}', got '{}'", *expected as char, (*found as char).escape_default())]
    UnexpectedMarker { expected: u8, found: u8 },

    /// Unknown type prefix byte
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// Invalid integer format
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in a simple string or error message
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is out of range for its position
    #[error("invalid multibulk length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, runaway length line, ...)
    #[error("{0}")]
    ProtocolError(String),

    /// The message exceeds maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum number of elements in a request array
pub const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Maximum array nesting depth when parsing replies
pub const MAX_NESTING_DEPTH: usize = 32;

/// Longest `<marker><digits>` header we wait for before giving up
const MAX_HEADER_LEN: usize = 32;

/// A RESP protocol parser.
///
/// # Example
///
/// ```
/// use redkv::protocol::RespParser;
///
/// let mut parser = RespParser::new();
/// let buf = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
///
/// let (command, consumed) = parser.decode(buf).unwrap().unwrap();
/// assert_eq!(&command.name[..], b"GET");
/// assert_eq!(consumed, buf.len());
/// ```
#[derive(Debug, Default)]
pub struct RespParser {
    /// Request whose arguments are still arriving
    pending: Option<PendingRequest>,

    /// Current nesting depth (for array parsing)
    depth: usize,
}

/// Progress through a partially received request.
#[derive(Debug)]
struct PendingRequest {
    /// Number of bulk strings announced by the `*<count>` header
    expected: usize,
    /// Arguments decoded so far
    parts: Vec<Bytes>,
    /// Bytes of the frame already decoded
    offset: usize,
}

impl RespParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one client request from the front of `buf`.
    ///
    /// After `Ok(None)`, the next call resumes after the last complete
    /// argument, so `buf` must still start with the same bytes (it may only
    /// have grown). Any other result resets the parser.
    pub fn decode(&mut self, buf: &[u8]) -> ParseResult<Option<(Command, usize)>> {
        let result = self.decode_request(buf);
        if !matches!(result, Ok(None)) {
            self.pending = None;
        }
        result
    }

    fn decode_request(&mut self, buf: &[u8]) -> ParseResult<Option<(Command, usize)>> {
        if self.pending.as_ref().is_some_and(|p| p.offset > buf.len()) {
            self.pending = None;
        }
        if self.pending.is_none() {
            match start_request(buf)? {
                Some(pending) => self.pending = Some(pending),
                None => return Ok(None),
            }
        }
        let Some(pending) = self.pending.as_mut() else {
            return Ok(None);
        };

        while pending.parts.len() < pending.expected {
            let rest = &buf[pending.offset..];
            if rest.is_empty() {
                return Ok(None);
            }
            if rest[0] != prefix::BULK_STRING {
                return Err(ParseError::UnexpectedMarker {
                    expected: prefix::BULK_STRING,
                    found: rest[0],
                });
            }
            match parse_bulk_payload(rest)? {
                Some((Some(data), used)) => {
                    pending.parts.push(data);
                    pending.offset += used;
                }
                Some((None, _)) => return Err(ParseError::InvalidBulkLength(-1)),
                None => return Ok(None),
            }
        }

        let consumed = pending.offset;
        let mut parts = std::mem::take(&mut pending.parts).into_iter();
        let name = parts.next().unwrap_or_default();
        Ok(Some((Command::new(name, parts.collect()), consumed)))
    }

    /// Attempts to parse any RESP value from the buffer.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        self.depth = 0;
        self.parse_value(buf)
    }

    fn parse_value(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::ProtocolError(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }

        match buf[0] {
            prefix::SIMPLE_STRING => parse_line(buf, RespValue::SimpleString),
            prefix::ERROR => parse_line(buf, RespValue::Error),
            prefix::INTEGER => match read_header(buf)? {
                Some((n, consumed)) => Ok(Some((RespValue::Integer(n), consumed))),
                None => Ok(None),
            },
            prefix::BULK_STRING => match parse_bulk_payload(buf)? {
                Some((Some(data), consumed)) => Ok(Some((RespValue::BulkString(data), consumed))),
                Some((None, consumed)) => Ok(Some((RespValue::Null, consumed))),
                None => Ok(None),
            },
            prefix::ARRAY => self.parse_array(buf),
            other => Err(ParseError::UnknownPrefix(other)),
        }
    }

    /// Parses an array: `*<count>\r\n<elements...>`
    fn parse_array(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let (count, mut consumed) = match read_header(buf)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if count == -1 {
            return Ok(Some((RespValue::Null, consumed)));
        }
        if count < 0 || count as usize > MAX_ARRAY_LEN {
            return Err(ParseError::InvalidArrayLength(count));
        }

        let count = count as usize;
        let mut elements = Vec::with_capacity(count.min(64));

        self.depth += 1;
        for _ in 0..count {
            match self.parse_value(&buf[consumed..])? {
                Some((value, used)) => {
                    elements.push(value);
                    consumed += used;
                }
                None => {
                    self.depth -= 1;
                    return Ok(None);
                }
            }
        }
        self.depth -= 1;

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// Validates the `*<count>` header of a request.
fn start_request(buf: &[u8]) -> ParseResult<Option<PendingRequest>> {
    if buf.is_empty() {
        return Ok(None);
    }
    if buf[0] != prefix::ARRAY {
        return Err(ParseError::UnexpectedMarker {
            expected: prefix::ARRAY,
            found: buf[0],
        });
    }

    let (count, offset) = match read_header(buf)? {
        Some(header) => header,
        None => return Ok(None),
    };
    if count <= 0 || count as usize > MAX_ARRAY_LEN {
        return Err(ParseError::InvalidArrayLength(count));
    }

    let expected = count as usize;
    Ok(Some(PendingRequest {
        expected,
        parts: Vec::with_capacity(expected.min(64)),
        offset,
    }))
}

/// Reads `<marker><integer>\r\n` and returns the integer together with the
/// number of bytes the header occupies.
fn read_header(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    let window = &buf[1..buf.len().min(MAX_HEADER_LEN)];
    let end = match find_crlf(window) {
        Some(pos) => pos,
        None if buf.len() >= MAX_HEADER_LEN => {
            return Err(ParseError::ProtocolError(
                "length line too long".to_string(),
            ))
        }
        None => return Ok(None),
    };

    let digits = std::str::from_utf8(&buf[1..1 + end])
        .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
    let n = digits
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidInteger(digits.to_string()))?;

    Ok(Some((n, 1 + end + 2)))
}

/// Parses `$<len>\r\n<data>\r\n`. `Some((None, n))` is the null bulk string.
fn parse_bulk_payload(buf: &[u8]) -> ParseResult<Option<(Option<Bytes>, usize)>> {
    let (length, data_start) = match read_header(buf)? {
        Some(header) => header,
        None => return Ok(None),
    };

    if length == -1 {
        return Ok(Some((None, data_start)));
    }
    if length < 0 {
        return Err(ParseError::InvalidBulkLength(length));
    }

    let length = length as usize;
    if length > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    let total = data_start + length + 2;
    if buf.len() < total {
        return Ok(None);
    }
    if &buf[data_start + length..total] != CRLF {
        return Err(ParseError::ProtocolError(
            "bulk string length does not match payload".to_string(),
        ));
    }

    let data = Bytes::copy_from_slice(&buf[data_start..data_start + length]);
    Ok(Some((Some(data), total)))
}

/// Parses a `+...` or `-...` line into a value with `wrap`.
fn parse_line(
    buf: &[u8],
    wrap: fn(String) -> RespValue,
) -> ParseResult<Option<(RespValue, usize)>> {
    match find_crlf(&buf[1..]) {
        Some(pos) => {
            let s = std::str::from_utf8(&buf[1..1 + pos])
                .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
            Ok(Some((wrap(s.to_string()), 1 + pos + 2)))
        }
        None => Ok(None),
    }
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Parses a single RESP value from bytes.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}

/// Decodes a single request from bytes.
pub fn decode_command(buf: &[u8]) -> ParseResult<Option<(Command, usize)>> {
    RespParser::new().decode(buf)
}
