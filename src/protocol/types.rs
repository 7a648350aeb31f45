//! RESP (Redis Serialization Protocol) Data Types
//!
//! Replies are modelled by [`RespValue`]; requests are decoded into a
//! [`Command`]. Every RESP frame starts with a one-byte marker:
//! - `+` Simple String
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String
//! - `*` Array
//!
//! All lines are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Simple String: `+OK\r\n`
//! Error: `-ERR unknown command\r\n`
//! Integer: `:1000\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Array: `*2\r\n$3\r\nGET\r\n$4\r\nname\r\n`
//! Null Bulk String: `$-1\r\n`

use bytes::Bytes;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A decoded client request: the command name followed by its arguments.
///
/// Commands are ephemeral. The executor consumes them as soon as they are
/// decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name exactly as the client sent it (case is not normalised)
    pub name: Bytes,
    /// Arguments in the order they were sent
    pub args: Vec<Bytes>,
}

impl Command {
    pub fn new(name: impl Into<Bytes>, args: Vec<Bytes>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Builds a command from string parts, e.g. `["SET", "k", "v"]`.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_parts<S: AsRef<[u8]>>(parts: &[S]) -> Option<Self> {
        let (name, rest) = parts.split_first()?;
        Some(Self {
            name: Bytes::copy_from_slice(name.as_ref()),
            args: rest
                .iter()
                .map(|p| Bytes::copy_from_slice(p.as_ref()))
                .collect(),
        })
    }

    /// The command name as lossy UTF-8, for logs and error messages.
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    /// Encodes the command as a RESP array of bulk strings, the way a client
    /// would send it.
    pub fn to_resp(&self) -> RespValue {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(RespValue::BulkString(self.name.clone()));
        parts.extend(self.args.iter().cloned().map(RespValue::BulkString));
        RespValue::Array(parts)
    }
}

/// A reply sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Status reply, e.g. `OK`. Must not contain CR or LF.
    /// Format: `+<string>\r\n`
    SimpleString(String),

    /// Error reply. The first word is the error kind (`ERR`, `WRONGTYPE`).
    /// Format: `-<error message>\r\n`
    Error(String),

    /// 64-bit signed integer.
    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Binary-safe string.
    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Absent value, encoded as the null bulk string `$-1\r\n`.
    Null,

    /// Ordered sequence of replies, may nest.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// Builds an array of bulk strings.
    pub fn bulk_array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        RespValue::Array(items.into_iter().map(RespValue::BulkString).collect())
    }

    /// Bulk string if present, null otherwise.
    pub fn optional_bulk(value: Option<Bytes>) -> Self {
        value.map_or(RespValue::Null, RespValue::BulkString)
    }

    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    pub fn pong() -> Self {
        RespValue::SimpleString("PONG".to_string())
    }

    /// Serializes the reply to its wire format.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => write_line(buf, prefix::SIMPLE_STRING, s.as_bytes()),
            RespValue::Error(s) => write_line(buf, prefix::ERROR, s.as_bytes()),
            RespValue::Integer(n) => write_line(buf, prefix::INTEGER, n.to_string().as_bytes()),
            RespValue::BulkString(data) => {
                write_line(buf, prefix::BULK_STRING, data.len().to_string().as_bytes());
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Null => write_line(buf, prefix::BULK_STRING, b"-1"),
            RespValue::Array(values) => {
                write_line(buf, prefix::ARRAY, values.len().to_string().as_bytes());
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Attempts to extract the inner string from SimpleString or BulkString.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::SimpleString(s) => Some(s),
            RespValue::BulkString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }
}

/// Writes `<marker><content>\r\n`. Simple strings and errors are line
/// oriented, so stray CR/LF bytes are replaced to keep the frame intact.
fn write_line(buf: &mut Vec<u8>, marker: u8, content: &[u8]) {
    buf.push(marker);
    buf.extend(
        content
            .iter()
            .map(|&b| if b == b'\r' || b == b'\n' { b' ' } else { b }),
    );
    buf.extend_from_slice(CRLF);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_string_serialize() {
        let value = RespValue::simple_string("OK");
        assert_eq!(value.serialize(), b"+OK\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let value = RespValue::error("ERR unknown command");
        assert_eq!(value.serialize(), b"-ERR unknown command\r\n");
    }

    #[test]
    fn test_error_with_newline_stays_one_line() {
        let value = RespValue::error("ERR bad\r\nthing");
        assert_eq!(value.serialize(), b"-ERR bad  thing\r\n");
    }

    #[test]
    fn test_integer_serialize() {
        assert_eq!(RespValue::integer(1000).serialize(), b":1000\r\n");
        assert_eq!(RespValue::integer(-42).serialize(), b":-42\r\n");
    }

    #[test]
    fn test_bulk_string_serialize() {
        let value = RespValue::bulk_string(Bytes::from("hello"));
        assert_eq!(value.serialize(), b"$5\r\nhello\r\n");
    }

    #[test]
    fn test_binary_bulk_string_serialize() {
        let value = RespValue::bulk_string(Bytes::from_static(b"a\r\nb"));
        assert_eq!(value.serialize(), b"$4\r\na\r\nb\r\n");
    }

    #[test]
    fn test_null_serialize() {
        assert_eq!(RespValue::null().serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_empty_array_serialize() {
        assert_eq!(RespValue::array(vec![]).serialize(), b"*0\r\n");
    }

    #[test]
    fn test_nested_array_serialize() {
        let value = RespValue::array(vec![
            RespValue::integer(1),
            RespValue::array(vec![RespValue::integer(2), RespValue::null()]),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n:1\r\n*2\r\n:2\r\n$-1\r\n");
    }

    #[test]
    fn test_command_to_resp() {
        let cmd = Command::from_parts(&["GET", "name"]).unwrap();
        assert_eq!(cmd.to_resp().serialize(), b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
    }

    #[test]
    fn test_command_from_empty_parts() {
        let parts: [&str; 0] = [];
        assert!(Command::from_parts(&parts).is_none());
    }
}
