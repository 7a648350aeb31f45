//! RESP Protocol Codec
//!
//! Decodes client requests and encodes replies using the Redis Serialization
//! Protocol (RESP2).
//!
//! - `types`: [`RespValue`] replies and the [`Command`] request
//! - `parser`: incremental decoder for requests and replies
//!
//! ## Example
//!
//! ```
//! use redkv::protocol::{decode_command, RespValue};
//! use bytes::Bytes;
//!
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (command, consumed) = decode_command(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//! assert_eq!(&command.args[0][..], b"name");
//!
//! let reply = RespValue::bulk_string(Bytes::from("Ariz"));
//! assert_eq!(reply.serialize(), b"$4\r\nAriz\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{decode_command, parse_message, ParseError, ParseResult, RespParser};
pub use types::{Command, RespValue};
