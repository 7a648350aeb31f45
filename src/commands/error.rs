//! Command errors.
//!
//! Every error is recovered at the connection boundary and sent to the
//! client as an error reply; the `Display` text is that reply line.

use crate::protocol::{Command, RespValue};
use crate::storage::StoreError;
use thiserror::Error;

/// Longest argument excerpt echoed back in an unknown-command error.
const MAX_ECHOED_ARG: usize = 128;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR unknown command '{name}', with args beginning with: {args}")]
    UnknownCommand { name: String, args: String },

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(&'static str),

    #[error("ERR unknown subcommand '{0}'")]
    UnknownSubcommand(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CommandError {
    /// Builds the unknown-command error, quoting the name and the leading
    /// arguments the way Redis does.
    pub fn unknown(command: &Command) -> Self {
        let args = command
            .args
            .iter()
            .map(|arg| {
                let excerpt = &arg[..arg.len().min(MAX_ECHOED_ARG)];
                format!("'{}' ", String::from_utf8_lossy(excerpt))
            })
            .collect();

        CommandError::UnknownCommand {
            name: command.name_lossy(),
            args,
        }
    }
}

impl From<CommandError> for RespValue {
    fn from(err: CommandError) -> Self {
        RespValue::error(err.to_string())
    }
}

pub type CommandResult = Result<RespValue, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_command_message() {
        let cmd = Command::from_parts(&["FOO", "a", "b"]).unwrap();
        assert_eq!(
            CommandError::unknown(&cmd).to_string(),
            "ERR unknown command 'FOO', with args beginning with: 'a' 'b' "
        );

        let bare = Command::from_parts(&["nope"]).unwrap();
        assert_eq!(
            CommandError::unknown(&bare).to_string(),
            "ERR unknown command 'nope', with args beginning with: "
        );
    }

    #[test]
    fn test_store_errors_pass_through() {
        let err: CommandError = StoreError::WrongType.into();
        assert_eq!(
            RespValue::from(err),
            RespValue::error("WRONGTYPE Operation against a key holding the wrong kind of value")
        );
    }

    #[test]
    fn test_arity_message() {
        assert_eq!(
            CommandError::WrongArity("get").to_string(),
            "ERR wrong number of arguments for 'get' command"
        );
    }
}
