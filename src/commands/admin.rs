//! Connection and server commands: PING, ECHO, QUIT, DBSIZE, FLUSHALL,
//! FLUSHDB, INFO, COMMAND, CONFIG.

use super::error::{CommandError, CommandResult};
use super::handler::CommandHandler;
use crate::protocol::RespValue;
use bytes::Bytes;
use tracing::info;

/// PING [message]
pub(super) fn ping(_ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(match args.first() {
        Some(message) => RespValue::bulk_string(message.clone()),
        None => RespValue::pong(),
    })
}

/// ECHO message
pub(super) fn echo(_ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::bulk_string(args[0].clone()))
}

/// QUIT
///
/// The connection layer closes the socket after sending this reply.
pub(super) fn quit(_ctx: &CommandHandler, _args: &[Bytes]) -> CommandResult {
    Ok(RespValue::ok())
}

/// DBSIZE
pub(super) fn dbsize(ctx: &CommandHandler, _args: &[Bytes]) -> CommandResult {
    Ok(RespValue::integer(ctx.storage().len() as i64))
}

/// FLUSHALL / FLUSHDB [ASYNC|SYNC]
pub(super) fn flush(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    if let Some(mode) = args.first() {
        if !mode.eq_ignore_ascii_case(b"ASYNC") && !mode.eq_ignore_ascii_case(b"SYNC") {
            return Err(CommandError::Syntax);
        }
    }

    ctx.storage().flush();
    info!("Database flushed");
    Ok(RespValue::ok())
}

/// INFO [section ...]
pub(super) fn info(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let wants = |section: &str| {
        args.is_empty()
            || args.iter().any(|arg| {
                arg.eq_ignore_ascii_case(section.as_bytes())
                    || arg.eq_ignore_ascii_case(b"all")
                    || arg.eq_ignore_ascii_case(b"everything")
            })
    };

    let mut out = String::new();

    if wants("server") {
        out.push_str(&format!(
            "# Server\r\n\
             redkv_version:{}\r\n\
             os:{}\r\n\
             process_id:{}\r\n\
             uptime_in_seconds:{}\r\n\r\n",
            crate::VERSION,
            std::env::consts::OS,
            std::process::id(),
            ctx.uptime().as_secs(),
        ));
    }

    let stats = ctx.storage().stats();

    if wants("stats") {
        out.push_str(&format!("# Stats\r\nexpired_keys:{}\r\n\r\n", stats.expired));
    }

    if wants("keyspace") {
        out.push_str("# Keyspace\r\n");
        if stats.keys > 0 {
            out.push_str(&format!(
                "db0:keys={},expires={}\r\n",
                stats.keys, stats.expires
            ));
        }
    }

    Ok(RespValue::bulk_string(Bytes::from(out)))
}

/// COMMAND [...]
///
/// Clients such as `redis-cli` probe this on connect; an empty reply is
/// enough for them.
pub(super) fn command(_ctx: &CommandHandler, _args: &[Bytes]) -> CommandResult {
    Ok(RespValue::array(Vec::new()))
}

/// CONFIG GET pattern | CONFIG SET parameter value
///
/// No parameter is exposed at runtime.
pub(super) fn config(_ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let sub = &args[0];
    if sub.eq_ignore_ascii_case(b"GET") {
        if args.len() < 2 {
            return Err(CommandError::WrongArity("config|get"));
        }
        Ok(RespValue::array(Vec::new()))
    } else if sub.eq_ignore_ascii_case(b"SET") {
        if args.len() < 3 || args.len() % 2 == 0 {
            return Err(CommandError::WrongArity("config|set"));
        }
        Ok(RespValue::ok())
    } else {
        Err(CommandError::UnknownSubcommand(
            String::from_utf8_lossy(sub).into_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::handler::tests::{bulk, create_handler, run};
    use crate::protocol::RespValue;

    #[test]
    fn test_ping() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["PING"]), RespValue::simple_string("PONG"));
        assert_eq!(run(&handler, &["PING", "hello"]), bulk("hello"));
        assert!(run(&handler, &["PING", "a", "b"]).is_error());
    }

    #[test]
    fn test_echo() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["ECHO", "Hello World"]), bulk("Hello World"));
    }

    #[test]
    fn test_quit_replies_ok() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["QUIT"]), RespValue::ok());
    }

    #[test]
    fn test_dbsize_and_flush() {
        let handler = create_handler();
        run(&handler, &["SET", "a", "1"]);
        run(&handler, &["SADD", "b", "x"]);
        assert_eq!(run(&handler, &["DBSIZE"]), RespValue::integer(2));

        assert_eq!(run(&handler, &["FLUSHALL"]), RespValue::ok());
        assert_eq!(run(&handler, &["DBSIZE"]), RespValue::integer(0));

        run(&handler, &["SET", "a", "1"]);
        assert_eq!(run(&handler, &["FLUSHDB", "ASYNC"]), RespValue::ok());
        assert_eq!(run(&handler, &["DBSIZE"]), RespValue::integer(0));

        assert_eq!(
            run(&handler, &["FLUSHDB", "LATER"]),
            RespValue::error("ERR syntax error")
        );
    }

    #[test]
    fn test_info_sections() {
        let handler = create_handler();
        run(&handler, &["SET", "a", "1"]);
        run(&handler, &["SET", "b", "1", "EX", "100"]);

        let all = run(&handler, &["INFO"]);
        let text = all.as_str().unwrap();
        assert!(text.contains("# Server"));
        assert!(text.contains("db0:keys=2,expires=1"));

        let keyspace = run(&handler, &["INFO", "keyspace"]);
        let text = keyspace.as_str().unwrap();
        assert!(!text.contains("# Server"));
        assert!(text.contains("# Keyspace"));
    }

    #[test]
    fn test_command_and_config() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["COMMAND", "DOCS"]), RespValue::array(vec![]));
        assert_eq!(run(&handler, &["CONFIG", "GET", "save"]), RespValue::array(vec![]));
        assert_eq!(run(&handler, &["CONFIG", "SET", "save", ""]), RespValue::ok());
        assert_eq!(
            run(&handler, &["CONFIG", "RESETSTAT"]),
            RespValue::error("ERR unknown subcommand 'RESETSTAT'")
        );
    }
}
