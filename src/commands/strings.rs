//! String commands: GET, SET, SETNX, SETEX, GETDEL, MSET, MGET, APPEND,
//! STRLEN, INCR, DECR, INCRBY, DECRBY.

use super::error::{CommandError, CommandResult};
use super::handler::{parse_int, parse_ttl, CommandHandler};
use crate::protocol::RespValue;
use crate::storage::engine::parse_i64;
use crate::storage::{SetCondition, SetOptions, StoreError, Value};
use bytes::Bytes;

/// GET key
pub(super) fn get(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::optional_bulk(ctx.storage().get_string(&args[0])?))
}

/// SET key value [EX seconds | PX milliseconds | KEEPTTL] [NX | XX] [GET]
///
/// Also accepts the short form `SET key value seconds`.
pub(super) fn set(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let options = parse_set_options(&args[2..])?;
    let outcome = ctx
        .storage()
        .set_with(args[0].clone(), args[1].clone(), &options)?;

    Ok(if options.get {
        RespValue::optional_bulk(outcome.previous)
    } else if outcome.applied {
        RespValue::ok()
    } else {
        RespValue::null()
    })
}

fn parse_set_options(opts: &[Bytes]) -> Result<SetOptions, CommandError> {
    let mut options = SetOptions::default();

    if let [secs] = opts {
        if parse_i64(secs).is_some() {
            options.ttl = Some(positive_ttl(secs, 1000)?);
            return Ok(options);
        }
    }

    let mut expiry_seen = false;
    let mut iter = opts.iter();

    while let Some(opt) = iter.next() {
        let opt = opt.to_ascii_uppercase();
        match opt.as_slice() {
            b"NX" | b"XX" => {
                if options.condition != SetCondition::Always {
                    return Err(CommandError::Syntax);
                }
                options.condition = if opt == b"NX" {
                    SetCondition::IfAbsent
                } else {
                    SetCondition::IfPresent
                };
            }
            b"GET" => options.get = true,
            b"KEEPTTL" => {
                if expiry_seen {
                    return Err(CommandError::Syntax);
                }
                expiry_seen = true;
                options.keep_ttl = true;
            }
            b"EX" | b"PX" => {
                if expiry_seen {
                    return Err(CommandError::Syntax);
                }
                expiry_seen = true;
                let amount = iter.next().ok_or(CommandError::Syntax)?;
                let unit_ms = if opt == b"EX" { 1000 } else { 1 };
                options.ttl = Some(positive_ttl(amount, unit_ms)?);
            }
            _ => return Err(CommandError::Syntax),
        }
    }

    Ok(options)
}

/// Expire arguments to SET and SETEX must be strictly positive.
fn positive_ttl(arg: &[u8], unit_ms: u64) -> Result<std::time::Duration, CommandError> {
    parse_ttl(arg, unit_ms, "set")?.ok_or(CommandError::InvalidExpireTime("set"))
}

/// SETNX key value
pub(super) fn setnx(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let options = SetOptions {
        condition: SetCondition::IfAbsent,
        ..Default::default()
    };
    let outcome = ctx
        .storage()
        .set_with(args[0].clone(), args[1].clone(), &options)?;
    Ok(RespValue::integer(outcome.applied as i64))
}

/// SETEX key seconds value
pub(super) fn setex(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let ttl = parse_ttl(&args[1], 1000, "setex")?.ok_or(CommandError::InvalidExpireTime("setex"))?;
    ctx.storage()
        .set(args[0].clone(), Value::String(args[2].clone()), Some(ttl));
    Ok(RespValue::ok())
}

/// GETDEL key
pub(super) fn getdel(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::optional_bulk(ctx.storage().get_del(&args[0])?))
}

/// MSET key value [key value ...]
pub(super) fn mset(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    if args.len() % 2 != 0 {
        return Err(CommandError::WrongArity("mset"));
    }

    let pairs = args
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();
    ctx.storage().set_many(pairs);
    Ok(RespValue::ok())
}

/// MGET key [key ...]
pub(super) fn mget(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::array(
        ctx.storage()
            .get_many(args)
            .into_iter()
            .map(RespValue::optional_bulk)
            .collect(),
    ))
}

/// APPEND key value
pub(super) fn append(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let len = ctx.storage().append(&args[0], &args[1])?;
    Ok(RespValue::integer(len as i64))
}

/// STRLEN key
pub(super) fn strlen(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::integer(ctx.storage().strlen(&args[0])? as i64))
}

/// INCR key
pub(super) fn incr(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    add(ctx, &args[0], 1)
}

/// DECR key
pub(super) fn decr(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    add(ctx, &args[0], -1)
}

/// INCRBY key increment
pub(super) fn incrby(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    add(ctx, &args[0], parse_int(&args[1])?)
}

/// DECRBY key decrement
pub(super) fn decrby(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let delta = parse_int(&args[1])?
        .checked_neg()
        .ok_or(StoreError::Overflow)?;
    add(ctx, &args[0], delta)
}

fn add(ctx: &CommandHandler, key: &Bytes, delta: i64) -> CommandResult {
    Ok(RespValue::integer(ctx.storage().incr_by(key, delta)?))
}

#[cfg(test)]
mod tests {
    use crate::commands::handler::tests::{bulk, create_handler, run};
    use crate::protocol::RespValue;
    use std::thread;
    use std::time::Duration;

    const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

    #[test]
    fn test_set_get() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["SET", "key", "value"]), RespValue::ok());
        assert_eq!(run(&handler, &["GET", "key"]), bulk("value"));
        assert_eq!(run(&handler, &["GET", "nonexistent"]), RespValue::null());
    }

    #[test]
    fn test_set_binary_value() {
        let handler = create_handler();
        let parts: [&[u8]; 3] = [b"SET", b"bin", b"a\r\n\x00b"];
        let cmd = crate::protocol::Command::from_parts(&parts).unwrap();
        assert_eq!(handler.execute(cmd), RespValue::ok());
        assert_eq!(
            run(&handler, &["GET", "bin"]),
            RespValue::bulk_string(&b"a\r\n\x00b"[..])
        );
    }

    #[test]
    fn test_set_with_expiry() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["SET", "key", "value", "PX", "30"]), RespValue::ok());
        assert_eq!(run(&handler, &["GET", "key"]), bulk("value"));

        thread::sleep(Duration::from_millis(60));
        assert_eq!(run(&handler, &["GET", "key"]), RespValue::null());
        assert_eq!(run(&handler, &["GET", "key"]), RespValue::null());
    }

    #[test]
    fn test_set_short_ttl_form() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["SET", "key", "value", "100"]), RespValue::ok());
        assert_eq!(run(&handler, &["TTL", "key"]), RespValue::integer(100));
        assert_eq!(
            run(&handler, &["SET", "key", "value", "0"]),
            RespValue::error("ERR invalid expire time in 'set' command")
        );
    }

    #[test]
    fn test_set_nx_xx() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["SET", "k", "1", "XX"]), RespValue::null());
        assert_eq!(run(&handler, &["SET", "k", "1", "NX"]), RespValue::ok());
        assert_eq!(run(&handler, &["SET", "k", "2", "NX"]), RespValue::null());
        assert_eq!(run(&handler, &["SET", "k", "3", "xx"]), RespValue::ok());
        assert_eq!(run(&handler, &["GET", "k"]), bulk("3"));
    }

    #[test]
    fn test_set_get_option() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["SET", "k", "1", "GET"]), RespValue::null());
        assert_eq!(run(&handler, &["SET", "k", "2", "GET"]), bulk("1"));
        assert_eq!(run(&handler, &["SET", "k", "3", "NX", "GET"]), bulk("2"));
        assert_eq!(run(&handler, &["GET", "k"]), bulk("2"));

        run(&handler, &["LPUSH", "list", "a"]);
        assert_eq!(
            run(&handler, &["SET", "list", "x", "GET"]),
            RespValue::error(WRONGTYPE)
        );
    }

    #[test]
    fn test_set_keepttl() {
        let handler = create_handler();
        run(&handler, &["SET", "k", "1", "EX", "100"]);
        run(&handler, &["SET", "k", "2", "KEEPTTL"]);
        assert_eq!(run(&handler, &["TTL", "k"]), RespValue::integer(100));

        run(&handler, &["SET", "k", "3"]);
        assert_eq!(run(&handler, &["TTL", "k"]), RespValue::integer(-1));
    }

    #[test]
    fn test_set_syntax_errors() {
        let handler = create_handler();
        let syntax = RespValue::error("ERR syntax error");
        assert_eq!(run(&handler, &["SET", "k", "v", "EX"]), syntax);
        assert_eq!(run(&handler, &["SET", "k", "v", "EX", "1", "PX", "1"]), syntax);
        assert_eq!(run(&handler, &["SET", "k", "v", "NX", "XX"]), syntax);
        assert_eq!(run(&handler, &["SET", "k", "v", "KEEPTTL", "EX", "1"]), syntax);
        assert_eq!(run(&handler, &["SET", "k", "v", "BOGUS"]), syntax);
        assert_eq!(
            run(&handler, &["SET", "k", "v", "EX", "ten"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
        assert_eq!(
            run(&handler, &["SET", "k", "v", "EX", "-1"]),
            RespValue::error("ERR invalid expire time in 'set' command")
        );
        assert_eq!(run(&handler, &["EXISTS", "k"]), RespValue::integer(0));
    }

    #[test]
    fn test_set_overwrites_other_types() {
        let handler = create_handler();
        run(&handler, &["SADD", "k", "m"]);
        assert_eq!(run(&handler, &["SET", "k", "v"]), RespValue::ok());
        assert_eq!(run(&handler, &["TYPE", "k"]), RespValue::simple_string("string"));
    }

    #[test]
    fn test_get_on_list_is_wrongtype() {
        let handler = create_handler();
        run(&handler, &["RPUSH", "l", "a"]);
        assert_eq!(run(&handler, &["GET", "l"]), RespValue::error(WRONGTYPE));
    }

    #[test]
    fn test_setnx_setex() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["SETNX", "k", "1"]), RespValue::integer(1));
        assert_eq!(run(&handler, &["SETNX", "k", "2"]), RespValue::integer(0));
        assert_eq!(run(&handler, &["GET", "k"]), bulk("1"));

        assert_eq!(run(&handler, &["SETEX", "s", "100", "v"]), RespValue::ok());
        assert_eq!(run(&handler, &["TTL", "s"]), RespValue::integer(100));
        assert_eq!(
            run(&handler, &["SETEX", "s", "0", "v"]),
            RespValue::error("ERR invalid expire time in 'setex' command")
        );
    }

    #[test]
    fn test_getdel() {
        let handler = create_handler();
        run(&handler, &["SET", "k", "v"]);
        assert_eq!(run(&handler, &["GETDEL", "k"]), bulk("v"));
        assert_eq!(run(&handler, &["GETDEL", "k"]), RespValue::null());
    }

    #[test]
    fn test_mset_mget() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["MSET", "a", "1", "b", "2"]), RespValue::ok());
        assert_eq!(
            run(&handler, &["MGET", "a", "b", "c"]),
            RespValue::array(vec![bulk("1"), bulk("2"), RespValue::null()])
        );
        assert_eq!(
            run(&handler, &["MSET", "a", "1", "b"]),
            RespValue::error("ERR wrong number of arguments for 'mset' command")
        );
    }

    #[test]
    fn test_append_strlen() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["APPEND", "k", "Hello"]), RespValue::integer(5));
        assert_eq!(run(&handler, &["APPEND", "k", " World"]), RespValue::integer(11));
        assert_eq!(run(&handler, &["STRLEN", "k"]), RespValue::integer(11));
        assert_eq!(run(&handler, &["STRLEN", "missing"]), RespValue::integer(0));
    }

    #[test]
    fn test_incr_decr() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["INCR", "n"]), RespValue::integer(1));
        assert_eq!(run(&handler, &["INCR", "n"]), RespValue::integer(2));
        assert_eq!(run(&handler, &["INCRBY", "n", "10"]), RespValue::integer(12));
        assert_eq!(run(&handler, &["DECR", "n"]), RespValue::integer(11));
        assert_eq!(run(&handler, &["DECRBY", "n", "20"]), RespValue::integer(-9));
        assert_eq!(run(&handler, &["GET", "n"]), bulk("-9"));
    }

    #[test]
    fn test_incr_errors_leave_value() {
        let handler = create_handler();
        run(&handler, &["SET", "s", "abc"]);
        assert_eq!(
            run(&handler, &["INCR", "s"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
        assert_eq!(run(&handler, &["GET", "s"]), bulk("abc"));

        run(&handler, &["SET", "max", "9223372036854775807"]);
        assert_eq!(
            run(&handler, &["INCR", "max"]),
            RespValue::error("ERR increment or decrement would overflow")
        );
        assert_eq!(
            run(&handler, &["DECRBY", "n", "-9223372036854775808"]),
            RespValue::error("ERR increment or decrement would overflow")
        );
        assert_eq!(
            run(&handler, &["INCRBY", "n", "1.5"]),
            RespValue::error("ERR value is not an integer or out of range")
        );

        run(&handler, &["SADD", "set", "1"]);
        assert_eq!(run(&handler, &["INCR", "set"]), RespValue::error(WRONGTYPE));
    }
}
