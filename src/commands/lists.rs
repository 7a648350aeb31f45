//! List commands: LPUSH, RPUSH, LPOP, RPOP, LLEN, LINDEX, LRANGE, LSET, LREM.

use super::error::CommandResult;
use super::handler::{parse_int, CommandHandler};
use crate::protocol::RespValue;
use crate::storage::ListEnd;
use bytes::Bytes;

/// LPUSH key element [element ...]
pub(super) fn lpush(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    push(ctx, args, ListEnd::Left)
}

/// RPUSH key element [element ...]
pub(super) fn rpush(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    push(ctx, args, ListEnd::Right)
}

fn push(ctx: &CommandHandler, args: &[Bytes], end: ListEnd) -> CommandResult {
    let len = ctx.storage().push(&args[0], args[1..].to_vec(), end)?;
    Ok(RespValue::integer(len as i64))
}

/// LPOP key
pub(super) fn lpop(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::optional_bulk(ctx.storage().pop(&args[0], ListEnd::Left)?))
}

/// RPOP key
pub(super) fn rpop(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::optional_bulk(ctx.storage().pop(&args[0], ListEnd::Right)?))
}

/// LLEN key
pub(super) fn llen(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::integer(ctx.storage().llen(&args[0])? as i64))
}

/// LINDEX key index
pub(super) fn lindex(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let index = parse_int(&args[1])?;
    Ok(RespValue::optional_bulk(ctx.storage().lindex(&args[0], index)?))
}

/// LRANGE key start stop
pub(super) fn lrange(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let start = parse_int(&args[1])?;
    let stop = parse_int(&args[2])?;
    Ok(RespValue::bulk_array(ctx.storage().lrange(&args[0], start, stop)?))
}

/// LSET key index element
pub(super) fn lset(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let index = parse_int(&args[1])?;
    ctx.storage().lset(&args[0], index, args[2].clone())?;
    Ok(RespValue::ok())
}

/// LREM key count element
pub(super) fn lrem(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let count = parse_int(&args[1])?;
    let removed = ctx.storage().lrem(&args[0], count, &args[2])?;
    Ok(RespValue::integer(removed as i64))
}

#[cfg(test)]
mod tests {
    use crate::commands::handler::tests::{bulk, create_handler, run};
    use crate::protocol::RespValue;

    fn list(items: &[&str]) -> RespValue {
        RespValue::array(items.iter().map(|s| bulk(s)).collect())
    }

    #[test]
    fn test_push_and_range() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["RPUSH", "l", "a", "b"]), RespValue::integer(2));
        assert_eq!(run(&handler, &["LPUSH", "l", "x", "y"]), RespValue::integer(4));
        assert_eq!(run(&handler, &["LRANGE", "l", "0", "-1"]), list(&["y", "x", "a", "b"]));
        assert_eq!(run(&handler, &["LRANGE", "l", "1", "2"]), list(&["x", "a"]));
        assert_eq!(run(&handler, &["LRANGE", "missing", "0", "-1"]), list(&[]));
        assert_eq!(run(&handler, &["LLEN", "l"]), RespValue::integer(4));
    }

    #[test]
    fn test_pop_until_empty_removes_key() {
        let handler = create_handler();
        run(&handler, &["RPUSH", "l", "a", "b"]);
        assert_eq!(run(&handler, &["LPOP", "l"]), bulk("a"));
        assert_eq!(run(&handler, &["RPOP", "l"]), bulk("b"));
        assert_eq!(run(&handler, &["LPOP", "l"]), RespValue::null());
        assert_eq!(run(&handler, &["EXISTS", "l"]), RespValue::integer(0));
    }

    #[test]
    fn test_lindex_lset() {
        let handler = create_handler();
        run(&handler, &["RPUSH", "l", "a", "b", "c"]);
        assert_eq!(run(&handler, &["LINDEX", "l", "-1"]), bulk("c"));
        assert_eq!(run(&handler, &["LINDEX", "l", "9"]), RespValue::null());

        assert_eq!(run(&handler, &["LSET", "l", "0", "A"]), RespValue::ok());
        assert_eq!(run(&handler, &["LINDEX", "l", "0"]), bulk("A"));
        assert_eq!(
            run(&handler, &["LSET", "l", "5", "z"]),
            RespValue::error("ERR index out of range")
        );
        assert_eq!(
            run(&handler, &["LSET", "nope", "0", "z"]),
            RespValue::error("ERR no such key")
        );
        assert_eq!(
            run(&handler, &["LINDEX", "l", "first"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
    }

    #[test]
    fn test_lrem() {
        let handler = create_handler();
        run(&handler, &["RPUSH", "l", "a", "b", "a", "c", "a"]);
        assert_eq!(run(&handler, &["LREM", "l", "-2", "a"]), RespValue::integer(2));
        assert_eq!(run(&handler, &["LRANGE", "l", "0", "-1"]), list(&["a", "b", "c"]));
        assert_eq!(run(&handler, &["LREM", "missing", "0", "a"]), RespValue::integer(0));
    }

    #[test]
    fn test_push_onto_string_fails_and_keeps_value() {
        let handler = create_handler();
        run(&handler, &["SET", "k", "v"]);
        assert_eq!(
            run(&handler, &["LPUSH", "k", "x"]),
            RespValue::error("WRONGTYPE Operation against a key holding the wrong kind of value")
        );
        assert_eq!(run(&handler, &["GET", "k"]), bulk("v"));
    }
}
