//! Hash commands: HSET, HGET, HDEL, HEXISTS, HLEN, HGETALL, HKEYS, HVALS,
//! HINCRBY.

use super::error::{CommandError, CommandResult};
use super::handler::{parse_int, CommandHandler};
use crate::protocol::RespValue;
use bytes::Bytes;

/// HSET key field value [field value ...]
pub(super) fn hset(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let pairs = &args[1..];
    if pairs.len() % 2 != 0 {
        return Err(CommandError::WrongArity("hset"));
    }

    let pairs = pairs
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();
    let added = ctx.storage().hset(&args[0], pairs)?;
    Ok(RespValue::integer(added as i64))
}

/// HGET key field
pub(super) fn hget(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::optional_bulk(ctx.storage().hget(&args[0], &args[1])?))
}

/// HDEL key field [field ...]
pub(super) fn hdel(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::integer(ctx.storage().hdel(&args[0], &args[1..])? as i64))
}

/// HEXISTS key field
pub(super) fn hexists(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::integer(ctx.storage().hexists(&args[0], &args[1])? as i64))
}

/// HLEN key
pub(super) fn hlen(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::integer(ctx.storage().hlen(&args[0])? as i64))
}

/// HGETALL key
///
/// Flat `field, value, field, value, ...` array.
pub(super) fn hgetall(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let pairs = ctx.storage().hgetall(&args[0])?;
    Ok(RespValue::bulk_array(
        pairs.into_iter().flat_map(|(field, value)| [field, value]),
    ))
}

/// HKEYS key
pub(super) fn hkeys(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::bulk_array(ctx.storage().hkeys(&args[0])?))
}

/// HVALS key
pub(super) fn hvals(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::bulk_array(ctx.storage().hvals(&args[0])?))
}

/// HINCRBY key field increment
pub(super) fn hincrby(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let delta = parse_int(&args[2])?;
    let value = ctx.storage().hincr_by(&args[0], args[1].clone(), delta)?;
    Ok(RespValue::integer(value))
}

#[cfg(test)]
mod tests {
    use crate::commands::handler::tests::{bulk, create_handler, run};
    use crate::protocol::RespValue;

    #[test]
    fn test_hset_hget() {
        let handler = create_handler();
        assert_eq!(
            run(&handler, &["HSET", "user", "name", "Ariz", "lang", "rust"]),
            RespValue::integer(2)
        );
        assert_eq!(run(&handler, &["HSET", "user", "name", "Ari"]), RespValue::integer(0));
        assert_eq!(run(&handler, &["HGET", "user", "name"]), bulk("Ari"));
        assert_eq!(run(&handler, &["HGET", "user", "age"]), RespValue::null());
        assert_eq!(run(&handler, &["HEXISTS", "user", "lang"]), RespValue::integer(1));
        assert_eq!(run(&handler, &["HLEN", "user"]), RespValue::integer(2));
        assert_eq!(
            run(&handler, &["HSET", "user", "odd"]),
            RespValue::error("ERR wrong number of arguments for 'hset' command")
        );
    }

    #[test]
    fn test_hgetall_is_flat_pairs() {
        let handler = create_handler();
        run(&handler, &["HSET", "h", "f", "v"]);
        assert_eq!(
            run(&handler, &["HGETALL", "h"]),
            RespValue::array(vec![bulk("f"), bulk("v")])
        );
        assert_eq!(run(&handler, &["HKEYS", "h"]), RespValue::array(vec![bulk("f")]));
        assert_eq!(run(&handler, &["HVALS", "h"]), RespValue::array(vec![bulk("v")]));
        assert_eq!(run(&handler, &["HGETALL", "none"]), RespValue::array(vec![]));
    }

    #[test]
    fn test_hdel_removes_empty_hash() {
        let handler = create_handler();
        run(&handler, &["HSET", "h", "a", "1", "b", "2"]);
        assert_eq!(run(&handler, &["HDEL", "h", "a", "b", "c"]), RespValue::integer(2));
        assert_eq!(run(&handler, &["TYPE", "h"]), RespValue::simple_string("none"));
    }

    #[test]
    fn test_hincrby() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["HINCRBY", "h", "n", "5"]), RespValue::integer(5));
        assert_eq!(run(&handler, &["HINCRBY", "h", "n", "-7"]), RespValue::integer(-2));

        run(&handler, &["HSET", "h", "s", "text"]);
        assert_eq!(
            run(&handler, &["HINCRBY", "h", "s", "1"]),
            RespValue::error("ERR hash value is not an integer")
        );
        assert_eq!(
            run(&handler, &["HINCRBY", "h", "n", "x"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
    }
}
