//! Keyspace commands: DEL, EXISTS, EXPIRE, PEXPIRE, TTL, PTTL, PERSIST,
//! TYPE, KEYS, RENAME.

use super::error::CommandResult;
use super::handler::{parse_ttl, CommandHandler};
use crate::protocol::RespValue;
use crate::storage::TtlState;
use bytes::Bytes;
use std::time::Duration;

/// DEL key [key ...]
pub(super) fn del(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::integer(ctx.storage().delete_many(args) as i64))
}

/// EXISTS key [key ...]
pub(super) fn exists(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::integer(ctx.storage().exists_many(args) as i64))
}

/// EXPIRE key seconds
pub(super) fn expire(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let ttl = parse_ttl(&args[1], 1000, "expire")?;
    Ok(apply_expire(ctx, &args[0], ttl))
}

/// PEXPIRE key milliseconds
pub(super) fn pexpire(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let ttl = parse_ttl(&args[1], 1, "pexpire")?;
    Ok(apply_expire(ctx, &args[0], ttl))
}

/// A deadline that is already in the past deletes the key outright.
fn apply_expire(ctx: &CommandHandler, key: &[u8], ttl: Option<Duration>) -> RespValue {
    let applied = match ttl {
        Some(ttl) => ctx.storage().expire(key, ttl),
        None => ctx.storage().delete(key),
    };
    RespValue::integer(applied as i64)
}

/// TTL key
pub(super) fn ttl(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(ttl_reply(ctx.storage().ttl(&args[0]), |left| {
        // Rounded to the nearest second
        ((left.as_millis() + 500) / 1000) as i64
    }))
}

/// PTTL key
pub(super) fn pttl(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(ttl_reply(ctx.storage().ttl(&args[0]), |left| {
        left.as_millis() as i64
    }))
}

fn ttl_reply(state: TtlState, scale: impl FnOnce(Duration) -> i64) -> RespValue {
    RespValue::integer(match state {
        TtlState::Missing => -2,
        TtlState::NoExpiry => -1,
        TtlState::Remaining(left) => scale(left),
    })
}

/// PERSIST key
pub(super) fn persist(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::integer(ctx.storage().persist(&args[0]) as i64))
}

/// TYPE key
pub(super) fn key_type(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let name = ctx
        .storage()
        .key_type(&args[0])
        .map_or("none", |t| t.as_str());
    Ok(RespValue::simple_string(name))
}

/// KEYS pattern
pub(super) fn keys(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::bulk_array(ctx.storage().keys(&args[0])))
}

/// RENAME key newkey
pub(super) fn rename(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    ctx.storage().rename(&args[0], args[1].clone())?;
    Ok(RespValue::ok())
}
