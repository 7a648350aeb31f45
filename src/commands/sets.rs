//! Set commands: SADD, SREM, SISMEMBER, SMEMBERS, SCARD.

use super::error::CommandResult;
use super::handler::CommandHandler;
use crate::protocol::RespValue;
use bytes::Bytes;

/// SADD key member [member ...]
pub(super) fn sadd(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    let added = ctx.storage().sadd(&args[0], args[1..].to_vec())?;
    Ok(RespValue::integer(added as i64))
}

/// SREM key member [member ...]
pub(super) fn srem(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::integer(ctx.storage().srem(&args[0], &args[1..])? as i64))
}

/// SISMEMBER key member
pub(super) fn sismember(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::integer(ctx.storage().sismember(&args[0], &args[1])? as i64))
}

/// SMEMBERS key
pub(super) fn smembers(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::bulk_array(ctx.storage().smembers(&args[0])?))
}

/// SCARD key
pub(super) fn scard(ctx: &CommandHandler, args: &[Bytes]) -> CommandResult {
    Ok(RespValue::integer(ctx.storage().scard(&args[0])? as i64))
}
