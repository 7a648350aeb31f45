//! Static command table.
//!
//! Each entry names a command, bounds its argument count (not counting the
//! command name) and points at the handler function. Arity is checked here
//! so handlers can index their arguments directly.

use super::error::{CommandError, CommandResult};
use super::handler::CommandHandler;
use super::{admin, hashes, keys, lists, sets, strings};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::OnceLock;

pub(crate) type HandlerFn = fn(&CommandHandler, &[Bytes]) -> CommandResult;

/// One registered command.
pub struct CommandSpec {
    /// Lowercase name, also used in arity errors
    pub name: &'static str,
    pub min_args: usize,
    /// `None` for variadic commands
    pub max_args: Option<usize>,
    pub(crate) run: HandlerFn,
}

impl CommandSpec {
    const fn new(name: &'static str, min_args: usize, max_args: Option<usize>, run: HandlerFn) -> Self {
        Self {
            name,
            min_args,
            max_args,
            run,
        }
    }

    pub fn check_arity(&self, args: usize) -> Result<(), CommandError> {
        let too_many = self.max_args.is_some_and(|max| args > max);
        if args < self.min_args || too_many {
            return Err(CommandError::WrongArity(self.name));
        }
        Ok(())
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

const ANY: Option<usize> = None;

const fn exactly(n: usize) -> Option<usize> {
    Some(n)
}

static COMMANDS: &[CommandSpec] = &[
    // Connection and server
    CommandSpec::new("ping", 0, exactly(1), admin::ping),
    CommandSpec::new("echo", 1, exactly(1), admin::echo),
    CommandSpec::new("quit", 0, ANY, admin::quit),
    CommandSpec::new("dbsize", 0, exactly(0), admin::dbsize),
    CommandSpec::new("flushall", 0, exactly(1), admin::flush),
    CommandSpec::new("flushdb", 0, exactly(1), admin::flush),
    CommandSpec::new("info", 0, ANY, admin::info),
    CommandSpec::new("command", 0, ANY, admin::command),
    CommandSpec::new("config", 1, ANY, admin::config),
    // Keyspace
    CommandSpec::new("del", 1, ANY, keys::del),
    CommandSpec::new("exists", 1, ANY, keys::exists),
    CommandSpec::new("expire", 2, exactly(2), keys::expire),
    CommandSpec::new("pexpire", 2, exactly(2), keys::pexpire),
    CommandSpec::new("ttl", 1, exactly(1), keys::ttl),
    CommandSpec::new("pttl", 1, exactly(1), keys::pttl),
    CommandSpec::new("persist", 1, exactly(1), keys::persist),
    CommandSpec::new("type", 1, exactly(1), keys::key_type),
    CommandSpec::new("keys", 1, exactly(1), keys::keys),
    CommandSpec::new("rename", 2, exactly(2), keys::rename),
    // Strings
    CommandSpec::new("get", 1, exactly(1), strings::get),
    CommandSpec::new("set", 2, ANY, strings::set),
    CommandSpec::new("setnx", 2, exactly(2), strings::setnx),
    CommandSpec::new("setex", 3, exactly(3), strings::setex),
    CommandSpec::new("getdel", 1, exactly(1), strings::getdel),
    CommandSpec::new("mset", 2, ANY, strings::mset),
    CommandSpec::new("mget", 1, ANY, strings::mget),
    CommandSpec::new("append", 2, exactly(2), strings::append),
    CommandSpec::new("strlen", 1, exactly(1), strings::strlen),
    CommandSpec::new("incr", 1, exactly(1), strings::incr),
    CommandSpec::new("decr", 1, exactly(1), strings::decr),
    CommandSpec::new("incrby", 2, exactly(2), strings::incrby),
    CommandSpec::new("decrby", 2, exactly(2), strings::decrby),
    // Lists
    CommandSpec::new("lpush", 2, ANY, lists::lpush),
    CommandSpec::new("rpush", 2, ANY, lists::rpush),
    CommandSpec::new("lpop", 1, exactly(1), lists::lpop),
    CommandSpec::new("rpop", 1, exactly(1), lists::rpop),
    CommandSpec::new("llen", 1, exactly(1), lists::llen),
    CommandSpec::new("lindex", 2, exactly(2), lists::lindex),
    CommandSpec::new("lrange", 3, exactly(3), lists::lrange),
    CommandSpec::new("lset", 3, exactly(3), lists::lset),
    CommandSpec::new("lrem", 3, exactly(3), lists::lrem),
    // Hashes
    CommandSpec::new("hset", 3, ANY, hashes::hset),
    CommandSpec::new("hget", 2, exactly(2), hashes::hget),
    CommandSpec::new("hdel", 2, ANY, hashes::hdel),
    CommandSpec::new("hexists", 2, exactly(2), hashes::hexists),
    CommandSpec::new("hlen", 1, exactly(1), hashes::hlen),
    CommandSpec::new("hgetall", 1, exactly(1), hashes::hgetall),
    CommandSpec::new("hkeys", 1, exactly(1), hashes::hkeys),
    CommandSpec::new("hvals", 1, exactly(1), hashes::hvals),
    CommandSpec::new("hincrby", 3, exactly(3), hashes::hincrby),
    // Sets
    CommandSpec::new("sadd", 2, ANY, sets::sadd),
    CommandSpec::new("srem", 2, ANY, sets::srem),
    CommandSpec::new("sismember", 2, exactly(2), sets::sismember),
    CommandSpec::new("smembers", 1, exactly(1), sets::smembers),
    CommandSpec::new("scard", 1, exactly(1), sets::scard),
];

fn table() -> &'static HashMap<&'static str, &'static CommandSpec> {
    static TABLE: OnceLock<HashMap<&'static str, &'static CommandSpec>> = OnceLock::new();
    TABLE.get_or_init(|| COMMANDS.iter().map(|spec| (spec.name, spec)).collect())
}

/// Finds a command by name, ignoring ASCII case.
pub fn lookup(name: &[u8]) -> Option<&'static CommandSpec> {
    let name = std::str::from_utf8(name).ok()?;
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        table().get(name.to_ascii_lowercase().as_str()).copied()
    } else {
        table().get(name).copied()
    }
}

/// All registered commands, in table order.
pub fn commands() -> &'static [CommandSpec] {
    COMMANDS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        assert_eq!(lookup(b"GET").map(|c| c.name), Some("get"));
        assert_eq!(lookup(b"gEt").map(|c| c.name), Some("get"));
        assert_eq!(lookup(b"hincrby").map(|c| c.name), Some("hincrby"));
        assert!(lookup(b"GETX").is_none());
        assert!(lookup(b"\xff").is_none());
    }

    #[test]
    fn test_names_are_unique_and_lowercase() {
        assert_eq!(table().len(), COMMANDS.len());
        for spec in commands() {
            assert_eq!(spec.name, spec.name.to_ascii_lowercase());
            if let Some(max) = spec.max_args {
                assert!(max >= spec.min_args, "{} has max < min", spec.name);
            }
        }
    }

    #[test]
    fn test_check_arity() {
        let get = lookup(b"get").unwrap();
        assert!(get.check_arity(1).is_ok());
        assert_eq!(get.check_arity(0), Err(CommandError::WrongArity("get")));
        assert_eq!(get.check_arity(2), Err(CommandError::WrongArity("get")));

        let del = lookup(b"del").unwrap();
        assert!(del.check_arity(100).is_ok());
    }
}
