/*
 * Created on Wed Aug 19 2020
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2020, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! # The command table
//!
//! One flat name → handler map, case-normalized to upper byte-string, with no subcommand
//! namespacing (§4.2). `QUIT`/`SHUTDOWN` are control signals and never touch the locked
//! [`Core`]; `INFO`/`SAVE`/`RESTORE`/`MERGE` need the whole [`Database`]; everything else runs
//! under a single lock acquisition per command.

use crate::actions::{admin, hash, kv, list, schedule, set, ActionResult};
use crate::protocol::Value;
use crate::state::{Core, Database};
use crate::util::CmdError;
use bytes::Bytes;

/// What the connection loop does after a request has been handled (§4.7).
#[derive(Debug)]
pub enum Outcome {
    /// Write this frame back and keep reading from the connection.
    Reply(Value),
    /// Write this frame back, then close the connection.
    Quit(Value),
    /// Write this frame back, then unwind the accept loop.
    Shutdown(Value),
}

/// Turn a top-level request frame into a command name plus positional arguments (§4.2 step 1).
fn resolve_args(request: Value) -> Result<Vec<Value>, CmdError> {
    match request {
        Value::Array(items) => Ok(items),
        Value::Str(b) => Ok(b
            .split(|c| *c == b' ')
            .filter(|piece| !piece.is_empty())
            .map(|piece| Value::bytes(Bytes::copy_from_slice(piece)))
            .collect()),
        Value::Text(s) => Ok(s
            .split_ascii_whitespace()
            .map(Value::text)
            .collect()),
        _ => Err(CmdError::new("unrecognized request type")),
    }
}

/// Execute one request against `db`, returning the frame to write and what to do next.
pub fn execute(db: &Database, request: Value) -> Outcome {
    let outcome = run(db, request);
    match &outcome {
        Outcome::Reply(Value::Error(_)) => db.counters.command_err(),
        _ => db.counters.command_ok(),
    }
    outcome
}

fn run(db: &Database, request: Value) -> Outcome {
    let args = match resolve_args(request) {
        Ok(a) => a,
        Err(e) => return Outcome::Reply(Value::Error(e.0)),
    };
    let Some(first) = args.first() else {
        return Outcome::Reply(Value::Error(CmdError::new("unrecognized request type").0));
    };
    let Some(name) = first.as_bytes() else {
        return Outcome::Reply(Value::Error(
            CmdError::new("first parameter must be a command name").0,
        ));
    };
    let name = name.to_ascii_uppercase();
    let rest = &args[1..];

    match name.as_slice() {
        b"QUIT" => Outcome::Quit(Value::Int(1)),
        b"SHUTDOWN" => Outcome::Shutdown(Value::Int(1)),
        b"INFO" => reply(admin::info(db, rest)),
        b"SAVE" => reply(admin::save(db, rest)),
        b"RESTORE" => reply(admin::restore(db, rest)),
        b"MERGE" => reply(admin::merge(db, rest)),
        other => reply(db.with_core(|core| dispatch_with_extensions(db, core, other, rest))),
    }
}

/// Builtins first; a name the table doesn't recognize falls through to the extension registry
/// (§6) before surfacing as `unrecognized command`.
fn dispatch_with_extensions(db: &Database, core: &mut Core, name: &[u8], args: &[Value]) -> ActionResult {
    match dispatch_core(core, name, args) {
        Err(e) if e == CmdError::unknown_command(&String::from_utf8_lossy(name)) => {
            match db.lookup_command(name) {
                Some(handler) => handler(core, args),
                None => Err(e),
            }
        }
        other => other,
    }
}

fn reply(result: ActionResult) -> Outcome {
    match result {
        Ok(v) => Outcome::Reply(v),
        Err(e) => Outcome::Reply(Value::Error(e.0)),
    }
}

/// The handlers that only ever need the locked core, matched by upper-cased command name
/// (teacher's `gen_match!` pattern in `queryengine/mod.rs`, flattened to one table since this
/// keyspace has no subcommand namespacing).
fn dispatch_core(core: &mut Core, name: &[u8], args: &[Value]) -> ActionResult {
    match name {
        b"SET" => kv::set(core, args),
        b"SETNX" => kv::setnx(core, args),
        b"SETEX" => kv::setex(core, args),
        b"GET" => kv::get(core, args),
        b"GETSET" => kv::getset(core, args),
        b"DELETE" => kv::delete(core, args),
        b"EXISTS" => kv::exists(core, args),
        b"APPEND" => kv::append(core, args),
        b"INCR" => kv::incr(core, args),
        b"DECR" => kv::decr(core, args),
        b"INCRBY" => kv::incrby(core, args),
        b"MGET" => kv::mget(core, args),
        b"MSET" => kv::mset(core, args),
        b"MDELETE" => kv::mdelete(core, args),
        b"MPOP" => kv::mpop(core, args),
        b"MSETEX" => kv::msetex(core, args),
        b"POP" => kv::pop(core, args),
        b"LEN" => kv::len(core, args),
        b"FLUSH" => kv::flush(core, args),

        b"HSET" => hash::hset(core, args),
        b"HSETNX" => hash::hsetnx(core, args),
        b"HGET" => hash::hget(core, args),
        b"HDEL" => hash::hdel(core, args),
        b"HEXISTS" => hash::hexists(core, args),
        b"HGETALL" => hash::hgetall(core, args),
        b"HKEYS" => hash::hkeys(core, args),
        b"HVALS" => hash::hvals(core, args),
        b"HLEN" => hash::hlen(core, args),
        b"HMGET" => hash::hmget(core, args),
        b"HMSET" => hash::hmset(core, args),
        b"HINCRBY" => hash::hincrby(core, args),

        b"LPUSH" => list::lpush(core, args),
        b"RPUSH" => list::rpush(core, args),
        b"LPOP" => list::lpop(core, args),
        b"RPOP" => list::rpop(core, args),
        b"LREM" => list::lrem(core, args),
        b"LLEN" => list::llen(core, args),
        b"LINDEX" => list::lindex(core, args),
        b"LRANGE" => list::lrange(core, args),
        b"LSET" => list::lset(core, args),
        b"LTRIM" => list::ltrim(core, args),
        b"RPOPLPUSH" => list::rpoplpush(core, args),
        b"LFLUSH" => list::lflush(core, args),

        b"SADD" => set::sadd(core, args),
        b"SREM" => set::srem(core, args),
        b"SCARD" => set::scard(core, args),
        b"SISMEMBER" => set::sismember(core, args),
        b"SMEMBERS" => set::smembers(core, args),
        b"SPOP" => set::spop(core, args),
        b"SDIFF" => set::sdiff(core, args),
        b"SINTER" => set::sinter(core, args),
        b"SUNION" => set::sunion(core, args),
        b"SDIFFSTORE" => set::sdiffstore(core, args),
        b"SINTERSTORE" => set::sinterstore(core, args),
        b"SUNIONSTORE" => set::sunionstore(core, args),

        b"ADD" => schedule::add(core, args),
        b"READ" => schedule::read(core, args),
        b"FLUSH_SCHEDULE" => schedule::flush_schedule(core, args),
        b"LENGTH_SCHEDULE" => schedule::length_schedule(core, args),

        b"EXPIRE" => admin::expire(core, args),
        b"FLUSHALL" => admin::flushall(core, args),

        _ => Err(CmdError::unknown_command(&String::from_utf8_lossy(name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Database {
        Database::new(Vec::new())
    }

    fn text_args(words: &[&str]) -> Value {
        Value::Array(words.iter().map(|w| Value::text(*w)).collect())
    }

    #[test]
    fn unknown_command_is_a_cmderror_not_a_panic() {
        let db = fresh();
        match execute(&db, text_args(&["NOSUCHCOMMAND"])) {
            Outcome::Reply(Value::Error(_)) => {}
            _ => panic!("expected an error reply"),
        }
    }

    #[test]
    fn quit_and_shutdown_never_touch_the_core() {
        let db = fresh();
        assert!(matches!(execute(&db, text_args(&["QUIT"])), Outcome::Quit(_)));
        assert!(matches!(execute(&db, text_args(&["SHUTDOWN"])), Outcome::Shutdown(_)));
    }

    #[test]
    fn error_then_valid_command_both_succeed_on_the_same_connection() {
        let db = fresh();
        assert!(matches!(execute(&db, text_args(&["BOGUS"])), Outcome::Reply(Value::Error(_))));
        assert!(matches!(
            execute(&db, text_args(&["SET", "k", "v"])),
            Outcome::Reply(Value::Int(1))
        ));
        assert_eq!(db.counters.command_errors.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(db.counters.commands_processed.load(std::sync::atomic::Ordering::Relaxed), 2);
    }

    #[test]
    fn single_string_request_splits_on_whitespace() {
        let db = fresh();
        let reply = execute(&db, Value::text("SET foo bar"));
        assert!(matches!(reply, Outcome::Reply(Value::Int(1))));
        let reply = execute(&db, Value::text("GET foo"));
        match reply {
            Outcome::Reply(Value::Str(b)) => assert_eq!(&b[..], b"bar"),
            other => panic!("unexpected reply: {other:?}"),
        }
    }
}
