/*
 * Created on Fri Aug 14 2020
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

//! # Scalar (KV) queries
//!
//! `SET`/`GET` and friends, plus the multi-key and numeric variants. Every handler here
//! works against `Variant::Scalar` unless noted.

use super::{
    arg, arg_int, arg_seconds, bool_value, ensure_arity, ensure_nonzero_even, int_value,
    seconds_to_duration, ActionResult,
};
use crate::protocol::Value;
use crate::state::Core;
use crate::store::{Entry, Variant};
use crate::util::CmdError;
use bytes::Bytes;

fn as_scalar_entry(v: Bytes) -> Entry {
    Entry::Scalar(v)
}

pub fn set(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 2)?;
    let key = arg(args, 0)?;
    let val = arg(args, 1)?;
    core.keyspace.set(key, as_scalar_entry(val));
    Ok(int_value(1))
}

pub fn setnx(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 2)?;
    let key = arg(args, 0)?;
    let val = arg(args, 1)?;
    if core.keyspace.exists(&key) {
        Ok(bool_value(false))
    } else {
        core.keyspace.set(key, as_scalar_entry(val));
        Ok(bool_value(true))
    }
}

pub fn setex(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 3)?;
    let key = arg(args, 0)?;
    let val = arg(args, 1)?;
    let secs = arg_seconds(args, 2)?;
    core.keyspace.set(key.clone(), as_scalar_entry(val));
    core.keyspace
        .expiry
        .set(key, chrono::Utc::now() + seconds_to_duration(secs));
    Ok(int_value(1))
}

pub fn get(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    match core.keyspace.read_checked(&key, Variant::Scalar)? {
        Some(Entry::Scalar(b)) => Ok(Value::bytes(b.clone())),
        Some(_) => unreachable!("read_checked enforces the variant"),
        None => Ok(Value::Null),
    }
}

pub fn getset(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 2)?;
    let key = arg(args, 0)?;
    let val = arg(args, 1)?;
    let prior = match core.keyspace.read_checked(&key, Variant::Scalar)? {
        Some(Entry::Scalar(b)) => Value::bytes(b.clone()),
        Some(_) => unreachable!(),
        None => Value::Null,
    };
    core.keyspace.set(key, as_scalar_entry(val));
    Ok(prior)
}

pub fn delete(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    Ok(bool_value(core.keyspace.remove(&key)))
}

pub fn exists(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    Ok(bool_value(core.keyspace.exists(&key)))
}

/// §5 open question 1: `APPEND` exposes exactly one shape — a single value argument. Against
/// a scalar it concatenates bytes; against a list it pushes one new tail element.
pub fn append(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 2)?;
    let key = arg(args, 0)?;
    let val = arg(args, 1)?;
    match core.keyspace.get(&key) {
        Some(Entry::List(_)) => {
            let entry = core.keyspace.write_checked(&key, Variant::List)?;
            if let Entry::List(l) = entry {
                l.push_back(val);
                Ok(int_value(l.len() as i64))
            } else {
                unreachable!()
            }
        }
        Some(Entry::Scalar(_)) | None => {
            let entry = core.keyspace.write_checked(&key, Variant::Scalar)?;
            if let Entry::Scalar(b) = entry {
                let mut out = Vec::with_capacity(b.len() + val.len());
                out.extend_from_slice(b);
                out.extend_from_slice(&val);
                *b = Bytes::from(out);
                Ok(int_value(b.len() as i64))
            } else {
                unreachable!()
            }
        }
        Some(_) => Err(CmdError::wrong_type()),
    }
}

fn incr_by(core: &mut Core, key: Bytes, by: i64) -> ActionResult {
    let entry = core.keyspace.write_checked(&key, Variant::Scalar)?;
    let current = if let Entry::Scalar(b) = entry {
        if b.is_empty() {
            0
        } else {
            super::parse_int(b)?
        }
    } else {
        unreachable!()
    };
    let next = current
        .checked_add(by)
        .ok_or_else(|| CmdError::new("increment would overflow"))?;
    if let Entry::Scalar(b) = core.keyspace.write_checked(&key, Variant::Scalar)? {
        *b = Bytes::from(next.to_string());
    }
    Ok(int_value(next))
}

pub fn incr(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    incr_by(core, key, 1)
}

pub fn decr(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    incr_by(core, key, -1)
}

pub fn incrby(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 2)?;
    let key = arg(args, 0)?;
    let by = arg_int(args, 1)?;
    incr_by(core, key, by)
}

pub fn mget(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.is_empty() {
        return Err(CmdError::wrong_arity());
    }
    let mut out = Vec::with_capacity(args.len());
    for i in 0..args.len() {
        out.push(get(core, &args[i..i + 1])?);
    }
    Ok(Value::Array(out))
}

pub fn mset(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_nonzero_even(args.len())?;
    let mut n = 0;
    let mut i = 0;
    while i < args.len() {
        let key = arg(args, i)?;
        let val = arg(args, i + 1)?;
        core.keyspace.set(key, as_scalar_entry(val));
        n += 1;
        i += 2;
    }
    Ok(int_value(n))
}

pub fn mdelete(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.is_empty() {
        return Err(CmdError::wrong_arity());
    }
    let mut n = 0;
    for a in args {
        let key = a.as_bytes().ok_or_else(|| CmdError::new("expected a byte string argument"))?;
        if core.keyspace.remove(&key) {
            n += 1;
        }
    }
    Ok(int_value(n))
}

pub fn mpop(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.is_empty() {
        return Err(CmdError::wrong_arity());
    }
    let mut out = Vec::with_capacity(args.len());
    for a in args {
        let key = a.as_bytes().ok_or_else(|| CmdError::new("expected a byte string argument"))?;
        match core.keyspace.read_checked(&key, Variant::Scalar)? {
            Some(Entry::Scalar(b)) => {
                let v = Value::bytes(b.clone());
                core.keyspace.remove(&key);
                out.push(v);
            }
            Some(_) => unreachable!(),
            None => out.push(Value::Null),
        }
    }
    Ok(Value::Array(out))
}

/// §5 open question 4: returns the count of keys set.
pub fn msetex(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.len() < 3 || (args.len() - 1) % 2 != 0 {
        return Err(CmdError::wrong_arity());
    }
    let secs = arg_seconds(args, args.len() - 1)?;
    let pairs = &args[..args.len() - 1];
    let mut n = 0;
    let mut i = 0;
    while i < pairs.len() {
        let key = arg(pairs, i)?;
        let val = arg(pairs, i + 1)?;
        core.keyspace.set(key.clone(), as_scalar_entry(val));
        core.keyspace
            .expiry
            .set(key, chrono::Utc::now() + seconds_to_duration(secs));
        n += 1;
        i += 2;
    }
    Ok(int_value(n))
}

pub fn pop(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    match core.keyspace.read_checked(&key, Variant::Scalar)? {
        Some(Entry::Scalar(b)) => {
            let v = Value::bytes(b.clone());
            core.keyspace.remove(&key);
            Ok(v)
        }
        Some(_) => unreachable!(),
        None => Ok(Value::Null),
    }
}

pub fn len(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 0)?;
    Ok(int_value(core.keyspace.len() as i64))
}

pub fn flush(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 0)?;
    core.keyspace.clear();
    Ok(int_value(1))
}
