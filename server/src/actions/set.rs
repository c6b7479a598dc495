/*
 * This file is a part of Skytable
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

//! # Set queries
//!
//! §5 open question 3: every algebra command enforces the `Variant::Set` check on all
//! participating keys — a missing key contributes the empty set, but a wrong-typed key is
//! always a type error, never treated as an expiry question.

use super::{arg, bool_value, ensure_arity, int_value, ActionResult};
use crate::protocol::Value;
use crate::state::Core;
use crate::store::{Entry, Variant};
use crate::util::CmdError;
use bytes::Bytes;
use std::collections::HashSet;

fn read_set(core: &mut Core, key: &[u8]) -> Result<HashSet<Bytes>, CmdError> {
    match core.keyspace.read_checked(key, Variant::Set)? {
        Some(Entry::Set(s)) => Ok(s.clone()),
        Some(_) => unreachable!(),
        None => Ok(HashSet::new()),
    }
}

pub fn sadd(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.len() < 2 {
        return Err(CmdError::wrong_arity());
    }
    let key = arg(args, 0)?;
    let entry = core.keyspace.write_checked(&key, Variant::Set)?;
    if let Entry::Set(s) = entry {
        let mut n = 0;
        for v in &args[1..] {
            let b = v.as_bytes().ok_or_else(|| CmdError::new("expected a byte string member"))?;
            if s.insert(b) {
                n += 1;
            }
        }
        Ok(int_value(n))
    } else {
        unreachable!()
    }
}

pub fn srem(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.len() < 2 {
        return Err(CmdError::wrong_arity());
    }
    let key = arg(args, 0)?;
    match core.keyspace.read_checked(&key, Variant::Set)? {
        Some(Entry::Set(_)) => {
            if let Entry::Set(s) = core.keyspace.write_checked(&key, Variant::Set)? {
                let mut n = 0;
                for v in &args[1..] {
                    let b = v.as_bytes().ok_or_else(|| CmdError::new("expected a byte string member"))?;
                    if s.remove(&b) {
                        n += 1;
                    }
                }
                Ok(int_value(n))
            } else {
                unreachable!()
            }
        }
        Some(_) => unreachable!(),
        None => Ok(int_value(0)),
    }
}

pub fn scard(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    Ok(int_value(read_set(core, &key)?.len() as i64))
}

pub fn sismember(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 2)?;
    let key = arg(args, 0)?;
    let member = arg(args, 1)?;
    Ok(bool_value(read_set(core, &key)?.contains(&member)))
}

pub fn smembers(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    Ok(Value::Set(read_set(core, &key)?.into_iter().map(Value::bytes).collect()))
}

pub fn spop(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity_range(args.len())?;
    let key = arg(args, 0)?;
    let n = if args.len() == 2 {
        super::arg_int(args, 1)?.max(0) as usize
    } else {
        1
    };
    match core.keyspace.read_checked(&key, Variant::Set)? {
        Some(Entry::Set(_)) => {
            if let Entry::Set(s) = core.keyspace.write_checked(&key, Variant::Set)? {
                let picked: Vec<Bytes> = s.iter().take(n).cloned().collect();
                for p in &picked {
                    s.remove(p);
                }
                if args.len() == 1 {
                    Ok(picked.into_iter().next().map(Value::bytes).unwrap_or(Value::Null))
                } else {
                    Ok(Value::Set(picked.into_iter().map(Value::bytes).collect()))
                }
            } else {
                unreachable!()
            }
        }
        Some(_) => unreachable!(),
        None => {
            if args.len() == 1 {
                Ok(Value::Null)
            } else {
                Ok(Value::Set(Vec::new()))
            }
        }
    }
}

fn ensure_arity_range(len: usize) -> Result<(), CmdError> {
    super::ensure_arity_range(len, 1, 2)
}

fn algebra(
    core: &mut Core,
    keys: &[Value],
    op: impl Fn(&HashSet<Bytes>, &HashSet<Bytes>) -> HashSet<Bytes>,
) -> Result<HashSet<Bytes>, CmdError> {
    let mut keys = keys.iter();
    let first_key = keys.next().ok_or_else(CmdError::wrong_arity)?.as_bytes().ok_or_else(|| CmdError::new("expected a byte string key"))?;
    let mut acc = read_set(core, &first_key)?;
    for k in keys {
        let k = k.as_bytes().ok_or_else(|| CmdError::new("expected a byte string key"))?;
        let other = read_set(core, &k)?;
        acc = op(&acc, &other);
    }
    Ok(acc)
}

pub fn sdiff(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.is_empty() {
        return Err(CmdError::wrong_arity());
    }
    let result = algebra(core, args, |a, b| a.difference(b).cloned().collect())?;
    Ok(Value::Set(result.into_iter().map(Value::bytes).collect()))
}

pub fn sinter(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.is_empty() {
        return Err(CmdError::wrong_arity());
    }
    let result = algebra(core, args, |a, b| a.intersection(b).cloned().collect())?;
    Ok(Value::Set(result.into_iter().map(Value::bytes).collect()))
}

pub fn sunion(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.is_empty() {
        return Err(CmdError::wrong_arity());
    }
    let result = algebra(core, args, |a, b| a.union(b).cloned().collect())?;
    Ok(Value::Set(result.into_iter().map(Value::bytes).collect()))
}

fn store_result(core: &mut Core, dst: Bytes, result: HashSet<Bytes>) -> ActionResult {
    let n = result.len();
    core.keyspace.set(dst, Entry::Set(result));
    Ok(int_value(n as i64))
}

pub fn sdiffstore(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.len() < 2 {
        return Err(CmdError::wrong_arity());
    }
    let dst = arg(args, 0)?;
    let result = algebra(core, &args[1..], |a, b| a.difference(b).cloned().collect())?;
    store_result(core, dst, result)
}

pub fn sinterstore(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.len() < 2 {
        return Err(CmdError::wrong_arity());
    }
    let dst = arg(args, 0)?;
    let result = algebra(core, &args[1..], |a, b| a.intersection(b).cloned().collect())?;
    store_result(core, dst, result)
}

pub fn sunionstore(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.len() < 2 {
        return Err(CmdError::wrong_arity());
    }
    let dst = arg(args, 0)?;
    let result = algebra(core, &args[1..], |a, b| a.union(b).cloned().collect())?;
    store_result(core, dst, result)
}
