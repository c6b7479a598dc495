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

//! # List queries
//!
//! §5 open question 2: `LRANGE`/`LTRIM` use Python-style slice semantics — negative indices
//! count from the tail, an out-of-range bound clamps instead of erroring.

use super::{arg, arg_int, bool_value, ensure_arity, ensure_arity_range, int_value, ActionResult};
use crate::protocol::Value;
use crate::state::Core;
use crate::store::{Entry, Variant};
use crate::util::CmdError;
use std::collections::VecDeque;

/// Resolve a possibly-negative, possibly-out-of-range slice index into `0..=len`, the way a
/// Python slice bound does.
fn clamp_index(idx: i64, len: usize) -> usize {
    let len = len as i64;
    let resolved = if idx < 0 { len + idx } else { idx };
    resolved.clamp(0, len) as usize
}

/// Resolve an inclusive, possibly-negative slice end into an exclusive bound: the negative
/// index is resolved against `len` first, then the result is widened by one to make it
/// exclusive, the way `end.clamp`-before-`+1` does not.
fn clamp_end(end: i64, len: usize) -> usize {
    let len = len as i64;
    let resolved = if end < 0 { len + end } else { end };
    (resolved + 1).clamp(0, len) as usize
}

fn read_list<'a>(core: &'a mut Core, key: &[u8]) -> Result<Option<&'a VecDeque<bytes::Bytes>>, CmdError> {
    match core.keyspace.read_checked(key, Variant::List)? {
        Some(Entry::List(l)) => Ok(Some(l)),
        Some(_) => unreachable!(),
        None => Ok(None),
    }
}

pub fn lpush(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.len() < 2 {
        return Err(CmdError::wrong_arity());
    }
    let key = arg(args, 0)?;
    let entry = core.keyspace.write_checked(&key, Variant::List)?;
    if let Entry::List(l) = entry {
        let mut n = 0;
        for v in &args[1..] {
            let b = v.as_bytes().ok_or_else(|| CmdError::new("expected a byte string element"))?;
            l.push_front(b);
            n += 1;
        }
        Ok(int_value(n))
    } else {
        unreachable!()
    }
}

pub fn rpush(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.len() < 2 {
        return Err(CmdError::wrong_arity());
    }
    let key = arg(args, 0)?;
    let entry = core.keyspace.write_checked(&key, Variant::List)?;
    if let Entry::List(l) = entry {
        let mut n = 0;
        for v in &args[1..] {
            let b = v.as_bytes().ok_or_else(|| CmdError::new("expected a byte string element"))?;
            l.push_back(b);
            n += 1;
        }
        Ok(int_value(n))
    } else {
        unreachable!()
    }
}

pub fn lpop(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    match core.keyspace.read_checked(&key, Variant::List)? {
        Some(Entry::List(_)) => {
            if let Entry::List(l) = core.keyspace.write_checked(&key, Variant::List)? {
                Ok(l.pop_front().map(Value::bytes).unwrap_or(Value::Null))
            } else {
                unreachable!()
            }
        }
        Some(_) => unreachable!(),
        None => Ok(Value::Null),
    }
}

pub fn rpop(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    match core.keyspace.read_checked(&key, Variant::List)? {
        Some(Entry::List(_)) => {
            if let Entry::List(l) = core.keyspace.write_checked(&key, Variant::List)? {
                Ok(l.pop_back().map(Value::bytes).unwrap_or(Value::Null))
            } else {
                unreachable!()
            }
        }
        Some(_) => unreachable!(),
        None => Ok(Value::Null),
    }
}

pub fn lrem(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 2)?;
    let key = arg(args, 0)?;
    let val = arg(args, 1)?;
    match core.keyspace.read_checked(&key, Variant::List)? {
        Some(Entry::List(_)) => {
            if let Entry::List(l) = core.keyspace.write_checked(&key, Variant::List)? {
                if let Some(pos) = l.iter().position(|v| v == &val) {
                    l.remove(pos);
                    Ok(bool_value(true))
                } else {
                    Ok(bool_value(false))
                }
            } else {
                unreachable!()
            }
        }
        Some(_) => unreachable!(),
        None => Ok(bool_value(false)),
    }
}

pub fn llen(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    Ok(int_value(read_list(core, &key)?.map(|l| l.len()).unwrap_or(0) as i64))
}

pub fn lindex(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 2)?;
    let key = arg(args, 0)?;
    let idx = arg_int(args, 1)?;
    match read_list(core, &key)? {
        Some(l) => {
            let resolved = if idx < 0 { l.len() as i64 + idx } else { idx };
            if resolved < 0 || resolved as usize >= l.len() {
                Ok(Value::Null)
            } else {
                Ok(Value::bytes(l[resolved as usize].clone()))
            }
        }
        None => Ok(Value::Null),
    }
}

pub fn lrange(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity_range(args.len(), 2, 3)?;
    let key = arg(args, 0)?;
    let begin = arg_int(args, 1)?;
    match read_list(core, &key)? {
        Some(l) => {
            let len = l.len();
            // An omitted end means "to end" (§5 open question 2), which is exactly what
            // resolving -1 against `len` already produces.
            let end = if args.len() == 3 { arg_int(args, 2)? } else { -1 };
            let b = clamp_index(begin, len);
            let e = clamp_end(end, len).max(b);
            Ok(Value::Array(l.iter().skip(b).take(e - b).map(|v| Value::bytes(v.clone())).collect()))
        }
        None => Ok(Value::Array(Vec::new())),
    }
}

pub fn lset(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 3)?;
    let key = arg(args, 0)?;
    let idx = arg_int(args, 1)?;
    let val = arg(args, 2)?;
    match core.keyspace.read_checked(&key, Variant::List)? {
        Some(Entry::List(l)) => {
            let resolved = if idx < 0 { l.len() as i64 + idx } else { idx };
            let in_range = resolved >= 0 && (resolved as usize) < l.len();
            if !in_range {
                return Ok(bool_value(false));
            }
            if let Entry::List(l) = core.keyspace.write_checked(&key, Variant::List)? {
                l[resolved as usize] = val;
            }
            Ok(bool_value(true))
        }
        Some(_) => unreachable!(),
        None => Ok(bool_value(false)),
    }
}

pub fn ltrim(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity_range(args.len(), 2, 3)?;
    let key = arg(args, 0)?;
    let begin = arg_int(args, 1)?;
    let end = if args.len() == 3 { arg_int(args, 2)? } else { -1 };
    match core.keyspace.read_checked(&key, Variant::List)? {
        Some(Entry::List(_)) => {
            if let Entry::List(l) = core.keyspace.write_checked(&key, Variant::List)? {
                let len = l.len();
                let b = clamp_index(begin, len);
                let e = clamp_end(end, len).max(b);
                let kept: VecDeque<_> = l.iter().skip(b).take(e - b).cloned().collect();
                *l = kept;
                Ok(int_value(l.len() as i64))
            } else {
                unreachable!()
            }
        }
        Some(_) => unreachable!(),
        None => Ok(int_value(0)),
    }
}

pub fn rpoplpush(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 2)?;
    let src = arg(args, 0)?;
    let dst = arg(args, 1)?;
    let moved = match core.keyspace.read_checked(&src, Variant::List)? {
        Some(Entry::List(_)) => {
            if let Entry::List(l) = core.keyspace.write_checked(&src, Variant::List)? {
                l.pop_back()
            } else {
                unreachable!()
            }
        }
        Some(_) => unreachable!(),
        None => None,
    };
    match moved {
        Some(v) => {
            if let Entry::List(l) = core.keyspace.write_checked(&dst, Variant::List)? {
                l.push_front(v);
            }
            Ok(bool_value(true))
        }
        None => Ok(bool_value(false)),
    }
}

pub fn lflush(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    let prior = read_list(core, &key)?.map(|l| l.len()).unwrap_or(0);
    core.keyspace.remove(&key);
    Ok(int_value(prior as i64))
}
