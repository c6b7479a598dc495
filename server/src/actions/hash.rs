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

//! # Hash queries
//!
//! Field-level operations against `Variant::Hash` entries.

use super::{arg, arg_int, bool_value, ensure_arity, int_value, ActionResult};
use crate::protocol::Value;
use crate::state::Core;
use crate::store::{Entry, Variant};
use crate::util::CmdError;
use bytes::Bytes;
use std::collections::HashMap;

fn read_map<'a>(core: &'a mut Core, key: &[u8]) -> Result<Option<&'a HashMap<Bytes, Bytes>>, CmdError> {
    match core.keyspace.read_checked(key, Variant::Hash)? {
        Some(Entry::Hash(m)) => Ok(Some(m)),
        Some(_) => unreachable!(),
        None => Ok(None),
    }
}

pub fn hset(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 3)?;
    let key = arg(args, 0)?;
    let field = arg(args, 1)?;
    let val = arg(args, 2)?;
    let entry = core.keyspace.write_checked(&key, Variant::Hash)?;
    if let Entry::Hash(m) = entry {
        let inserted = m.insert(field, val).is_none();
        Ok(bool_value(inserted))
    } else {
        unreachable!()
    }
}

pub fn hsetnx(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 3)?;
    let key = arg(args, 0)?;
    let field = arg(args, 1)?;
    let val = arg(args, 2)?;
    let entry = core.keyspace.write_checked(&key, Variant::Hash)?;
    if let Entry::Hash(m) = entry {
        if m.contains_key(&field) {
            Ok(bool_value(false))
        } else {
            m.insert(field, val);
            Ok(bool_value(true))
        }
    } else {
        unreachable!()
    }
}

pub fn hget(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 2)?;
    let key = arg(args, 0)?;
    let field = arg(args, 1)?;
    match read_map(core, &key)? {
        Some(m) => Ok(m.get(&field).map(|v| Value::bytes(v.clone())).unwrap_or(Value::Null)),
        None => Ok(Value::Null),
    }
}

pub fn hdel(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 2)?;
    let key = arg(args, 0)?;
    let field = arg(args, 1)?;
    match core.keyspace.read_checked(&key, Variant::Hash)? {
        Some(Entry::Hash(_)) => {
            let entry = core.keyspace.write_checked(&key, Variant::Hash)?;
            if let Entry::Hash(m) = entry {
                Ok(bool_value(m.remove(&field).is_some()))
            } else {
                unreachable!()
            }
        }
        Some(_) => unreachable!(),
        None => Ok(bool_value(false)),
    }
}

pub fn hexists(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 2)?;
    let key = arg(args, 0)?;
    let field = arg(args, 1)?;
    match read_map(core, &key)? {
        Some(m) => Ok(bool_value(m.contains_key(&field))),
        None => Ok(bool_value(false)),
    }
}

pub fn hgetall(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    match read_map(core, &key)? {
        Some(m) => Ok(Value::Map(
            m.iter()
                .map(|(k, v)| (Value::bytes(k.clone()), Value::bytes(v.clone())))
                .collect(),
        )),
        None => Ok(Value::Map(Vec::new())),
    }
}

pub fn hkeys(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    match read_map(core, &key)? {
        Some(m) => Ok(Value::Array(m.keys().map(|k| Value::bytes(k.clone())).collect())),
        None => Ok(Value::Array(Vec::new())),
    }
}

pub fn hvals(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    match read_map(core, &key)? {
        Some(m) => Ok(Value::Array(m.values().map(|v| Value::bytes(v.clone())).collect())),
        None => Ok(Value::Array(Vec::new())),
    }
}

pub fn hlen(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let key = arg(args, 0)?;
    match read_map(core, &key)? {
        Some(m) => Ok(int_value(m.len() as i64)),
        None => Ok(int_value(0)),
    }
}

pub fn hmget(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.len() < 2 {
        return Err(CmdError::wrong_arity());
    }
    let key = arg(args, 0)?;
    let fields = &args[1..];
    let out = match read_map(core, &key)? {
        Some(m) => fields
            .iter()
            .map(|f| {
                let f = f.as_bytes().ok_or_else(|| CmdError::new("expected a byte string field"))?;
                Ok(m.get(&f).map(|v| Value::bytes(v.clone())).unwrap_or(Value::Null))
            })
            .collect::<Result<Vec<_>, CmdError>>()?,
        None => vec![Value::Null; fields.len()],
    };
    Ok(Value::Array(out))
}

pub fn hmset(core: &mut Core, args: &[Value]) -> ActionResult {
    if args.len() < 3 || (args.len() - 1) % 2 != 0 {
        return Err(CmdError::wrong_arity());
    }
    let key = arg(args, 0)?;
    let pairs = &args[1..];
    let entry = core.keyspace.write_checked(&key, Variant::Hash)?;
    if let Entry::Hash(m) = entry {
        let mut i = 0;
        while i < pairs.len() {
            let field = pairs[i].as_bytes().ok_or_else(|| CmdError::new("expected a byte string field"))?;
            let val = pairs[i + 1].as_bytes().ok_or_else(|| CmdError::new("expected a byte string value"))?;
            m.insert(field, val);
            i += 2;
        }
        Ok(int_value(1))
    } else {
        unreachable!()
    }
}

pub fn hincrby(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 3)?;
    let key = arg(args, 0)?;
    let field = arg(args, 1)?;
    let by = arg_int(args, 2)?;
    let entry = core.keyspace.write_checked(&key, Variant::Hash)?;
    if let Entry::Hash(m) = entry {
        let current = match m.get(&field) {
            Some(b) if !b.is_empty() => super::parse_int(b)?,
            _ => 0,
        };
        let next = current
            .checked_add(by)
            .ok_or_else(|| CmdError::new("increment would overflow"))?;
        m.insert(field, Bytes::from(next.to_string()));
        Ok(int_value(next))
    } else {
        unreachable!()
    }
}
