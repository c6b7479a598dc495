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

//! # Actions
//!
//! Actions are the per-command handlers dispatch looks up by name (§4.5). Each takes the
//! locked [`Core`] plus the request's argument vector (command name already stripped) and
//! returns a wire-ready [`Value`] or a [`CmdError`].

pub mod admin;
pub mod hash;
pub mod kv;
pub mod list;
pub mod schedule;
pub mod set;

use crate::protocol::Value;
use crate::util::CmdError;
use bytes::Bytes;
use chrono::Duration;

pub type ActionResult = Result<Value, CmdError>;

pub fn ensure_arity(len: usize, expected: usize) -> Result<(), CmdError> {
    if len == expected {
        Ok(())
    } else {
        Err(CmdError::wrong_arity())
    }
}

pub fn ensure_arity_range(len: usize, min: usize, max: usize) -> Result<(), CmdError> {
    if len >= min && len <= max {
        Ok(())
    } else {
        Err(CmdError::wrong_arity())
    }
}

pub fn ensure_nonzero_even(len: usize) -> Result<(), CmdError> {
    if len != 0 && len % 2 == 0 {
        Ok(())
    } else {
        Err(CmdError::wrong_arity())
    }
}

/// Pull the byte string out of `args[i]`, failing with an arity error if it's absent and a
/// type error if present but not a scalar/bulk-shaped value.
pub fn arg(args: &[Value], i: usize) -> Result<Bytes, CmdError> {
    args.get(i)
        .ok_or_else(CmdError::wrong_arity)?
        .as_bytes()
        .ok_or_else(|| CmdError::new("expected a byte string argument"))
}

/// Parse an argument as a base-10 `i64`, the way `INCRBY`/`EXPIRE`/list indices do.
pub fn arg_int(args: &[Value], i: usize) -> Result<i64, CmdError> {
    let b = arg(args, i)?;
    std::str::from_utf8(&b)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| CmdError::new("expected an integer argument"))
}

/// Parse an argument as a base-10 `f64` of seconds, the way `EXPIRE`/`SETEX`/`MSETEX` do (§3:
/// expiry is wall time with fractional seconds).
pub fn arg_seconds(args: &[Value], i: usize) -> Result<f64, CmdError> {
    let b = arg(args, i)?;
    std::str::from_utf8(&b)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| CmdError::new("expected a numeric argument"))
}

/// Turn a seconds count with a fractional part into a `chrono::Duration`, rounded to the
/// millisecond (the expiry index's own resolution).
pub fn seconds_to_duration(secs: f64) -> Duration {
    Duration::milliseconds((secs * 1000.0).round() as i64)
}

pub fn parse_int(b: &[u8]) -> Result<i64, CmdError> {
    std::str::from_utf8(b)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| CmdError::new("value is not an integer or out of range"))
}

pub fn int_value(n: i64) -> Value {
    Value::Int(n)
}

pub fn bool_value(b: bool) -> Value {
    Value::Int(if b { 1 } else { 0 })
}
