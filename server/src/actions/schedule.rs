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

//! # Schedule queries (§4.4)
//!
//! The delayed-delivery queue is independent of key expiration: `ADD`/`READ` never touch the
//! keyspace.

use super::{arg, ensure_arity, int_value, ActionResult};
use crate::protocol::{self, Value};
use crate::state::Core;
use crate::util::CmdError;

fn parse_ts(b: &[u8]) -> Result<chrono::DateTime<chrono::Utc>, CmdError> {
    let s = std::str::from_utf8(b).map_err(|_| bad_timestamp())?;
    protocol::parse_timestamp(s).ok_or_else(bad_timestamp)
}

fn bad_timestamp() -> CmdError {
    CmdError::new("timestamp must be formatted Y-m-d H:M:S")
}

pub fn add(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 2)?;
    let ts = parse_ts(&arg(args, 0)?)?;
    core.schedule.add(ts, args[1].clone());
    Ok(int_value(1))
}

pub fn read(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let ts = parse_ts(&arg(args, 0)?)?;
    Ok(Value::Array(core.schedule.read(ts)))
}

pub fn flush_schedule(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 0)?;
    Ok(int_value(core.schedule.flush() as i64))
}

pub fn length_schedule(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 0)?;
    Ok(int_value(core.schedule.len() as i64))
}
