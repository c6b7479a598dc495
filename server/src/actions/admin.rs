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

//! # Lifecycle & admin queries
//!
//! `EXPIRE`/`FLUSHALL` only ever touch the locked [`Core`]; `INFO` and the snapshot trio read
//! or replace the whole [`Database`], so they take it directly and lock it themselves. Disk
//! I/O for `SAVE`/`RESTORE`/`MERGE` happens while the coarse lock is held (§5 names it a
//! suspension point, not a concurrent one) — fine at this server's scale, and simpler than
//! threading a drop-lock-around-I/O protocol through every transport.

use super::{arg, arg_seconds, ensure_arity, int_value, seconds_to_duration, ActionResult};
use crate::protocol::Value;
use crate::state::{Core, Database};
use crate::store::snapshot::{self, SnapshotData};
use crate::util::CmdError;
use std::path::Path;
use std::sync::atomic::Ordering;

pub fn expire(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 2)?;
    let key = arg(args, 0)?;
    let secs = arg_seconds(args, 1)?;
    core.keyspace
        .expiry
        .set(key, chrono::Utc::now() + seconds_to_duration(secs));
    Ok(int_value(1))
}

pub fn flushall(core: &mut Core, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 0)?;
    core.keyspace.clear();
    core.schedule.flush();
    Ok(int_value(1))
}

pub fn info(db: &Database, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 0)?;
    let keys = db.with_core(|core| core.keyspace.len());
    let pairs = vec![
        (Value::text("active_connections"), Value::Int(db.counters.active_connections.load(Ordering::Relaxed) as i64)),
        (Value::text("total_connections"), Value::Int(db.counters.total_connections.load(Ordering::Relaxed) as i64)),
        (Value::text("commands_processed"), Value::Int(db.counters.commands_processed.load(Ordering::Relaxed) as i64)),
        (Value::text("command_errors"), Value::Int(db.counters.command_errors.load(Ordering::Relaxed) as i64)),
        (Value::text("keys"), Value::Int(keys as i64)),
        (Value::text("server_time"), Value::timestamp(chrono::Utc::now())),
        (Value::text("uptime_secs"), Value::Int((chrono::Utc::now() - db.start_time).num_seconds())),
    ];
    Ok(Value::Map(pairs))
}

pub fn save(db: &Database, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let path = arg(args, 0)?;
    let path_str = std::str::from_utf8(&path).map_err(|_| CmdError::new("path is not valid UTF-8"))?;
    db.with_core(|core| {
        let data = SnapshotData {
            kv: core.keyspace.snapshot_entries(),
            schedule: core.schedule.snapshot(),
        };
        snapshot::save(Path::new(path_str), &data)
            .map_err(|e| CmdError::new(format!("save failed: {e}")))
    })?;
    Ok(int_value(1))
}

pub fn restore(db: &Database, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let path = arg(args, 0)?;
    let path_str = std::str::from_utf8(&path).map_err(|_| CmdError::new("path is not valid UTF-8"))?;
    let data =
        snapshot::load(Path::new(path_str)).map_err(|e| CmdError::new(format!("restore failed: {e}")))?;
    db.with_core(|core| {
        core.keyspace.restore_entries(data.kv);
        core.schedule.restore(data.schedule);
    });
    Ok(int_value(1))
}

/// `MERGE`: keyspace unions with on-disk entries winning on collision; schedule is replaced
/// wholesale (§4.6).
pub fn merge(db: &Database, args: &[Value]) -> ActionResult {
    ensure_arity(args.len(), 1)?;
    let path = arg(args, 0)?;
    let path_str = std::str::from_utf8(&path).map_err(|_| CmdError::new("path is not valid UTF-8"))?;
    let data =
        snapshot::load(Path::new(path_str)).map_err(|e| CmdError::new(format!("merge failed: {e}")))?;
    db.with_core(|core| {
        core.keyspace.merge_entries(data.kv);
        core.schedule.restore(data.schedule);
    });
    Ok(int_value(1))
}
