/*
 * This file is a part of Skytable
 *
 * Copyright (c) 2021, Sayan Nandan <ohsayan@outlook.com>
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

//! # Extension interaction contract (§6)
//!
//! `--extension` is accepted and recorded on [`Database::extensions`](crate::state::Database);
//! loading a shared object and calling its `initialize(server)` hook is out of scope. What is
//! in scope is the registration point such a hook would call: [`Server::add_command`]. Dispatch
//! consults the registry only after the builtin table misses, so an extension can add a new
//! command but never shadow one this server already understands.

use crate::actions::ActionResult;
use crate::protocol::Value;
use crate::state::{Core, Database};
use std::sync::Arc;

pub type CommandHandler = Arc<dyn Fn(&mut Core, &[Value]) -> ActionResult + Send + Sync>;

/// A handle an extension's `initialize` hook would receive, to register its commands.
pub struct Server {
    db: Arc<Database>,
}

impl Server {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register `handler` under `name`, upper-cased the same way builtin dispatch normalizes
    /// incoming command names.
    pub fn add_command(&self, name: &str, handler: CommandHandler) {
        self.db.register_command(name.as_bytes().to_vec(), handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Entry, Variant};
    use crate::util::CmdError;
    use bytes::Bytes;

    #[test]
    fn a_registered_command_is_reachable_once_added() {
        let db = Arc::new(Database::new(Vec::new()));
        let server = Server::new(db.clone());
        server.add_command(
            "PING",
            Arc::new(|_core: &mut Core, _args: &[Value]| Ok(Value::text("PONG"))),
        );
        let handler = db.lookup_command(b"PING").expect("handler registered");
        let mut core = Core::default();
        assert_eq!(handler(&mut core, &[]).unwrap(), Value::text("PONG"));
    }

    #[test]
    fn an_extension_command_can_still_touch_the_keyspace() {
        let db = Arc::new(Database::new(Vec::new()));
        let server = Server::new(db.clone());
        server.add_command(
            "ECHOLEN",
            Arc::new(|core: &mut Core, args: &[Value]| {
                let key = args.first().and_then(Value::as_bytes).ok_or_else(CmdError::wrong_arity)?;
                match core.keyspace.read_checked(&key, Variant::Scalar)? {
                    Some(Entry::Scalar(b)) => Ok(Value::Int(b.len() as i64)),
                    _ => Ok(Value::Int(0)),
                }
            }),
        );
        let handler = db.lookup_command(b"ECHOLEN").unwrap();
        db.with_core(|core| {
            core.keyspace.set(Bytes::from_static(b"k"), Entry::Scalar(Bytes::from_static(b"hello")));
            assert_eq!(
                handler(core, &[Value::bytes(Bytes::from_static(b"k"))]).unwrap(),
                Value::Int(5)
            );
        });
    }
}
