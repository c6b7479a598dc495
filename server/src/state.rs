/*
 * Created on Mon May 10 2021
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
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

//! # The coarse owner
//!
//! [`Database`] is the single logical executor described in §5: one `parking_lot::Mutex`
//! guards the keyspace and the schedule together, held only for the duration of a single
//! command, never across an `.await`. This gives the preemptive (thread-per-connection)
//! transport the linearizability the cooperative (task-per-connection) transport gets for
//! free between I/O suspension points.

use crate::extension::CommandHandler;
use crate::store::schedule::Schedule;
use crate::store::Keyspace;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::watch;

/// Everything a command touches. Locked as one unit; see the module doc.
#[derive(Debug, Default)]
pub struct Core {
    pub keyspace: Keyspace,
    pub schedule: Schedule,
}

/// Observability counters (§3). These are monotonically updated by the owner but read
/// concurrently by `INFO`; plain atomics are simpler than routing them through the coarse
/// lock and carry no correctness burden since no command branches on another command's count.
#[derive(Debug, Default)]
pub struct Counters {
    pub active_connections: AtomicUsize,
    pub total_connections: AtomicU64,
    pub commands_processed: AtomicU64,
    pub command_errors: AtomicU64,
}

impl Counters {
    pub fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }
    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }
    pub fn command_ok(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }
    pub fn command_err(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
        self.command_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// The process-global database handle. Callers share it behind an `Arc<Database>` across every
/// connection and both transports.
pub struct Database {
    core: Mutex<Core>,
    pub counters: Counters,
    pub start_time: chrono::DateTime<Utc>,
    /// Names of `--extension` flags accepted at startup (§6: interaction-contract only).
    pub extensions: Vec<String>,
    shutdown: watch::Sender<bool>,
    /// Commands registered through [`crate::extension::Server::add_command`]. Consulted only
    /// after the builtin table misses (§6: the loader itself is out of scope, just this
    /// registration point).
    commands: RwLock<HashMap<Vec<u8>, CommandHandler>>,
}

impl Database {
    pub fn new(extensions: Vec<String>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            core: Mutex::new(Core::default()),
            counters: Counters::default(),
            start_time: Utc::now(),
            extensions,
            shutdown,
            commands: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn register_command(&self, name: Vec<u8>, handler: CommandHandler) {
        self.commands.write().insert(name.to_ascii_uppercase(), handler);
    }

    pub(crate) fn lookup_command(&self, name: &[u8]) -> Option<CommandHandler> {
        self.commands.read().get(name).cloned()
    }

    /// Run `f` with exclusive access to the core. This is the only way command handlers ever
    /// touch the keyspace or schedule; never hold the returned guard across an `.await`.
    pub fn with_core<R>(&self, f: impl FnOnce(&mut Core) -> R) -> R {
        let mut guard = self.core.lock();
        f(&mut guard)
    }

    /// Called by a connection handler on `SHUTDOWN` (§4.7): flips the shared flag both accept
    /// loops watch.
    pub fn request_shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    pub fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}
