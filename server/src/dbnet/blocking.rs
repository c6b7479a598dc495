/*
 * Created on Sun Aug 21 2022
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2022, Sayan Nandan <ohsayan@outlook.com>
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

//! # The preemptive accept loop
//!
//! One OS thread per active client, bounded by the same `max_clients` cap as the cooperative
//! transport (§5), selected with `--threaded`. No tokio runtime involved: the listener is put
//! in non-blocking mode and polled so the accept loop can also notice a shutdown request from
//! one of its connection threads without a self-connect wakeup trick.

use crate::dbnet::connection::blocking as conn;
use crate::state::Database;
use crate::util::StartupError;
use std::net::{IpAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

pub fn serve(db: Arc<Database>, host: IpAddr, port: u16, max_clients: usize) -> Result<(), StartupError> {
    let listener = TcpListener::bind((host, port))?;
    listener.set_nonblocking(true)?;
    log::info!("listening on {host}:{port} (preemptive transport)");
    let active = Arc::new(AtomicUsize::new(0));

    loop {
        if db.shutdown_requested() {
            break;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                if active.load(Ordering::Relaxed) >= max_clients {
                    log::warn!("rejecting {peer}: at max_clients");
                    drop(stream);
                    continue;
                }
                log::debug!("accepted connection from {peer}");
                active.fetch_add(1, Ordering::Relaxed);
                let db = db.clone();
                let active = active.clone();
                thread::spawn(move || {
                    conn::handle(db, stream);
                    active.fetch_sub(1, Ordering::Relaxed);
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                log::error!("accept failed: {e}");
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
    log::info!("preemptive accept loop shutting down");
    Ok(())
}
