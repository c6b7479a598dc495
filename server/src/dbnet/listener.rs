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

//! # The cooperative accept loop
//!
//! One OS thread (the tokio runtime's own pool, really — see `main.rs`) hosting a lightweight
//! task per connection, bounded by a [`Semaphore`] at `max_clients` (§5).

use crate::dbnet::connection::asynch;
use crate::state::Database;
use crate::util::StartupError;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

pub async fn serve(db: Arc<Database>, host: IpAddr, port: u16, max_clients: usize) -> Result<(), StartupError> {
    let listener = TcpListener::bind((host, port)).await?;
    log::info!("listening on {host}:{port} (cooperative transport)");
    let climit = Arc::new(Semaphore::new(max_clients));
    let mut shutdown = db.subscribe_shutdown();

    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            accepted = listener.accept() => accepted,
        };
        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                log::error!("accept failed: {e}");
                continue;
            }
        };
        let permit = match climit.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                log::warn!("rejecting {peer}: at max_clients");
                continue;
            }
        };
        log::debug!("accepted connection from {peer}");
        let db = db.clone();
        tokio::spawn(async move {
            asynch::handle(db, stream).await;
            drop(permit);
        });
    }
    log::info!("cooperative accept loop shutting down");
    Ok(())
}
