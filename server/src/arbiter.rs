/*
 * Created on Sat Jun 26 2021
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

//! # Binding signals to the accept loop
//!
//! Picks the transport named by [`Transport`] and races it against Ctrl+C; either one
//! requests shutdown and we unwind (§4.7, §6: exit 0 on clean shutdown, non-zero on startup
//! failure).

use crate::config::{Config, Transport};
use crate::dbnet;
use crate::state::Database;
use crate::util::StartupError;
use std::sync::Arc;

pub async fn run(config: Config, db: Arc<Database>) -> i32 {
    match config.transport {
        Transport::Cooperative => run_cooperative(config, db).await,
        Transport::Preemptive => run_preemptive(config, db).await,
    }
}

async fn run_cooperative(config: Config, db: Arc<Database>) -> i32 {
    tokio::select! {
        res = dbnet::listener::serve(db.clone(), config.host, config.port, config.max_clients) => {
            startup_exit_code(res)
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("received interrupt, shutting down");
            db.request_shutdown();
            0
        }
    }
}

async fn run_preemptive(config: Config, db: Arc<Database>) -> i32 {
    let handle = {
        let db = db.clone();
        tokio::task::spawn_blocking(move || {
            dbnet::blocking::serve(db, config.host, config.port, config.max_clients)
        })
    };
    tokio::select! {
        res = handle => {
            match res {
                Ok(inner) => startup_exit_code(inner),
                Err(_) => 0x100,
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("received interrupt, shutting down");
            db.request_shutdown();
            0
        }
    }
}

fn startup_exit_code(res: Result<(), StartupError>) -> i32 {
    match res {
        Ok(()) => 0,
        Err(e) => {
            log::error!("startup failure: {e}");
            0x100
        }
    }
}
