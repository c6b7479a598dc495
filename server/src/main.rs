/*
 * Created on Thu Jul 02 2020
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
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! # tidekv
//!
//! `tidekvd` is a miniature in-memory data-structure server: a framed wire protocol, a typed
//! keyspace, an expiration index and a delayed-delivery schedule, served over two
//! interchangeable transports. See the module docs for the component that interests you.

use libsky::util::terminal;
use libsky::{URL, VERSION};
use std::process;
use std::sync::Arc;

mod actions;
mod arbiter;
mod config;
mod dbnet;
mod dispatch;
mod extension;
mod protocol;
mod state;
mod store;
mod util;

#[cfg(test)]
mod tests;

use state::Database;

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

static TEXT: &str = "\n████████ ██ ██████  ███████ ██   ██ ██    ██ \n   ██    ██ ██   ██ ██      ██  ██   ██  ██  \n   ██    ██ ██   ██ █████   █████     ████   \n   ██    ██ ██   ██ ██      ██  ██     ██    \n   ██    ██ ██████  ███████ ██   ██    ██    \n";

fn main() {
    let config = config::from_args();
    init_logging(&config);

    println!("tidekv v{VERSION} | {URL}\n{TEXT}");
    log::info!(
        "starting on {}:{} ({:?} transport, max_clients={})",
        config.host,
        config.port,
        config.transport,
        config.max_clients
    );
    if !config.extensions.is_empty() {
        log::info!("recorded extensions: {:?}", config.extensions);
    }

    let db = Arc::new(Database::new(config.extensions.clone()));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("tidekv")
        .enable_all()
        .build()
        .expect("failed to start the async runtime");
    let exit_code = runtime.block_on(arbiter::run(config, db));
    drop(runtime);

    log::info!("stopped accepting incoming connections");
    let _ = terminal::write_info("Goodbye :)\n");
    process::exit(exit_code);
}

fn init_logging(config: &config::Config) {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(config.log_filter());
    if let Some(path) = &config.log_file {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("warning: could not open log file {path}: {e}");
            }
        }
    }
    builder.init();
}
