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
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! # Startup configuration
//!
//! A single `clap`-derived CLI surface (§6), feeding one flat [`Config`] struct — the same
//! shape the old `cfgcli.rs` fed into a `Config`, minus the file-based layer this server has no
//! use for.

use clap::Parser;
use std::net::IpAddr;

#[derive(Parser, Debug)]
#[command(name = "tidekvd", version = libsky::VERSION, about = "tidekv: a miniature in-memory data-structure server")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,
    #[arg(long, default_value_t = 33737)]
    port: u16,
    #[arg(long, default_value_t = 1024)]
    max_clients: usize,
    /// Use the preemptive (thread-per-connection) transport instead of the cooperative one.
    #[arg(long)]
    threaded: bool,
    #[arg(long)]
    log_file: Option<String>,
    #[arg(long)]
    debug: bool,
    #[arg(long)]
    errors: bool,
    /// Name of an extension to record; repeatable. Loading is out of scope (§6 Non-goals).
    #[arg(long = "extension")]
    extensions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Cooperative,
    Preemptive,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub max_clients: usize,
    pub transport: Transport,
    pub log_file: Option<String>,
    pub debug: bool,
    pub errors: bool,
    pub extensions: Vec<String>,
}

impl Config {
    /// The `RUST_LOG`-style filter string this configuration maps onto (§3 ambient stack).
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.errors {
            "error"
        } else {
            "info"
        }
    }
}

pub fn from_args() -> Config {
    let cli = Cli::parse();
    Config {
        host: cli.host,
        port: cli.port,
        max_clients: cli.max_clients,
        transport: if cli.threaded {
            Transport::Preemptive
        } else {
            Transport::Cooperative
        },
        log_file: cli.log_file,
        debug: cli.debug,
        errors: cli.errors,
        extensions: cli.extensions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_contract() {
        let cli = Cli::parse_from(["tidekvd"]);
        assert_eq!(cli.host.to_string(), "127.0.0.1");
        assert_eq!(cli.port, 33737);
        assert_eq!(cli.max_clients, 1024);
        assert!(!cli.threaded);
    }

    #[test]
    fn extension_flag_is_repeatable() {
        let cli = Cli::parse_from(["tidekvd", "--extension", "a", "--extension", "b"]);
        assert_eq!(cli.extensions, vec!["a".to_owned(), "b".to_owned()]);
    }
}
