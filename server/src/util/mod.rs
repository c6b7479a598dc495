/*
 * Created on Fri Jun 25 2021
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

//! Error taxonomy (§7): a user-visible [`CmdError`] that becomes a wire `Error` frame, and a
//! [`StartupError`] for everything that can go wrong before the accept loop is even running.

pub mod compiler;

use crate::store::WrongTypeError;
use std::fmt;

/// A command-level error, always user-visible: the connection loop turns this into a `-`
/// frame and increments `command_errors`, then keeps reading from the same connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdError(pub String);

impl CmdError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    pub fn wrong_type() -> Self {
        Self::new("operation against wrong key type")
    }

    pub fn unknown_command(name: &str) -> Self {
        Self::new(format!("unrecognized command {name}"))
    }

    pub fn wrong_arity() -> Self {
        Self::new("wrong number of arguments")
    }
}

impl fmt::Display for CmdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CmdError {}

impl From<WrongTypeError> for CmdError {
    fn from(_: WrongTypeError) -> Self {
        CmdError::wrong_type()
    }
}

/// Raised by commands/CLI parsing before the server has a running accept loop: bind failures,
/// bad configuration, a snapshot load that fails on startup restore.
#[derive(Debug)]
pub enum StartupError {
    Io(std::io::Error),
    Config(String),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Io(e) => write!(f, "I/O error: {e}"),
            StartupError::Config(s) => write!(f, "configuration error: {s}"),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<std::io::Error> for StartupError {
    fn from(e: std::io::Error) -> Self {
        StartupError::Io(e)
    }
}
