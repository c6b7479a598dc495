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

//! # Per-connection loop (§4.7)
//!
//! [`try_decode`] is shared by both transports: it is pure and synchronous, so it does not
//! care whether the bytes in `buf` arrived via a tokio socket read or a blocking one. Each
//! transport owns its own read/write plumbing around it.

use crate::dispatch::{self, Outcome};
use crate::protocol::{self, Decoded, ProtocolError, Value};
use crate::state::Database;
use bytes::BytesMut;

/// Pull one complete request out of `buf`, if one is buffered. Leaves the remainder of `buf`
/// untouched so the caller can append more bytes and retry.
pub fn try_decode(buf: &mut BytesMut) -> Result<Option<Value>, ProtocolError> {
    match protocol::decode(buf)? {
        Decoded::Complete(value, used) => {
            let _ = buf.split_to(used);
            Ok(Some(value))
        }
        Decoded::Incomplete => Ok(None),
    }
}

/// Run one request through dispatch and render the frame to write back, alongside what the
/// transport should do next.
pub fn respond(db: &Database, request: Value, out: &mut BytesMut) -> Outcome {
    let outcome = dispatch::execute(db, request);
    let frame = match &outcome {
        Outcome::Reply(v) | Outcome::Quit(v) | Outcome::Shutdown(v) => v,
    };
    protocol::encode(frame, out);
    outcome
}

pub mod asynch {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    const READ_CHUNK: usize = 4096;

    /// Drive one cooperative-transport connection to completion (§5: serialized between I/O
    /// suspension points, so every command here appears atomic to other clients).
    pub async fn handle(db: Arc<Database>, mut stream: TcpStream) {
        db.counters.connection_opened();
        let mut buf = BytesMut::with_capacity(libsky::BUF_CAP);
        let mut out = BytesMut::new();
        loop {
            let request = match read_one(&mut stream, &mut buf).await {
                Ok(Some(r)) => r,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("connection read error: {e}");
                    break;
                }
            };
            out.clear();
            let outcome = respond(&db, request, &mut out);
            if stream.write_all(&out).await.is_err() {
                break;
            }
            match outcome {
                Outcome::Reply(_) => {}
                Outcome::Quit(_) => break,
                Outcome::Shutdown(_) => {
                    db.request_shutdown();
                    break;
                }
            }
        }
        db.counters.connection_closed();
    }

    async fn read_one(stream: &mut TcpStream, buf: &mut BytesMut) -> std::io::Result<Option<Value>> {
        loop {
            match try_decode(buf) {
                Ok(Some(v)) => return Ok(Some(v)),
                Ok(None) => {}
                Err(e) => return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            }
            let mut chunk = [0u8; READ_CHUNK];
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Ok(None);
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }
}

pub mod blocking {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::sync::Arc;

    const READ_CHUNK: usize = 4096;

    /// Drive one preemptive-transport connection to completion. Runs on its own OS thread; the
    /// coarse lock inside `dispatch::execute` is what makes this observationally identical to
    /// the cooperative transport (§5).
    pub fn handle(db: Arc<Database>, mut stream: TcpStream) {
        db.counters.connection_opened();
        let mut buf = BytesMut::with_capacity(libsky::BUF_CAP);
        let mut out = BytesMut::new();
        loop {
            let request = match read_one(&mut stream, &mut buf) {
                Ok(Some(r)) => r,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("connection read error: {e}");
                    break;
                }
            };
            out.clear();
            let outcome = respond(&db, request, &mut out);
            if stream.write_all(&out).is_err() {
                break;
            }
            match outcome {
                Outcome::Reply(_) => {}
                Outcome::Quit(_) => break,
                Outcome::Shutdown(_) => {
                    db.request_shutdown();
                    break;
                }
            }
        }
        db.counters.connection_closed();
    }

    fn read_one(stream: &mut TcpStream, buf: &mut BytesMut) -> std::io::Result<Option<Value>> {
        loop {
            match try_decode(buf) {
                Ok(Some(v)) => return Ok(Some(v)),
                Ok(None) => {}
                Err(e) => return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            }
            let mut chunk = [0u8; READ_CHUNK];
            let n = stream.read(&mut chunk)?;
            if n == 0 {
                return Ok(None);
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_decode_leaves_an_incomplete_frame_buffered() {
        let mut buf = BytesMut::from(&b"$5\r\nhel"[..]);
        assert_eq!(try_decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"$5\r\nhel");
    }

    #[test]
    fn try_decode_consumes_exactly_one_frame() {
        let mut buf = BytesMut::from(&b"+OK\r\n+NEXT\r\n"[..]);
        let v = try_decode(&mut buf).unwrap().unwrap();
        assert_eq!(v, Value::Text("OK".to_owned()));
        assert_eq!(&buf[..], b"+NEXT\r\n");
    }
}
