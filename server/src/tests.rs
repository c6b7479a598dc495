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

//! # End-to-end connection tests
//!
//! Spins up a real `TcpListener` on an ephemeral port against the cooperative transport and
//! drives it with a minimal in-test client — the literal scenarios from §8.

use crate::dbnet::connection::asynch;
use crate::protocol::{self, Decoded, Value};
use crate::state::Database;
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn spawn_server() -> (std::net::SocketAddr, Arc<Database>) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let db = Arc::new(Database::new(Vec::new()));
    let handle_db = db.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => break,
            };
            let db = handle_db.clone();
            tokio::spawn(asynch::handle(db, stream));
        }
    });
    (addr, db)
}

struct TestClient {
    stream: TcpStream,
    buf: BytesMut,
}

impl TestClient {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
            buf: BytesMut::new(),
        }
    }

    async fn call(&mut self, words: &[&str]) -> Value {
        let request = Value::Array(words.iter().map(|w| Value::bytes(Bytes::copy_from_slice(w.as_bytes()))).collect());
        let mut out = BytesMut::new();
        protocol::encode(&request, &mut out);
        self.stream.write_all(&out).await.unwrap();
        self.read_one().await
    }

    async fn read_one(&mut self) -> Value {
        loop {
            match protocol::decode(&self.buf).unwrap() {
                Decoded::Complete(v, used) => {
                    let _ = self.buf.split_to(used);
                    return v;
                }
                Decoded::Incomplete => {}
            }
            let mut chunk = [0u8; 4096];
            let n = self.stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "server closed the connection early");
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

#[tokio::test]
async fn set_incr_incr_get_matches_the_literal_scenario() {
    let (addr, _db) = spawn_server().await;
    let mut c = TestClient::connect(addr).await;
    assert_eq!(c.call(&["SET", "foo", "1"]).await, Value::Int(1));
    assert_eq!(c.call(&["INCR", "foo"]).await, Value::Int(2));
    assert_eq!(c.call(&["INCR", "foo"]).await, Value::Int(3));
    assert_eq!(c.call(&["GET", "foo"]).await, Value::Str(Bytes::from_static(b"3")));
}

#[tokio::test]
async fn hash_scenario_matches_the_literal_sequence() {
    let (addr, _db) = spawn_server().await;
    let mut c = TestClient::connect(addr).await;
    assert_eq!(c.call(&["HSET", "h", "a", "1"]).await, Value::Int(1));
    assert_eq!(c.call(&["HSET", "h", "b", "2"]).await, Value::Int(1));
    match c.call(&["HGETALL", "h"]).await {
        Value::Map(pairs) => assert_eq!(pairs.len(), 2),
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn list_fifo_lifo_matches_the_literal_sequence() {
    let (addr, _db) = spawn_server().await;
    let mut c = TestClient::connect(addr).await;
    assert_eq!(c.call(&["RPUSH", "q", "x", "y", "z"]).await, Value::Int(3));
    match c.call(&["LRANGE", "q", "0", "-1"]).await {
        Value::Array(items) => assert_eq!(items.len(), 3),
        other => panic!("unexpected reply: {other:?}"),
    }
    assert_eq!(c.call(&["LPOP", "q"]).await, Value::Str(Bytes::from_static(b"x")));
    assert_eq!(c.call(&["RPOP", "q"]).await, Value::Str(Bytes::from_static(b"z")));
}

#[tokio::test]
async fn an_error_does_not_close_the_connection_and_the_next_command_succeeds() {
    let (addr, _db) = spawn_server().await;
    let mut c = TestClient::connect(addr).await;
    assert!(matches!(c.call(&["NOSUCHCOMMAND"]).await, Value::Error(_)));
    assert_eq!(c.call(&["SET", "k", "v"]).await, Value::Int(1));
}

#[tokio::test]
async fn wrong_type_leaves_state_unchanged() {
    let (addr, _db) = spawn_server().await;
    let mut c = TestClient::connect(addr).await;
    assert_eq!(c.call(&["SET", "k", "v"]).await, Value::Int(1));
    assert!(matches!(c.call(&["LPUSH", "k", "x"]).await, Value::Error(_)));
    assert_eq!(c.call(&["GET", "k"]).await, Value::Str(Bytes::from_static(b"v")));
}

#[tokio::test]
async fn quit_closes_the_connection_after_replying() {
    let (addr, _db) = spawn_server().await;
    let mut c = TestClient::connect(addr).await;
    assert_eq!(c.call(&["QUIT"]).await, Value::Int(1));
    let mut chunk = [0u8; 16];
    let n = c.stream.read(&mut chunk).await.unwrap();
    assert_eq!(n, 0, "server should have closed the socket after QUIT");
}
