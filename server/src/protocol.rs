/*
 * Created on Sat Jul 18 2020
 *
 * This file is a part of the source code for the Terrabase database
 * Copyright (c) 2020, Sayan Nandan <ohsayan at outlook dot com>
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

//! # The wire protocol
//!
//! This module implements the recursive, type-tagged frame protocol that the server speaks
//! with clients. Every frame starts with a single tag octet identifying its shape; containers
//! (`*`, `%`, `&`) simply nest more frames after a decimal count. See the module's `tests`
//! submodule for the full grammar in exercised form.

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

#[cfg(test)]
mod tests;

const CRLF: &[u8] = b"\r\n";

/// A value that can flow across the wire, or be held in the schedule/snapshot as an opaque
/// payload. Containers hold other `Value`s recursively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// `$` - a binary-safe byte string
    Str(Bytes),
    /// `^` - a UTF-8 decoded string
    Text(String),
    /// `:` - an integer
    Int(i64),
    /// `:` - a float (recognized on decode because the body contains `.`)
    Float(f64),
    /// `-` - an application-level error
    Error(String),
    /// `*` - an ordered sequence of frames
    Array(Vec<Value>),
    /// `%` - a sequence of key,value pairs
    Map(Vec<(Value, Value)>),
    /// `&` - a sequence of (conceptually unique) members
    Set(Vec<Value>),
    /// `$-1` - the null value
    Null,
    /// `@` - a JSON document
    Json(JsonValue),
    /// An unrecognized leading tag: the codec is not required to reject these, only to hand
    /// the raw line back up (tag included) so a caller can inspect or reject it.
    Unknown(Bytes),
}

impl Value {
    pub fn bytes<B: Into<Bytes>>(b: B) -> Self {
        Value::Str(b.into())
    }

    pub fn text<S: Into<String>>(s: S) -> Self {
        Value::Text(s.into())
    }

    /// Render a UTC timestamp the way §4.1's encoding precedence table specifies: as a `^`
    /// frame carrying the canonical `Y-m-d H:M:S[.f]` form.
    pub fn timestamp(ts: DateTime<Utc>) -> Self {
        Value::Text(format_timestamp(ts))
    }

    /// Best-effort conversion to an owned byte buffer, used by commands that accept any
    /// scalar-shaped argument (bulk, text, or simple string) as a byte string.
    pub fn as_bytes(&self) -> Option<Bytes> {
        match self {
            Value::Str(b) => Some(b.clone()),
            Value::Text(s) => Some(Bytes::copy_from_slice(s.as_bytes())),
            _ => None,
        }
    }
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS` or, when it carries sub-second precision,
/// `YYYY-MM-DD HH:MM:SS.ffffff`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    if ts.timestamp_subsec_micros() == 0 {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

/// Parse the `Y-m-d H:M:S[.f]` timestamp form used by `ADD`/`READ`/`EXPIRE`-adjacent commands.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()?;
    Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

#[derive(Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame was malformed beyond recovery (bad length header, missing terminator, ...).
    /// The connection that produced this cannot be trusted to resynchronize and is closed.
    Corrupt(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Corrupt(s) => write!(f, "corrupt frame: {s}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// The result of attempting to decode one frame from a buffer.
pub enum Decoded {
    /// A full frame was decoded, consuming `usize` bytes from the front of the buffer.
    Complete(Value, usize),
    /// Not enough bytes are buffered yet; the caller should read more from the socket.
    Incomplete,
}

/// Attempt to decode exactly one top-level frame from `buf`. Never panics on truncated input;
/// returns [`Decoded::Incomplete`] instead so the caller can read more and retry.
pub fn decode(buf: &[u8]) -> Result<Decoded, ProtocolError> {
    let mut cur = Cursor::new(buf);
    match parse_frame(&mut cur) {
        Ok(Some(value)) => Ok(Decoded::Complete(value, cur.pos)),
        Ok(None) => Ok(Decoded::Incomplete),
        Err(e) => Err(e),
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }
    fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
    fn peek_byte(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }
    fn take_line(&mut self) -> Option<&'a [u8]> {
        let rest = self.remaining();
        let idx = find_crlf(rest)?;
        let line = &rest[..idx];
        self.pos += idx + CRLF.len();
        Some(line)
    }
    fn take_exact(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.remaining().len() < n {
            return None;
        }
        let out = &self.remaining()[..n];
        self.pos += n;
        Some(out)
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

fn parse_int_line(line: &[u8], what: &'static str) -> Result<i64, ProtocolError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ProtocolError::Corrupt(format!("expected a decimal {what}")))
}

/// Recursive-descent parser for one frame. Returns `Ok(None)` on a clean incomplete read
/// (more bytes needed), `Err` on a frame that can never become valid no matter how many more
/// bytes arrive.
fn parse_frame(cur: &mut Cursor<'_>) -> Result<Option<Value>, ProtocolError> {
    let tag = match cur.peek_byte() {
        Some(b) => b,
        None => return Ok(None),
    };
    match tag {
        b'+' => {
            cur.pos += 1;
            match cur.take_line() {
                Some(line) => Ok(Some(Value::Text(
                    String::from_utf8_lossy(line).into_owned(),
                ))),
                None => Ok(None),
            }
        }
        b'-' => {
            cur.pos += 1;
            match cur.take_line() {
                Some(line) => Ok(Some(Value::Error(
                    String::from_utf8_lossy(line).into_owned(),
                ))),
                None => Ok(None),
            }
        }
        b':' => {
            cur.pos += 1;
            match cur.take_line() {
                Some(line) => {
                    if line.contains(&b'.') {
                        let s = std::str::from_utf8(line).map_err(|_| {
                            ProtocolError::Corrupt("number is not valid UTF-8".into())
                        })?;
                        let f: f64 = s
                            .parse()
                            .map_err(|_| ProtocolError::Corrupt("expected a float".into()))?;
                        Ok(Some(Value::Float(f)))
                    } else {
                        Ok(Some(Value::Int(parse_int_line(line, "integer")?)))
                    }
                }
                None => Ok(None),
            }
        }
        b'$' | b'^' | b'@' => {
            let save = cur.pos;
            cur.pos += 1;
            let len_line = match cur.take_line() {
                Some(l) => l,
                None => {
                    cur.pos = save;
                    return Ok(None);
                }
            };
            let len = parse_int_line(len_line, "length")?;
            if len == -1 {
                return Ok(Some(Value::Null));
            }
            if len < -1 {
                return Err(ProtocolError::Corrupt("negative length".into()));
            }
            let len = len as usize;
            let body = match cur.take_exact(len) {
                Some(b) => b,
                None => {
                    cur.pos = save;
                    return Ok(None);
                }
            };
            let body = Bytes::copy_from_slice(body);
            // trailing CRLF after the payload
            if cur.remaining().len() < CRLF.len() {
                cur.pos = save;
                return Ok(None);
            }
            if &cur.remaining()[..CRLF.len()] != CRLF {
                return Err(ProtocolError::Corrupt("missing CRLF after payload".into()));
            }
            cur.pos += CRLF.len();
            match tag {
                b'$' => Ok(Some(Value::Str(body))),
                b'^' => {
                    let s = String::from_utf8(body.to_vec())
                        .map_err(|_| ProtocolError::Corrupt("invalid UTF-8".into()))?;
                    Ok(Some(Value::Text(s)))
                }
                b'@' => {
                    let v: JsonValue = serde_json::from_slice(&body)
                        .map_err(|e| ProtocolError::Corrupt(format!("invalid JSON: {e}")))?;
                    Ok(Some(Value::Json(v)))
                }
                _ => unreachable!(),
            }
        }
        b'*' | b'&' => {
            let save = cur.pos;
            cur.pos += 1;
            let count_line = match cur.take_line() {
                Some(l) => l,
                None => {
                    cur.pos = save;
                    return Ok(None);
                }
            };
            let count = parse_int_line(count_line, "count")?;
            if count < 0 {
                return Err(ProtocolError::Corrupt("negative count".into()));
            }
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                match parse_frame(cur)? {
                    Some(v) => items.push(v),
                    None => {
                        cur.pos = save;
                        return Ok(None);
                    }
                }
            }
            Ok(Some(if tag == b'*' {
                Value::Array(items)
            } else {
                Value::Set(items)
            }))
        }
        b'%' => {
            let save = cur.pos;
            cur.pos += 1;
            let count_line = match cur.take_line() {
                Some(l) => l,
                None => {
                    cur.pos = save;
                    return Ok(None);
                }
            };
            let n = parse_int_line(count_line, "count")?;
            if n < 0 {
                return Err(ProtocolError::Corrupt("negative count".into()));
            }
            let mut pairs = Vec::with_capacity(n as usize);
            for _ in 0..n {
                let key = match parse_frame(cur)? {
                    Some(v) => v,
                    None => {
                        cur.pos = save;
                        return Ok(None);
                    }
                };
                let val = match parse_frame(cur)? {
                    Some(v) => v,
                    None => {
                        cur.pos = save;
                        return Ok(None);
                    }
                };
                pairs.push((key, val));
            }
            Ok(Some(Value::Map(pairs)))
        }
        _ => {
            // Unrecognized tag: not fatal. Hand back the raw line, tag included, so the
            // caller can inspect or reject it.
            let save = cur.pos;
            match cur.take_line() {
                Some(line) => {
                    let mut raw = Vec::with_capacity(line.len());
                    raw.extend_from_slice(line);
                    Ok(Some(Value::Unknown(Bytes::from(raw))))
                }
                None => {
                    cur.pos = save;
                    Ok(None)
                }
            }
        }
    }
}

/// Encode `value` onto `out`, appending to whatever is already buffered. The caller is
/// expected to write the whole buffer in one shot once a response is fully encoded, to
/// guarantee a single atomic write where the transport allows it.
pub fn encode(value: &Value, out: &mut BytesMut) {
    match value {
        Value::Str(b) => encode_bulk(b'$', b, out),
        Value::Text(s) => encode_bulk(b'^', s.as_bytes(), out),
        Value::Int(i) => {
            out.extend_from_slice(b":");
            out.extend_from_slice(i.to_string().as_bytes());
            out.extend_from_slice(CRLF);
        }
        Value::Float(f) => {
            out.extend_from_slice(b":");
            out.extend_from_slice(format_float(*f).as_bytes());
            out.extend_from_slice(CRLF);
        }
        Value::Error(e) => {
            out.extend_from_slice(b"-");
            out.extend_from_slice(e.as_bytes());
            out.extend_from_slice(CRLF);
        }
        Value::Array(items) => {
            out.extend_from_slice(b"*");
            out.extend_from_slice(items.len().to_string().as_bytes());
            out.extend_from_slice(CRLF);
            for item in items {
                encode(item, out);
            }
        }
        Value::Map(pairs) => {
            out.extend_from_slice(b"%");
            out.extend_from_slice(pairs.len().to_string().as_bytes());
            out.extend_from_slice(CRLF);
            for (k, v) in pairs {
                encode(k, out);
                encode(v, out);
            }
        }
        Value::Set(items) => {
            out.extend_from_slice(b"&");
            out.extend_from_slice(items.len().to_string().as_bytes());
            out.extend_from_slice(CRLF);
            for item in items {
                encode(item, out);
            }
        }
        Value::Null => out.extend_from_slice(b"$-1\r\n"),
        Value::Json(j) => {
            let body = serde_json::to_vec(j).unwrap_or_default();
            encode_bulk(b'@', &body, out);
        }
        Value::Unknown(raw) => {
            out.extend_from_slice(raw);
            out.extend_from_slice(CRLF);
        }
    }
}

/// Encode a native Rust bool per the encoding precedence table: a `:` frame whose body is
/// `1` or `0`. There is no dedicated boolean tag on the wire, so on decode this is
/// indistinguishable from `Value::Int`.
pub fn encode_bool(b: bool, out: &mut BytesMut) {
    out.extend_from_slice(if b { b":1\r\n" } else { b":0\r\n" });
}

fn encode_bulk(tag: u8, body: &[u8], out: &mut BytesMut) {
    out.extend_from_slice(&[tag]);
    out.extend_from_slice(body.len().to_string().as_bytes());
    out.extend_from_slice(CRLF);
    out.extend_from_slice(body);
    out.extend_from_slice(CRLF);
}

fn format_float(f: f64) -> String {
    if f == f.trunc() && f.is_finite() {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Encode a complete value into a freshly allocated buffer. Convenience wrapper around
/// [`encode`] for call sites that don't already hold a [`BytesMut`].
pub fn encode_to_bytes(value: &Value) -> BytesMut {
    let mut out = BytesMut::with_capacity(64);
    encode(value, &mut out);
    out
}
