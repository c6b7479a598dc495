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

//! # The keyspace
//!
//! A key maps to exactly one [`Entry`] variant. Handlers never coerce between variants; a
//! mismatch is always a type error, raised through [`Keyspace::checked`].

pub mod expiry;
pub mod schedule;
pub mod snapshot;

use self::expiry::ExpiryIndex;
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// The kind of a stored [`Entry`], independent of its contents. Commands declare which
/// variant they require; [`Keyspace::checked`] enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Scalar,
    Hash,
    List,
    Set,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variant::Scalar => "scalar",
            Variant::Hash => "hash",
            Variant::List => "list",
            Variant::Set => "set",
        };
        f.write_str(name)
    }
}

/// A keyspace entry. Every key maps to exactly one of these; see invariant 1 in the data model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Entry {
    Scalar(Bytes),
    Hash(HashMap<Bytes, Bytes>),
    List(VecDeque<Bytes>),
    Set(HashSet<Bytes>),
}

impl Entry {
    pub fn variant(&self) -> Variant {
        match self {
            Entry::Scalar(_) => Variant::Scalar,
            Entry::Hash(_) => Variant::Hash,
            Entry::List(_) => Variant::List,
            Entry::Set(_) => Variant::Set,
        }
    }

    fn empty(variant: Variant) -> Self {
        match variant {
            Variant::Scalar => Entry::Scalar(Bytes::new()),
            Variant::Hash => Entry::Hash(HashMap::new()),
            Variant::List => Entry::List(VecDeque::new()),
            Variant::Set => Entry::Set(HashSet::new()),
        }
    }
}

/// Raised whenever a command's required variant doesn't match what's stored under the key.
/// Translated to a `CmdError` one layer up (see `crate::util::CmdError`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrongTypeError;

/// The typed keyspace plus its expiration index. Both are mutated only by the coarse owner
/// (see `crate::dbnet`), so no internal locking is needed here.
#[derive(Debug, Default)]
pub struct Keyspace {
    map: HashMap<Bytes, Entry>,
    pub expiry: ExpiryIndex,
}

impl Keyspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop `key` if it has passed its expiration. Called by every read/write prologue.
    fn reap_if_expired(&mut self, key: &[u8]) {
        if self.expiry.check_expired(key, Utc::now()) {
            self.map.remove(key);
            self.expiry.unexpire(key);
        }
    }

    /// True iff `key` is present and not expired.
    pub fn exists(&mut self, key: &[u8]) -> bool {
        self.reap_if_expired(key);
        self.map.contains_key(key)
    }

    /// Read-only lookup: does not create the key if absent, but does apply lazy expiry.
    pub fn get(&mut self, key: &[u8]) -> Option<&Entry> {
        self.reap_if_expired(key);
        self.map.get(key)
    }

    /// Read-checked lookup: returns `Ok(None)` if absent, `Err` if present under the wrong
    /// variant, `Ok(Some(_))` otherwise. Never creates state.
    pub fn read_checked(
        &mut self,
        key: &[u8],
        required: Variant,
    ) -> Result<Option<&Entry>, WrongTypeError> {
        self.reap_if_expired(key);
        match self.map.get(key) {
            None => Ok(None),
            Some(e) if e.variant() == required => Ok(Some(e)),
            Some(_) => Err(WrongTypeError),
        }
    }

    /// Write-checked lookup: creates an empty container of `required` variant if absent,
    /// otherwise verifies the existing entry's variant matches.
    pub fn write_checked(
        &mut self,
        key: &Bytes,
        required: Variant,
    ) -> Result<&mut Entry, WrongTypeError> {
        self.reap_if_expired(key);
        if !self.map.contains_key(key.as_ref()) {
            self.map.insert(key.clone(), Entry::empty(required));
        }
        let entry = self.map.get_mut(key.as_ref()).unwrap();
        if entry.variant() != required {
            return Err(WrongTypeError);
        }
        Ok(entry)
    }

    /// Unconditionally set `key` to `entry`, clearing any prior TTL (§4.5: `SET`/`MSET`
    /// unexpire the keys they touch).
    pub fn set(&mut self, key: Bytes, entry: Entry) {
        self.expiry.unexpire(&key);
        self.map.insert(key, entry);
    }

    /// Remove `key` entirely, including any pending TTL. Returns true if it was present.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        self.reap_if_expired(key);
        self.expiry.unexpire(key);
        self.map.remove(key).is_some()
    }

    /// Total number of live (non-expired) keys. Sweeps first so the count is exact.
    pub fn len(&mut self) -> usize {
        self.sweep();
        self.map.len()
    }

    /// All live keys, for `INFO`/`KEYS`-style reporting.
    pub fn keys(&mut self) -> Vec<Bytes> {
        self.sweep();
        self.map.keys().cloned().collect()
    }

    /// Clear the keyspace and the expiration index. Used by `FLUSH`/`FLUSHALL`.
    pub fn clear(&mut self) {
        self.map.clear();
        self.expiry.clear();
    }

    /// Run the lazy-reclamation sweep described in §4.3: pop every heap entry whose timestamp
    /// is due, dropping the keyspace entry only if the heap entry is still current.
    pub fn sweep(&mut self) {
        for key in self.expiry.sweep(Utc::now()) {
            self.map.remove(&key);
        }
    }

    /// Snapshot the entire map for `SAVE`. Cloning here is the simplest way to release the
    /// coarse lock quickly around the (possibly slow) disk write that follows.
    pub fn snapshot_entries(&mut self) -> HashMap<Bytes, Entry> {
        self.sweep();
        self.map.clone()
    }

    /// Replace the entire keyspace, used by `RESTORE`.
    pub fn restore_entries(&mut self, entries: HashMap<Bytes, Entry>) {
        self.map = entries;
        self.expiry.clear();
    }

    /// Merge `entries` into the existing keyspace, on-disk entries winning on collision
    /// (§4.6). Does not touch expiry for surviving in-memory-only keys.
    pub fn merge_entries(&mut self, entries: HashMap<Bytes, Entry>) {
        for (k, v) in entries {
            self.expiry.unexpire(&k);
            self.map.insert(k, v);
        }
    }
}
