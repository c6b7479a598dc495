/*
 * This file is a part of Skytable
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

//! Lazy TTL tracking: an authoritative map plus a possibly-stale min-heap (§4.3).

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::binary_heap::BinaryHeap;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeapEntry {
    expiry: DateTime<Utc>,
    key: Bytes,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.expiry.cmp(&other.expiry).then_with(|| self.key.cmp(&other.key))
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// `expiry_map` + `expiry_heap` from §3. Heap entries may be stale: a key's entry is
/// authoritative only via `map`, and staleness is resolved at pop time.
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    map: HashMap<Bytes, DateTime<Utc>>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
}

impl ExpiryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` expires at `at`, pushing a new heap entry. A key may accumulate
    /// several heap entries across repeated `EXPIRE` calls; only `map`'s value is authoritative.
    pub fn set(&mut self, key: Bytes, at: DateTime<Utc>) {
        self.heap.push(Reverse(HeapEntry {
            expiry: at,
            key: key.clone(),
        }));
        self.map.insert(key, at);
    }

    /// True iff `key` has an expiry recorded and it is strictly in the past relative to `now`.
    pub fn check_expired(&self, key: &[u8], now: DateTime<Utc>) -> bool {
        match self.map.get(key) {
            Some(at) => now > *at,
            None => false,
        }
    }

    /// Drop any pending expiry for `key`. Any heap entries referring to it become stale and
    /// are silently discarded the next time they're popped.
    pub fn unexpire(&mut self, key: &[u8]) {
        self.map.remove(key);
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.heap.clear();
    }

    /// Pop every heap entry due by `now`. Returns the keys that were actually current (and so
    /// should be deleted from the keyspace); stale entries are discarded without being
    /// reported. Stops and pushes back the first entry that isn't due yet.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<Bytes> {
        let mut reaped = Vec::new();
        while let Some(Reverse(top)) = self.heap.peek() {
            if top.expiry > now {
                break;
            }
            let Reverse(entry) = self.heap.pop().unwrap();
            if self.map.get(&entry.key) == Some(&entry.expiry) {
                self.map.remove(&entry.key);
                reaped.push(entry.key);
            }
        }
        reaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn stale_entries_are_discarded_not_reported() {
        let mut idx = ExpiryIndex::new();
        let now = Utc::now();
        idx.set(Bytes::from_static(b"k"), now + Duration::seconds(10));
        // refresh with a later expiry; the first heap entry is now stale
        idx.set(Bytes::from_static(b"k"), now + Duration::seconds(20));
        let reaped = idx.sweep(now + Duration::seconds(15));
        assert!(reaped.is_empty(), "the stale 10s entry must not be reported");
    }

    #[test]
    fn current_entry_is_reaped_when_due() {
        let mut idx = ExpiryIndex::new();
        let now = Utc::now();
        idx.set(Bytes::from_static(b"k"), now + Duration::seconds(1));
        assert!(idx.sweep(now).is_empty());
        let reaped = idx.sweep(now + Duration::seconds(2));
        assert_eq!(reaped, vec![Bytes::from_static(b"k")]);
    }

    #[test]
    fn unexpire_prevents_future_reap() {
        let mut idx = ExpiryIndex::new();
        let now = Utc::now();
        idx.set(Bytes::from_static(b"k"), now + Duration::seconds(1));
        idx.unexpire(b"k");
        let reaped = idx.sweep(now + Duration::seconds(2));
        assert!(reaped.is_empty());
    }

    #[test]
    fn check_expired_true_only_strictly_past() {
        let mut idx = ExpiryIndex::new();
        let now = Utc::now();
        idx.set(Bytes::from_static(b"k"), now);
        assert!(!idx.check_expired(b"k", now));
        assert!(idx.check_expired(b"k", now + Duration::milliseconds(1)));
    }
}
