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

//! The delayed-delivery schedule (§4.4): an independent min-heap of `(timestamp, payload)`
//! pairs, unrelated to key expiration.

use crate::protocol::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// One scheduled delivery. `payload` is whatever the client handed to `ADD`, kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub at: DateTime<Utc>,
    pub payload: Value,
}

impl ScheduleEntry {
    fn key(&self) -> (DateTime<Utc>, usize) {
        // break ties by payload identity isn't needed; chrono timestamps compare totally
        (self.at, 0)
    }
}

impl PartialEq for ScheduleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for ScheduleEntry {}
impl PartialOrd for ScheduleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ScheduleEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.at.cmp(&other.at)
    }
}

#[derive(Debug, Default)]
pub struct Schedule {
    heap: BinaryHeap<Reverse<ScheduleEntry>>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// `ADD ts payload`
    pub fn add(&mut self, at: DateTime<Utc>, payload: Value) {
        self.heap.push(Reverse(ScheduleEntry { at, payload }));
    }

    /// `READ ts`: drain every entry due by `at`, in timestamp order.
    pub fn read(&mut self, at: DateTime<Utc>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Some(Reverse(top)) = self.heap.peek() {
            if top.at > at {
                break;
            }
            let Reverse(entry) = self.heap.pop().unwrap();
            out.push(entry.payload);
        }
        out
    }

    /// `FLUSH_SCHEDULE`: clear, returning the prior length.
    pub fn flush(&mut self) -> usize {
        let n = self.heap.len();
        self.heap.clear();
        n
    }

    /// `LENGTH_SCHEDULE`
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// All pending entries, oldest first, for snapshotting. Does not drain the heap.
    pub fn snapshot(&self) -> Vec<ScheduleEntry> {
        let mut entries: Vec<ScheduleEntry> =
            self.heap.iter().map(|Reverse(e)| e.clone()).collect();
        entries.sort_by(|a, b| a.at.cmp(&b.at));
        entries
    }

    /// Replace the entire schedule (`RESTORE`/`MERGE` both replace it per §4.6).
    pub fn restore(&mut self, entries: Vec<ScheduleEntry>) {
        self.heap = entries.into_iter().map(Reverse).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn read_drains_only_due_entries_in_order() {
        let mut s = Schedule::new();
        let now = Utc::now();
        s.add(now + Duration::seconds(20), Value::text("late"));
        s.add(now + Duration::seconds(5), Value::text("early"));
        s.add(now + Duration::seconds(10), Value::text("middle"));
        let due = s.read(now + Duration::seconds(12));
        assert_eq!(
            due,
            vec![Value::text("early"), Value::text("middle")]
        );
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn flush_clears_and_reports_prior_length() {
        let mut s = Schedule::new();
        s.add(Utc::now(), Value::Int(1));
        s.add(Utc::now(), Value::Int(2));
        assert_eq!(s.flush(), 2);
        assert_eq!(s.len(), 0);
    }
}
