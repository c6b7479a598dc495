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

//! On-disk snapshot format for `SAVE`/`RESTORE`/`MERGE` (§4.6).
//!
//! Layout: a 4-byte magic, a `u32` format version, a `u32` CRC32 of the payload, then the
//! bincode-encoded payload itself. The version is checked on load so a future incompatible
//! layout change can reject old files instead of misreading them.

use super::schedule::ScheduleEntry;
use super::Entry;
use bytes::Bytes;
use crc::{Crc, CRC_32_ISO_HDLC};
use libsky::TResult;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const MAGIC: &[u8; 4] = b"TKV1";
const FORMAT_VERSION: u32 = 1;
const CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// The two named sections a snapshot file carries, per §6's persisted layout.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SnapshotData {
    pub kv: HashMap<Bytes, Entry>,
    pub schedule: Vec<ScheduleEntry>,
}

/// Serialize `data` and write it to `path`, replacing any existing file.
pub fn save(path: &Path, data: &SnapshotData) -> TResult<()> {
    let payload = bincode::serialize(data)?;
    let checksum = CASTAGNOLI.checksum(&payload);
    let mut buf = Vec::with_capacity(4 + 4 + 4 + payload.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&checksum.to_le_bytes());
    buf.extend_from_slice(&payload);
    fs::write(path, buf)?;
    Ok(())
}

/// Read and validate a snapshot file written by [`save`]. Rejects bad magic, unknown
/// versions, and checksum mismatches with a descriptive error rather than panicking on a
/// truncated or foreign file.
pub fn load(path: &Path) -> TResult<SnapshotData> {
    let buf = fs::read(path)?;
    if buf.len() < 12 || &buf[0..4] != MAGIC {
        return Err("not a valid snapshot file".into());
    }
    let version = u32::from_le_bytes(buf[4..8].try_into().unwrap());
    if version != FORMAT_VERSION {
        return Err(format!("unsupported snapshot format version {version}").into());
    }
    let checksum = u32::from_le_bytes(buf[8..12].try_into().unwrap());
    let payload = &buf[12..];
    if CASTAGNOLI.checksum(payload) != checksum {
        return Err("snapshot checksum mismatch".into());
    }
    let data: SnapshotData = bincode::deserialize(payload)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn round_trips_through_a_temp_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("tidekv-snapshot-test-{}.bin", std::process::id()));

        let mut kv = HashMap::new();
        kv.insert(Bytes::from_static(b"k1"), Entry::Scalar(Bytes::from_static(b"v1")));
        let mut set = HashSet::new();
        set.insert(Bytes::from_static(b"m1"));
        kv.insert(Bytes::from_static(b"k2"), Entry::Set(set));

        let data = SnapshotData {
            kv,
            schedule: vec![ScheduleEntry {
                at: chrono::Utc::now(),
                payload: crate::protocol::Value::text("payload"),
            }],
        };

        save(&path, &data).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.kv.len(), data.kv.len());
        assert_eq!(loaded.schedule.len(), 1);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn rejects_bad_magic() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("tidekv-snapshot-bad-{}.bin", std::process::id()));
        fs::write(&path, b"not a snapshot").unwrap();
        assert!(load(&path).is_err());
        let _ = fs::remove_file(&path);
    }
}
