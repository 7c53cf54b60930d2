//! # Address Table Persistence
//!
//! Versioned binary layout of the address table. Four historical record
//! layouts are readable; the newest one is always written.
//!
//! ## Layout
//!
//! ```text
//! version (u8) | key size (u8) = 32 | key (32)
//! new count (i32) | tried count (i32) | bucket count ^ (1 << 30) (i32)
//! new count x record | tried count x record
//! bucket count x { slot count (i32) | slot count x new entry index (i32) }
//! ```
//!
//! ## Self-Healing Load
//!
//! Bucket hints are trusted only when the bucket count matches the compiled
//! geometry. Any New entry left without a slot is re-derived from its own
//! source; Tried entries are always re-derived. Slot collisions drop the
//! later entry instead of failing the load.
//!
//! An all-zero key and bytes left over after the bucket section are hard
//! failures.

mod stream;

use std::collections::HashMap;

use tracing::warn;

pub use stream::{StreamReader, StreamWriter};

use crate::domain::{
    bucket_position, tried_bucket, AddressTable, EntryId, IpAddr, PeerAddress, ServiceFlags,
    SocketAddr, Timestamp, BUCKET_SIZE, MAX_REFS_PER_ADDRESS, NEW_BUCKET_COUNT,
    TRIED_BUCKET_COUNT,
};
use crate::error::CodecError;

/// Version written by `encode`.
pub const CURRENT_VERSION: u8 = 3;
/// Length of the placement key.
const KEY_SIZE: u8 = 32;
/// Flag xor-ed into the bucket count.
const BUCKET_MARKER_FLAG: i32 = 1 << 30;
/// Bytes before the first record.
pub const HEADER_LEN: usize = 1 + 1 + 32 + 4 + 4 + 4;

/// One entry as laid out on disk.
#[derive(Debug)]
struct Record {
    legacy_id: Option<i32>,
    address: PeerAddress,
    source: IpAddr,
    last_success: Option<Timestamp>,
    attempt_count: u32,
    last_attempt: Option<Timestamp>,
}

fn timestamp_from_disk(secs: i64) -> Option<Timestamp> {
    (secs > 0).then(|| Timestamp::new(secs as u64))
}

fn timestamp_to_disk(ts: Option<Timestamp>) -> i64 {
    ts.map(|t| t.as_secs() as i64).unwrap_or(0)
}

fn read_record(r: &mut StreamReader<'_>, version: u8) -> Result<Record, CodecError> {
    let legacy_id = if version == 0 { Some(r.read_i32()?) } else { None };
    let last_seen = match version {
        0 => None,
        1 | 2 => Some(Timestamp::new(u64::from(r.read_u32()?))),
        _ => Some(Timestamp::new(r.read_i64()?.max(0) as u64)),
    };
    let services = ServiceFlags(r.read_u64()?);
    let ip = IpAddr::from_mapped(r.read_array()?);
    let port = r.read_port()?;
    let source = IpAddr::from_mapped(r.read_array()?);
    let last_success = timestamp_from_disk(r.read_i64()?);
    let attempt_count = r.read_i32()?.max(0) as u32;
    let last_attempt = if version >= 2 {
        timestamp_from_disk(r.read_i64()?)
    } else {
        None
    };

    // no timestamp in the oldest layout: fall back to the last success
    let last_seen = last_seen.unwrap_or_else(|| last_success.unwrap_or(Timestamp::ZERO));

    Ok(Record {
        legacy_id,
        address: PeerAddress::new(SocketAddr::new(ip, port), services, last_seen),
        source,
        last_success,
        attempt_count,
        last_attempt,
    })
}

fn write_record(w: &mut StreamWriter, table: &AddressTable, id: EntryId, version: u8, legacy_id: i32) {
    let Some(entry) = table.get(id) else {
        return;
    };
    if version == 0 {
        w.write_i32(legacy_id);
    }
    match version {
        0 => {}
        1 | 2 => w.write_u32(entry.address.last_seen.as_secs().min(u64::from(u32::MAX)) as u32),
        _ => w.write_i64(entry.address.last_seen.as_secs() as i64),
    }
    w.write_u64(entry.address.services.bits());
    w.write_bytes(&entry.address.socket_addr.ip.to_mapped());
    w.write_port(entry.address.socket_addr.port);
    w.write_bytes(&entry.source.to_mapped());
    w.write_i64(timestamp_to_disk(entry.last_success));
    w.write_i32(entry.attempt_count.min(i32::MAX as u32) as i32);
    if version >= 2 {
        w.write_i64(timestamp_to_disk(entry.last_attempt));
    }
}

/// Serialize the table in the current layout.
pub fn encode(table: &AddressTable) -> Vec<u8> {
    encode_as(table, CURRENT_VERSION, true)
}

/// Serialize in any readable layout. Without `bucket_hints` an empty bucket
/// section is written and a reader has to re-derive every New slot.
pub(crate) fn encode_as(table: &AddressTable, version: u8, bucket_hints: bool) -> Vec<u8> {
    let new_ids: Vec<EntryId> = table
        .random_order
        .iter()
        .copied()
        .filter(|id| table.get(*id).is_some_and(|e| !e.in_tried()))
        .collect();
    let tried_ids: Vec<EntryId> = table
        .random_order
        .iter()
        .copied()
        .filter(|id| table.get(*id).is_some_and(|e| e.in_tried()))
        .collect();

    // version 0 ids are odd numbers, never positions
    let legacy_id = |pos: usize| (pos as i32) * 2 + 1;
    let positions: HashMap<EntryId, usize> =
        new_ids.iter().enumerate().map(|(pos, id)| (*id, pos)).collect();

    let mut w = StreamWriter::with_capacity(HEADER_LEN + table.len() * 80);
    w.write_u8(version);
    w.write_u8(KEY_SIZE);
    w.write_bytes(table.key());
    w.write_i32(new_ids.len() as i32);
    w.write_i32(tried_ids.len() as i32);
    let bucket_count = if bucket_hints { NEW_BUCKET_COUNT } else { 0 };
    w.write_i32(bucket_count as i32 ^ BUCKET_MARKER_FLAG);

    for (pos, id) in new_ids.iter().enumerate() {
        write_record(&mut w, table, *id, version, legacy_id(pos));
    }
    for (pos, id) in tried_ids.iter().enumerate() {
        write_record(&mut w, table, *id, version, legacy_id(new_ids.len() + pos));
    }

    for bucket in 0..bucket_count {
        let slots: Vec<usize> = table
            .new_grid
            .bucket_entries(bucket)
            .filter_map(|id| positions.get(&id).copied())
            .collect();
        w.write_i32(slots.len() as i32);
        for pos in slots {
            w.write_i32(if version == 0 { legacy_id(pos) } else { pos as i32 });
        }
    }

    w.into_inner()
}

fn non_negative(value: i32, what: &'static str) -> Result<usize, CodecError> {
    usize::try_from(value).map_err(|_| CodecError::NegativeCount { what, value })
}

/// Decode a table written by `encode` or any older layout.
pub fn decode(bytes: &[u8]) -> Result<AddressTable, CodecError> {
    let mut r = StreamReader::new(bytes);

    let version = r.read_u8()?;
    if version > CURRENT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let key_size = r.read_u8()?;
    if key_size != KEY_SIZE {
        return Err(CodecError::InvalidKeySize(key_size));
    }
    let key: [u8; 32] = r.read_array()?;
    if key.iter().all(|b| *b == 0) {
        return Err(CodecError::ZeroKey);
    }

    let new_count = non_negative(r.read_i32()?, "new")?;
    let tried_count = non_negative(r.read_i32()?, "tried")?;
    let new_capacity = NEW_BUCKET_COUNT * BUCKET_SIZE;
    if new_count > new_capacity {
        return Err(CodecError::CountOutOfRange {
            what: "new",
            value: new_count,
            max: new_capacity,
        });
    }
    let tried_capacity = TRIED_BUCKET_COUNT * BUCKET_SIZE;
    if tried_count > tried_capacity {
        return Err(CodecError::CountOutOfRange {
            what: "tried",
            value: tried_count,
            max: tried_capacity,
        });
    }
    let bucket_count = non_negative(r.read_i32()? ^ BUCKET_MARKER_FLAG, "bucket")?;

    let mut table = AddressTable::new(key);
    // legacy id -> position among New entries (None for Tried records)
    let mut legacy: HashMap<i32, Option<usize>> = HashMap::new();
    let mut new_ids: Vec<Option<EntryId>> = Vec::with_capacity(new_count);
    let mut duplicates = 0usize;

    for pos in 0..new_count {
        let record = read_record(&mut r, version)?;
        if let Some(legacy_id) = record.legacy_id {
            if legacy.insert(legacy_id, Some(pos)).is_some() {
                return Err(CodecError::DuplicateLegacyId(legacy_id));
            }
        }
        if table.find_id(&record.address.socket_addr.ip).is_some() {
            duplicates += 1;
            new_ids.push(None);
            continue;
        }
        new_ids.push(Some(create_from_record(&mut table, &record)));
    }

    let mut tried_dropped = 0usize;
    for _ in 0..tried_count {
        let record = read_record(&mut r, version)?;
        if let Some(legacy_id) = record.legacy_id {
            if legacy.insert(legacy_id, None).is_some() {
                return Err(CodecError::DuplicateLegacyId(legacy_id));
            }
        }
        if record.last_success.is_none() {
            return Err(CodecError::TriedWithoutSuccess);
        }
        if table.find_id(&record.address.socket_addr.ip).is_some() {
            duplicates += 1;
            continue;
        }
        let addr = record.address.socket_addr;
        let bucket = tried_bucket(&key, &addr);
        let slot = bucket_position(&key, false, bucket, &addr);
        if table.tried_grid.get(bucket, slot).is_some() {
            tried_dropped += 1;
            continue;
        }
        let id = create_from_record(&mut table, &record);
        table.insert_tried(bucket, slot, id);
    }

    let honour_hints = bucket_count == NEW_BUCKET_COUNT;
    if !honour_hints {
        warn!(
            "[qc-01] Bucket count {} differs from {}, ignoring bucket hints",
            bucket_count, NEW_BUCKET_COUNT
        );
    }
    for bucket in 0..bucket_count {
        let slot_count = non_negative(r.read_i32()?, "slot")?;
        for _ in 0..slot_count {
            let raw = r.read_i32()?;
            let pos = if version == 0 {
                match legacy.get(&raw) {
                    Some(Some(pos)) => *pos,
                    _ => return Err(CodecError::UnknownLegacyId(raw)),
                }
            } else {
                match usize::try_from(raw) {
                    Ok(pos) if pos < new_count => pos,
                    _ => {
                        return Err(CodecError::EntryIndexOutOfRange {
                            index: raw,
                            count: new_count,
                        })
                    }
                }
            };
            if !honour_hints {
                continue;
            }
            let Some(id) = new_ids[pos] else {
                continue;
            };
            let Some(entry) = table.get(id) else {
                continue;
            };
            if entry.ref_count() >= MAX_REFS_PER_ADDRESS {
                continue;
            }
            let slot = bucket_position(&key, true, bucket, &entry.address.socket_addr);
            if table.new_grid.get(bucket, slot).is_none() {
                table.insert_new(bucket, slot, id);
            }
        }
    }

    if r.remaining() != 0 {
        return Err(CodecError::TrailingBytes(r.remaining()));
    }

    // anything still unreferenced goes where its own source puts it
    let mut new_dropped = 0usize;
    for id in new_ids.into_iter().flatten() {
        let Some(entry) = table.get(id) else {
            continue;
        };
        if entry.ref_count() > 0 {
            continue;
        }
        let (bucket, slot) = table.own_new_placement(entry);
        if table.new_grid.get(bucket, slot).is_none() {
            table.insert_new(bucket, slot, id);
        } else {
            table.delete(id);
            new_dropped += 1;
        }
    }

    if duplicates + tried_dropped + new_dropped > 0 {
        warn!(
            "[qc-01] Loaded with {} duplicate, {} tried and {} new entries dropped",
            duplicates, tried_dropped, new_dropped
        );
    }

    Ok(table)
}

fn create_from_record(table: &mut AddressTable, record: &Record) -> EntryId {
    let id = table.create(record.address, record.source);
    if let Some(entry) = table.entries.get_mut(&id) {
        entry.last_success = record.last_success;
        entry.last_attempt = record.last_attempt;
        entry.attempt_count = record.attempt_count;
    }
    id
}
