//! Bucket placement and slot grids.
//!
//! Placement is a pure function of the table key and the entry's own
//! fields, so it can be recomputed at any time to audit the grids or to
//! rebuild them after loading.

use super::config::{
    BUCKET_SIZE, NEW_BUCKET_COUNT, SOURCE_GROUPS_PER_BUCKET, TRIED_BUCKET_COUNT,
    TRIED_GROUPS_PER_GROUP,
};
use super::security::{KeyedHasher, NetworkGroup};
use super::types::EntryId;
use crate::domain::{IpAddr, SocketAddr};

/// New-table bucket for `addr` as reported by `source`.
///
/// # Security (Anti-Eclipse)
/// One source group can only reach `SOURCE_GROUPS_PER_BUCKET` buckets, no
/// matter how many addresses it gossips.
pub fn new_bucket(key: &[u8; 32], addr: &SocketAddr, source: &IpAddr) -> usize {
    let addr_group = NetworkGroup::from_ip(&addr.ip);
    let source_group = NetworkGroup::from_ip(source);
    let h1 = KeyedHasher::new(key)
        .write(addr_group.as_bytes())
        .write(source_group.as_bytes())
        .finish();
    let h2 = KeyedHasher::new(key)
        .write(source_group.as_bytes())
        .write_u64(h1 % SOURCE_GROUPS_PER_BUCKET)
        .finish();
    (h2 % NEW_BUCKET_COUNT as u64) as usize
}

/// Tried-table bucket for `addr`.
///
/// # Security (Anti-Eclipse)
/// One address group can only occupy `TRIED_GROUPS_PER_GROUP` buckets.
pub fn tried_bucket(key: &[u8; 32], addr: &SocketAddr) -> usize {
    let h1 = KeyedHasher::new(key).write(&addr.key_bytes()).finish();
    let h2 = KeyedHasher::new(key)
        .write(NetworkGroup::from_ip(&addr.ip).as_bytes())
        .write_u64(h1 % TRIED_GROUPS_PER_GROUP)
        .finish();
    (h2 % TRIED_BUCKET_COUNT as u64) as usize
}

/// Slot of `addr` inside `bucket` of the New (`is_new`) or Tried table.
pub fn bucket_position(key: &[u8; 32], is_new: bool, bucket: usize, addr: &SocketAddr) -> usize {
    let tag = if is_new { b'N' } else { b'K' };
    let h1 = KeyedHasher::new(key)
        .write(&[tag])
        .write_u64(bucket as u64)
        .write(&addr.key_bytes())
        .finish();
    (h1 % BUCKET_SIZE as u64) as usize
}

/// Fixed-size bucket × slot grid of entry handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketGrid {
    slots: Vec<Option<EntryId>>,
    bucket_count: usize,
}

impl BucketGrid {
    /// Create an empty grid with `bucket_count` buckets of `BUCKET_SIZE`.
    pub fn new(bucket_count: usize) -> Self {
        Self {
            slots: vec![None; bucket_count * BUCKET_SIZE],
            bucket_count,
        }
    }

    /// Number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Entry at `(bucket, slot)`.
    pub fn get(&self, bucket: usize, slot: usize) -> Option<EntryId> {
        self.slots[bucket * BUCKET_SIZE + slot]
    }

    /// Overwrite `(bucket, slot)`.
    pub fn set(&mut self, bucket: usize, slot: usize, id: Option<EntryId>) {
        self.slots[bucket * BUCKET_SIZE + slot] = id;
    }

    /// Entry at a flat index (`bucket * BUCKET_SIZE + slot`).
    pub fn get_flat(&self, index: usize) -> Option<EntryId> {
        self.slots[index]
    }

    /// Occupied slots of one bucket in slot order.
    pub fn bucket_entries(&self, bucket: usize) -> impl Iterator<Item = EntryId> + '_ {
        self.slots[bucket * BUCKET_SIZE..(bucket + 1) * BUCKET_SIZE]
            .iter()
            .flatten()
            .copied()
    }

    /// Every occupied slot as `(bucket, slot, id)`.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize, EntryId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, id)| id.map(|id| (i / BUCKET_SIZE, i % BUCKET_SIZE, id)))
    }

    /// Number of occupied slots.
    pub fn used(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }
}
