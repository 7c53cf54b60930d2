//! Address table storage.
//!
//! The arena owns every entry; the grids, the endpoint index and the
//! ordering array only hold `EntryId` handles into it. All mutations that
//! have to keep those four views in step live here.

use std::collections::HashMap;

use tracing::debug;

use super::bucket::{bucket_position, new_bucket, tried_bucket, BucketGrid};
use super::config::{NEW_BUCKET_COUNT, TRIED_BUCKET_COUNT};
use super::types::{AddressEntry, AddressManagerStats, EntryId};
use crate::domain::{IpAddr, PeerAddress, Timestamp};

/// The New/Tried grids plus the entry arena they point into
#[derive(Debug, Clone)]
pub struct AddressTable {
    /// Secret placement key
    pub(crate) key: [u8; 32],
    /// Arena: id -> entry
    pub(crate) entries: HashMap<EntryId, AddressEntry>,
    /// Canonical mapped IP -> id
    pub(crate) index: HashMap<[u8; 16], EntryId>,
    /// Every id exactly once, in random order
    pub(crate) random_order: Vec<EntryId>,
    pub(crate) new_grid: BucketGrid,
    pub(crate) tried_grid: BucketGrid,
    /// Entries not in Tried
    pub(crate) new_count: usize,
    /// Entries in Tried
    pub(crate) tried_count: usize,
    /// Time of the most recent successful connection of this node
    pub(crate) last_good: Timestamp,
    next_id: u32,
}

impl AddressTable {
    /// Create an empty table placing entries with `key`.
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            key,
            entries: HashMap::new(),
            index: HashMap::new(),
            random_order: Vec::new(),
            new_grid: BucketGrid::new(NEW_BUCKET_COUNT),
            tried_grid: BucketGrid::new(TRIED_BUCKET_COUNT),
            new_count: 0,
            tried_count: 0,
            last_good: Timestamp::new(1),
            next_id: 0,
        }
    }

    /// Placement key.
    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    /// Number of distinct addresses.
    pub fn len(&self) -> usize {
        self.random_order.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.random_order.is_empty()
    }

    /// Addresses in the New table.
    pub fn new_count(&self) -> usize {
        self.new_count
    }

    /// Addresses in the Tried table.
    pub fn tried_count(&self) -> usize {
        self.tried_count
    }

    /// Handle of the entry for `ip`.
    pub fn find_id(&self, ip: &IpAddr) -> Option<EntryId> {
        self.index.get(&ip.to_mapped()).copied()
    }

    /// Entry for `ip`.
    pub fn find(&self, ip: &IpAddr) -> Option<&AddressEntry> {
        self.find_id(ip).and_then(|id| self.entries.get(&id))
    }

    /// Entry behind a handle.
    pub fn get(&self, id: EntryId) -> Option<&AddressEntry> {
        self.entries.get(&id)
    }

    /// Entries in ordering-array order.
    pub fn iter(&self) -> impl Iterator<Item = &AddressEntry> + '_ {
        self.random_order
            .iter()
            .filter_map(move |id| self.entries.get(id))
    }

    /// Statistics
    pub fn stats(&self) -> AddressManagerStats {
        AddressManagerStats {
            new_count: self.new_count,
            tried_count: self.tried_count,
            new_slots_used: self.new_grid.used(),
            tried_slots_used: self.tried_grid.used(),
        }
    }

    /// New bucket and slot for `entry` as reported by `source`.
    pub(crate) fn new_placement(&self, entry: &AddressEntry, source: &IpAddr) -> (usize, usize) {
        let addr = &entry.address.socket_addr;
        let bucket = new_bucket(&self.key, addr, source);
        (bucket, bucket_position(&self.key, true, bucket, addr))
    }

    /// New bucket and slot derived from the entry's own source.
    pub(crate) fn own_new_placement(&self, entry: &AddressEntry) -> (usize, usize) {
        self.new_placement(entry, &entry.source)
    }

    /// Tried bucket and slot of `entry`.
    pub(crate) fn tried_placement(&self, entry: &AddressEntry) -> (usize, usize) {
        let addr = &entry.address.socket_addr;
        let bucket = tried_bucket(&self.key, addr);
        (bucket, bucket_position(&self.key, false, bucket, addr))
    }

    /// Allocate a fresh, unreferenced entry counted as New.
    pub(crate) fn create(&mut self, address: PeerAddress, source: IpAddr) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let mut entry = AddressEntry::new(address, source);
        entry.random_pos = self.random_order.len();
        self.index.insert(address.socket_addr.ip.to_mapped(), id);
        self.random_order.push(id);
        self.entries.insert(id, entry);
        self.new_count += 1;
        id
    }

    /// Swap two positions of the ordering array, keeping `random_pos` in step.
    pub(crate) fn swap_random(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.random_order.swap(a, b);
        for pos in [a, b] {
            let id = self.random_order[pos];
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.random_pos = pos;
            }
        }
    }

    /// Remove an unreferenced New entry from every view.
    pub(crate) fn delete(&mut self, id: EntryId) {
        let Some(entry) = self.entries.get(&id) else {
            return;
        };
        debug_assert!(!entry.in_tried && entry.ref_count == 0);
        let pos = entry.random_pos;
        let mapped = entry.address.socket_addr.ip.to_mapped();

        let last = self.random_order.len() - 1;
        self.swap_random(pos, last);
        self.random_order.pop();
        self.index.remove(&mapped);
        self.entries.remove(&id);
        self.new_count = self.new_count.saturating_sub(1);
    }

    /// Drop whatever reference sits in a New slot, deleting the occupant
    /// once nothing references it any more.
    pub(crate) fn clear_new(&mut self, bucket: usize, slot: usize) {
        let Some(id) = self.new_grid.get(bucket, slot) else {
            return;
        };
        self.new_grid.set(bucket, slot, None);
        let orphaned = match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.ref_count = entry.ref_count.saturating_sub(1);
                entry.ref_count == 0
            }
            None => false,
        };
        if orphaned {
            self.delete(id);
        }
    }

    /// Point a New slot at `id`.
    pub(crate) fn insert_new(&mut self, bucket: usize, slot: usize, id: EntryId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.ref_count += 1;
            self.new_grid.set(bucket, slot, Some(id));
        }
    }

    /// Place a freshly created entry straight into a Tried slot.
    pub(crate) fn insert_tried(&mut self, bucket: usize, slot: usize, id: EntryId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.in_tried = true;
            self.tried_grid.set(bucket, slot, Some(id));
            self.new_count = self.new_count.saturating_sub(1);
            self.tried_count += 1;
        }
    }

    /// True if some New bucket references `id`, scanning from `start`.
    pub(crate) fn is_referenced_from(&self, id: EntryId, start: usize) -> bool {
        let Some(entry) = self.entries.get(&id) else {
            return false;
        };
        let addr = &entry.address.socket_addr;
        (0..NEW_BUCKET_COUNT)
            .map(|n| (start + n) % NEW_BUCKET_COUNT)
            .any(|bucket| {
                let slot = bucket_position(&self.key, true, bucket, addr);
                self.new_grid.get(bucket, slot) == Some(id)
            })
    }

    /// Move an entry from New to Tried.
    ///
    /// # Anti-Eclipse Defense
    /// A Tried slot collision never loses a proven address outright: the
    /// occupant drops back to New at the slot derived from its own source.
    pub(crate) fn make_tried(&mut self, id: EntryId) {
        let Some(entry) = self.entries.get(&id) else {
            return;
        };
        let addr = entry.address.socket_addr;

        for bucket in 0..NEW_BUCKET_COUNT {
            let slot = bucket_position(&self.key, true, bucket, &addr);
            if self.new_grid.get(bucket, slot) == Some(id) {
                self.new_grid.set(bucket, slot, None);
            }
        }
        let (t_bucket, t_slot) = self.tried_placement(entry);
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.ref_count = 0;
        }
        self.new_count = self.new_count.saturating_sub(1);

        if let Some(evict_id) = self.tried_grid.get(t_bucket, t_slot) {
            self.tried_grid.set(t_bucket, t_slot, None);
            self.tried_count = self.tried_count.saturating_sub(1);

            if let Some(evicted) = self.entries.get_mut(&evict_id) {
                evicted.in_tried = false;
            }
            if let Some(evicted) = self.entries.get(&evict_id) {
                let (bucket, slot) = self.own_new_placement(evicted);
                debug!(
                    "[qc-01] Tried collision: {} back to new bucket {} slot {}",
                    evicted.address.socket_addr, bucket, slot
                );
                self.clear_new(bucket, slot);
                self.insert_new(bucket, slot, evict_id);
                self.new_count += 1;
            }
        }

        self.tried_grid.set(t_bucket, t_slot, Some(id));
        self.tried_count += 1;
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.in_tried = true;
        }
    }

    /// Drop every entry, keeping the key.
    pub(crate) fn reset(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.random_order.clear();
        self.new_grid.clear();
        self.tried_grid.clear();
        self.new_count = 0;
        self.tried_count = 0;
        self.last_good = Timestamp::new(1);
    }
}
