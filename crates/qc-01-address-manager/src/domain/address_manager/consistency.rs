//! Full-structure invariant checker.
//!
//! Walks the arena, the ordering array, the endpoint index and both grids
//! and reports the first broken invariant. Placement is recomputed from
//! each entry's own fields, so a table decoded from disk is audited exactly
//! like one built in memory.

use std::collections::HashMap;

use super::bucket::bucket_position;
use super::config::MAX_REFS_PER_ADDRESS;
use super::table::AddressTable;
use super::types::EntryId;
use crate::error::ConsistencyViolation;

impl AddressTable {
    /// Verify every structural invariant of the table.
    pub fn check(&self) -> Result<(), ConsistencyViolation> {
        if self.key.iter().all(|&b| b == 0) {
            return Err(ConsistencyViolation::ZeroKey);
        }
        if self.entries.len() != self.random_order.len()
            || self.entries.len() != self.new_count + self.tried_count
        {
            return Err(ConsistencyViolation::CountMismatch);
        }

        for (pos, id) in self.random_order.iter().enumerate() {
            match self.entries.get(id) {
                Some(entry) if entry.random_pos == pos => {}
                _ => return Err(ConsistencyViolation::RandomPosMismatch),
            }
        }

        let mut tried_seen = 0usize;
        let mut new_seen = 0usize;
        for (id, entry) in &self.entries {
            if self.random_order.get(entry.random_pos) != Some(id) {
                return Err(ConsistencyViolation::RandomPosMismatch);
            }
            if entry.in_tried {
                if entry.last_success.is_none() {
                    return Err(ConsistencyViolation::TriedWithoutSuccess);
                }
                if entry.ref_count != 0 {
                    return Err(ConsistencyViolation::TriedWithRefs);
                }
                tried_seen += 1;
            } else {
                if entry.ref_count == 0 {
                    return Err(ConsistencyViolation::NewWithoutRefs);
                }
                if entry.ref_count > MAX_REFS_PER_ADDRESS {
                    return Err(ConsistencyViolation::RefsOverCap);
                }
                new_seen += 1;
            }
            if self.index.get(&entry.address.socket_addr.ip.to_mapped()) != Some(id) {
                return Err(ConsistencyViolation::IndexMismatch);
            }
        }
        if self.index.len() != self.entries.len() {
            return Err(ConsistencyViolation::IndexMismatch);
        }
        if tried_seen != self.tried_count {
            return Err(ConsistencyViolation::TriedCountDrift);
        }
        if new_seen != self.new_count {
            return Err(ConsistencyViolation::NewCountDrift);
        }

        let mut tried_slots: HashMap<EntryId, u32> = HashMap::new();
        for (bucket, slot, id) in self.tried_grid.occupied() {
            let entry = self
                .entries
                .get(&id)
                .ok_or(ConsistencyViolation::DanglingSlot)?;
            if !entry.in_tried {
                return Err(ConsistencyViolation::TriedSlotNotTried);
            }
            let (expected_bucket, expected_slot) = self.tried_placement(entry);
            if expected_bucket != bucket {
                return Err(ConsistencyViolation::TriedBucketMismatch);
            }
            if expected_slot != slot {
                return Err(ConsistencyViolation::PositionMismatch);
            }
            *tried_slots.entry(id).or_default() += 1;
        }

        // The New bucket depends on who gossiped the address, so only the
        // slot inside the bucket can be recomputed.
        let mut new_refs: HashMap<EntryId, u32> = HashMap::new();
        for (bucket, slot, id) in self.new_grid.occupied() {
            let entry = self
                .entries
                .get(&id)
                .ok_or(ConsistencyViolation::DanglingSlot)?;
            if entry.in_tried {
                return Err(ConsistencyViolation::NewSlotTried);
            }
            if bucket_position(&self.key, true, bucket, &entry.address.socket_addr) != slot {
                return Err(ConsistencyViolation::PositionMismatch);
            }
            *new_refs.entry(id).or_default() += 1;
        }

        for (id, entry) in &self.entries {
            let consistent = if entry.in_tried {
                tried_slots.get(id) == Some(&1)
            } else {
                new_refs.get(id).copied().unwrap_or(0) == entry.ref_count
            };
            if !consistent {
                return Err(ConsistencyViolation::RefCountMismatch);
            }
        }

        Ok(())
    }
}
