//! Weighted selection and bulk sampling.

use tracing::trace;

use super::config::{BUCKET_SIZE, NEW_BUCKET_COUNT, TRIED_BUCKET_COUNT};
use super::manager::AddressManager;
use crate::domain::{PeerAddress, Timestamp};

/// Integer scale the acceptance test is carried out on.
const CHANCE_SCALE: u64 = 1 << 30;

impl AddressManager {
    /// Choose an address to connect to.
    ///
    /// Tried and New are picked with equal probability (unless one is empty
    /// or `new_only` is set). Within a table, a random occupied slot is
    /// accepted with probability `factor * chance`, where `factor` grows by
    /// 20% after every rejection so the loop always terminates.
    pub fn select(&self, new_only: bool, now: Timestamp) -> Option<PeerAddress> {
        if self.table.is_empty() {
            return None;
        }
        if new_only && self.table.new_count == 0 {
            return None;
        }

        let use_tried = !new_only
            && self.table.tried_count > 0
            && (self.table.new_count == 0 || self.rng.random_below(2) == 0);

        let (grid, bucket_count) = if use_tried {
            (&self.table.tried_grid, TRIED_BUCKET_COUNT)
        } else {
            (&self.table.new_grid, NEW_BUCKET_COUNT)
        };
        let capacity = grid.capacity();

        let mut chance_factor = 1.0f64;
        loop {
            let bucket = self.rng.random_below(bucket_count as u64) as usize;
            let slot = self.rng.random_below(BUCKET_SIZE as u64) as usize;
            let start = bucket * BUCKET_SIZE + slot;

            let found = (0..capacity)
                .map(|n| (start + n) % capacity)
                .find_map(|index| grid.get_flat(index));
            let entry = found.and_then(|id| self.table.get(id))?;

            let threshold = chance_factor * entry.chance(now) * CHANCE_SCALE as f64;
            if (self.rng.random_below(CHANCE_SCALE) as f64) < threshold {
                trace!(
                    "[qc-01] Selected {} from {} table",
                    entry.address.socket_addr,
                    if use_tried { "tried" } else { "new" }
                );
                return Some(entry.address);
            }
            chance_factor *= 1.2;
        }
    }

    /// Random sample of good addresses to relay to a peer.
    ///
    /// Returns at most `getaddr_max_pct`% of the table, capped at
    /// `getaddr_max`. Terrible entries are skipped and do not count.
    pub fn get_addr(&mut self, now: Timestamp) -> Vec<PeerAddress> {
        let total = self.table.random_order.len();
        let wanted = (total * self.config.getaddr_max_pct / 100).min(self.config.getaddr_max);

        let mut out = Vec::with_capacity(wanted);
        for n in 0..total {
            if out.len() >= wanted {
                break;
            }
            let pick = self.rng.random_below((total - n) as u64) as usize + n;
            self.table.swap_random(n, pick);

            let id = self.table.random_order[n];
            if let Some(entry) = self.table.get(id) {
                if !entry.is_terrible(now, &self.config) {
                    out.push(entry.address);
                }
            }
        }

        self.check_consistency();
        out
    }
}
