//! Address manager type definitions.

use super::config::AddressManagerConfig;
use crate::domain::{IpAddr, PeerAddress, Timestamp};

/// Stable handle of an entry in the table arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) u32);

/// An address entry in the address manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressEntry {
    /// Latest gossiped view of the endpoint
    pub address: PeerAddress,
    /// Peer that first told us about this address
    pub source: IpAddr,
    /// When we last successfully connected
    pub last_success: Option<Timestamp>,
    /// When we last attempted connection
    pub last_attempt: Option<Timestamp>,
    /// Failed attempts since the last success
    pub attempt_count: u32,
    /// Time of the last attempt counted as a failure (in memory only)
    pub(crate) last_count_attempt: Timestamp,
    /// New-table slots pointing at this entry
    pub(crate) ref_count: u32,
    /// Member of the Tried table
    pub(crate) in_tried: bool,
    /// Position in the randomized ordering array
    pub(crate) random_pos: usize,
}

impl AddressEntry {
    /// Create an entry that is not yet referenced by any slot.
    pub fn new(address: PeerAddress, source: IpAddr) -> Self {
        Self {
            address,
            source,
            last_success: None,
            last_attempt: None,
            attempt_count: 0,
            last_count_attempt: Timestamp::ZERO,
            ref_count: 0,
            in_tried: false,
            random_pos: 0,
        }
    }

    /// Number of New slots referencing this entry.
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    /// True once the entry has been promoted to the Tried table.
    pub fn in_tried(&self) -> bool {
        self.in_tried
    }

    /// Decide whether this entry is so bad it can be dropped or withheld
    /// from peers asking for addresses.
    pub fn is_terrible(&self, now: Timestamp, config: &AddressManagerConfig) -> bool {
        // never remove things tried in the last minute
        if let Some(last_attempt) = self.last_attempt {
            if now.secs_since(last_attempt) <= 60 {
                return false;
            }
        }

        let last_seen = self.address.last_seen;

        // came in a flying DeLorean
        if last_seen.secs_since(now) > 10 * 60 {
            return true;
        }

        if last_seen.is_zero() || now.secs_since(last_seen) > config.horizon_secs() as i64 {
            return true;
        }

        if self.last_success.is_none() && self.attempt_count >= config.retry_limit {
            return true;
        }

        let success_age = self
            .last_success
            .map(|t| now.secs_since(t))
            .unwrap_or(i64::MAX);
        success_age > config.min_fail_secs() as i64 && self.attempt_count >= config.max_failures
    }

    /// Relative weight for probabilistic selection, in `(0, 1]`.
    pub fn chance(&self, now: Timestamp) -> f64 {
        let mut chance = 1.0;

        // deprioritize very recent attempts
        if let Some(last_attempt) = self.last_attempt {
            if now.secs_since(last_attempt) < 10 * 60 {
                chance *= 0.01;
            }
        }

        chance * 0.66f64.powi(self.attempt_count.min(8) as i32)
    }
}

/// Statistics about the address manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressManagerStats {
    /// Number of addresses in the New table.
    pub new_count: usize,
    /// Number of addresses in the Tried table.
    pub tried_count: usize,
    /// Occupied New slots (an entry may hold several).
    pub new_slots_used: usize,
    /// Occupied Tried slots.
    pub tried_slots_used: usize,
}

impl AddressManagerStats {
    /// Total distinct addresses.
    pub fn total(&self) -> usize {
        self.new_count + self.tried_count
    }
}
