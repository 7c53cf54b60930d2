//! Main AddressManager implementation.
//!
//! Reference: Bitcoin Core's `addrman.h`

use std::fmt;

use tracing::{debug, error, trace};

use super::config::{AddressManagerConfig, MAX_REFS_PER_ADDRESS, NEW_BUCKET_COUNT};
use super::security::is_routable_endpoint;
use super::table::AddressTable;
use super::types::{AddressEntry, AddressManagerStats, EntryId};
use crate::domain::{IpAddr, PeerAddress, SocketAddr, Timestamp};
use crate::ports::RandomSource;

/// `last_seen` refresh interval for gossip about a peer that looks online.
const ONLINE_UPDATE_INTERVAL: u64 = 60 * 60;
/// `last_seen` refresh interval for gossip about a peer that does not.
const OFFLINE_UPDATE_INTERVAL: u64 = 24 * 60 * 60;
/// `connected` only refreshes `last_seen` older than this.
const CONNECTED_UPDATE_INTERVAL: i64 = 20 * 60;

/// Address manager with New/Tried segregation
///
/// # Anti-Eclipse Defense
///
/// 1. New addresses go to buckets keyed by source group + address group
/// 2. Only after a successful connection do addresses move to Tried
/// 3. A secret key makes all placement unpredictable to attackers
/// 4. Each extra New reference is exponentially harder to obtain
pub struct AddressManager {
    pub(crate) table: AddressTable,
    pub(crate) rng: Box<dyn RandomSource>,
    pub(crate) config: AddressManagerConfig,
}

impl fmt::Debug for AddressManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressManager")
            .field("stats", &self.table.stats())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AddressManager {
    /// Create an empty address manager with a fresh key from `rng`.
    pub fn new(config: AddressManagerConfig, rng: Box<dyn RandomSource>) -> Self {
        let key = fresh_key(rng.as_ref());
        Self::with_table(AddressTable::new(key), config, rng)
    }

    /// Create an empty address manager with an explicit key.
    pub fn with_key(key: [u8; 32], config: AddressManagerConfig, rng: Box<dyn RandomSource>) -> Self {
        Self::with_table(AddressTable::new(key), config, rng)
    }

    /// Wrap an existing table, e.g. one decoded from disk.
    pub fn with_table(
        table: AddressTable,
        config: AddressManagerConfig,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self { table, rng, config }
    }

    /// Swap in another table (used when restoring from disk).
    pub fn replace_table(&mut self, table: AddressTable) {
        self.table = table;
        self.check_consistency();
    }

    /// Read-only access to the underlying table.
    pub fn table(&self) -> &AddressTable {
        &self.table
    }

    /// Active configuration.
    pub fn config(&self) -> &AddressManagerConfig {
        &self.config
    }

    /// Placement key.
    pub fn key(&self) -> &[u8; 32] {
        self.table.key()
    }

    /// Number of distinct addresses.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Addresses in the New table.
    pub fn new_count(&self) -> usize {
        self.table.new_count()
    }

    /// Addresses in the Tried table.
    pub fn tried_count(&self) -> usize {
        self.table.tried_count()
    }

    /// Entry for `ip`, whatever its port.
    pub fn find(&self, ip: &IpAddr) -> Option<&AddressEntry> {
        self.table.find(ip)
    }

    /// True if this exact endpoint (IP and port) is known.
    pub fn contains(&self, endpoint: &SocketAddr) -> bool {
        self.endpoint_id(endpoint).is_some()
    }

    /// Get statistics
    pub fn stats(&self) -> AddressManagerStats {
        self.table.stats()
    }

    /// Forget everything and draw a new key.
    pub fn clear(&mut self) {
        self.table.reset();
        self.table.key = fresh_key(self.rng.as_ref());
        debug!("[qc-01] Address table cleared, key regenerated");
        self.check_consistency();
    }

    /// Learn about `address` from the peer at `source`.
    ///
    /// `time_penalty` (seconds) is subtracted from the advertised
    /// `last_seen` so relayed addresses look older than first-hand ones.
    ///
    /// Returns true if a new entry was created and kept.
    pub fn add(
        &mut self,
        address: PeerAddress,
        source: &IpAddr,
        time_penalty: u64,
        now: Timestamp,
    ) -> bool {
        let added = self.add_inner(address, source, time_penalty, now);
        self.check_consistency();
        added
    }

    /// Add a batch of addresses from one source. Returns how many were new.
    pub fn add_many(
        &mut self,
        addresses: &[PeerAddress],
        source: &IpAddr,
        time_penalty: u64,
        now: Timestamp,
    ) -> usize {
        let added = addresses
            .iter()
            .filter(|address| self.add_inner(**address, source, time_penalty, now))
            .count();
        debug!(
            "[qc-01] Added {} of {} addresses from {}: {} tried, {} new",
            added,
            addresses.len(),
            source,
            self.table.tried_count,
            self.table.new_count
        );
        self.check_consistency();
        added
    }

    fn add_inner(
        &mut self,
        address: PeerAddress,
        source: &IpAddr,
        time_penalty: u64,
        now: Timestamp,
    ) -> bool {
        let endpoint = address.socket_addr;
        if !is_routable_endpoint(&endpoint) {
            trace!("[qc-01] Ignoring unroutable address {}", endpoint);
            return false;
        }

        let (id, created) = match self.table.find_id(&endpoint.ip) {
            Some(id) => {
                if !self.merge_gossip(id, &address, time_penalty, now) {
                    return false;
                }
                (id, false)
            }
            None => {
                let mut penalized = address;
                penalized.last_seen = address.last_seen.sub_secs(time_penalty);
                (self.table.create(penalized, *source), true)
            }
        };

        let Some(entry) = self.table.get(id) else {
            return false;
        };
        let (bucket, slot) = self.table.new_placement(entry, source);
        let ref_count = entry.ref_count;

        match self.table.new_grid.get(bucket, slot) {
            Some(occupant) if occupant == id => return created,
            Some(occupant) => {
                let evict = self.table.get(occupant).is_some_and(|existing| {
                    existing.is_terrible(now, &self.config)
                        || (existing.ref_count > 1 && ref_count == 0)
                });
                if !evict {
                    if ref_count == 0 {
                        trace!("[qc-01] New slot taken, dropping {}", endpoint);
                        self.table.delete(id);
                        return false;
                    }
                    return created;
                }
                debug!(
                    "[qc-01] Evicting new slot {}/{} for {}",
                    bucket, slot, endpoint
                );
                self.table.clear_new(bucket, slot);
            }
            None => {}
        }

        self.table.insert_new(bucket, slot, id);
        if created {
            debug!("[qc-01] Added {} to new bucket {} slot {}", endpoint, bucket, slot);
        }
        created
    }

    /// Fold fresh gossip into an existing entry. Returns true if the entry
    /// should also try to gain another New reference.
    fn merge_gossip(
        &mut self,
        id: EntryId,
        address: &PeerAddress,
        time_penalty: u64,
        now: Timestamp,
    ) -> bool {
        let Some(entry) = self.table.entries.get_mut(&id) else {
            return false;
        };

        let incoming = address.last_seen;
        let currently_online = now.secs_since(incoming) < OFFLINE_UPDATE_INTERVAL as i64;
        let update_interval = if currently_online {
            ONLINE_UPDATE_INTERVAL
        } else {
            OFFLINE_UPDATE_INTERVAL
        };

        let stored = entry.address.last_seen;
        let threshold = incoming.sub_secs(update_interval.saturating_add(time_penalty));
        if !incoming.is_zero() && (stored.is_zero() || stored < threshold) {
            entry.address.last_seen = incoming.sub_secs(time_penalty);
        }
        entry.address.services |= address.services;

        let stored = entry.address.last_seen;
        if incoming.is_zero() || (!stored.is_zero() && incoming <= stored) {
            trace!("[qc-01] No new information for {}", address.socket_addr);
            return false;
        }
        if entry.in_tried {
            return false;
        }
        if entry.ref_count >= MAX_REFS_PER_ADDRESS {
            return false;
        }

        // previous ref_count == n: 2^n times harder to gain another
        let factor = 1u64 << entry.ref_count;
        if factor > 1 && self.rng.random_below(factor) != 0 {
            trace!("[qc-01] Resisted extra reference for {}", address.socket_addr);
            return false;
        }
        true
    }

    /// Mark `endpoint` as reachable: move it to Tried.
    pub fn good(&mut self, endpoint: &SocketAddr, now: Timestamp) {
        self.good_inner(endpoint, now);
        self.check_consistency();
    }

    fn good_inner(&mut self, endpoint: &SocketAddr, now: Timestamp) {
        self.table.last_good = now;

        let Some(id) = self.endpoint_id(endpoint) else {
            trace!("[qc-01] good: unknown endpoint {}", endpoint);
            return;
        };
        let Some(entry) = self.table.entries.get_mut(&id) else {
            return;
        };

        // last_seen is not refreshed here, to avoid leaking who we are connected to
        entry.last_success = Some(now);
        entry.last_attempt = Some(now);
        entry.attempt_count = 0;

        if entry.in_tried {
            return;
        }

        let start = self.rng.random_below(NEW_BUCKET_COUNT as u64) as usize;
        if !self.table.is_referenced_from(id, start) {
            return;
        }

        debug!("[qc-01] Moving {} to tried", endpoint);
        self.table.make_tried(id);
    }

    /// Record a connection attempt to `endpoint`. When `count_failure` is
    /// set the attempt counts as a failure, but only if this node has had a
    /// successful connection since the previous counted failure.
    pub fn attempt(&mut self, endpoint: &SocketAddr, count_failure: bool, now: Timestamp) {
        let last_good = self.table.last_good;
        if let Some(id) = self.endpoint_id(endpoint) {
            if let Some(entry) = self.table.entries.get_mut(&id) {
                entry.last_attempt = Some(now);
                if count_failure && entry.last_count_attempt < last_good {
                    entry.last_count_attempt = now;
                    entry.attempt_count += 1;
                }
            }
        }
        self.check_consistency();
    }

    /// Note that we are currently connected to `endpoint`.
    pub fn connected(&mut self, endpoint: &SocketAddr, now: Timestamp) {
        if let Some(id) = self.endpoint_id(endpoint) {
            if let Some(entry) = self.table.entries.get_mut(&id) {
                if now.secs_since(entry.address.last_seen) > CONNECTED_UPDATE_INTERVAL {
                    entry.address.last_seen = now;
                }
            }
        }
        self.check_consistency();
    }

    /// Handle of the entry for an exact endpoint (IP and port).
    fn endpoint_id(&self, endpoint: &SocketAddr) -> Option<EntryId> {
        let id = self.table.find_id(&endpoint.ip)?;
        let entry = self.table.get(id)?;
        entry.address.socket_addr.same_endpoint(endpoint).then_some(id)
    }

    /// Run the invariant checker if enabled.
    pub(crate) fn check_consistency(&self) {
        if !self.config.consistency_checks {
            return;
        }
        if let Err(violation) = self.table.check() {
            error!(
                "[qc-01] Address table inconsistency {}: {}",
                violation.code(),
                violation
            );
            debug_assert!(false, "address table inconsistency {}", violation.code());
        }
    }
}

/// Draw a non-zero 256-bit key.
fn fresh_key(rng: &dyn RandomSource) -> [u8; 32] {
    let mut key = [0u8; 32];
    while key.iter().all(|&b| b == 0) {
        rng.fill_bytes(&mut key);
    }
    key
}
