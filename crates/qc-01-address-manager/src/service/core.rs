use parking_lot::Mutex;
use tracing::info;

use crate::codec;
use crate::domain::{
    AddressEntry, AddressManager, AddressManagerConfig, IpAddr, PeerAddress, SocketAddr, Timestamp,
};
use crate::error::Result;
use crate::ports::{ConfigProvider, PeersStore, RandomSource, TimeSource};

/// Address Manager Service implementing the driving port.
///
/// Wraps the domain `AddressManager` behind one coarse lock and a
/// `TimeSource`, and snapshots it to / restores it from a `PeersStore`.
///
/// # Concurrency
///
/// Every operation holds the lock for its full duration, including the
/// consistency check. Disk I/O in `flush` and `load` happens outside it.
///
/// # Example
///
/// ```rust,ignore
/// use qc_01_address_manager::adapters::{OsRandomSource, SystemTimeSource};
/// use qc_01_address_manager::service::AddressManagerService;
///
/// let service = AddressManagerService::new(
///     AddressManagerConfig::default(),
///     Box::new(OsRandomSource::new()),
///     Box::new(SystemTimeSource::new()),
/// );
/// let stats = service.stats();
/// ```
pub struct AddressManagerService {
    /// The underlying address manager (domain layer)
    pub(crate) manager: Mutex<AddressManager>,
    /// Time source for operations requiring timestamps
    pub(crate) time_source: Box<dyn TimeSource>,
}

impl AddressManagerService {
    /// Create a service around an empty table.
    pub fn new(
        config: AddressManagerConfig,
        rng: Box<dyn RandomSource>,
        time_source: Box<dyn TimeSource>,
    ) -> Self {
        Self::with_manager(AddressManager::new(config, rng), time_source)
    }

    /// Create a service using configuration from `provider`.
    pub fn from_provider(
        provider: &dyn ConfigProvider,
        rng: Box<dyn RandomSource>,
        time_source: Box<dyn TimeSource>,
    ) -> Self {
        Self::new(provider.address_manager_config(), rng, time_source)
    }

    /// Wrap an already built manager.
    pub fn with_manager(manager: AddressManager, time_source: Box<dyn TimeSource>) -> Self {
        Self {
            manager: Mutex::new(manager),
            time_source,
        }
    }

    /// Get the current timestamp from the time source.
    pub(crate) fn now(&self) -> Timestamp {
        self.time_source.now()
    }

    /// Run `f` with shared access to the manager, under the lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&AddressManager) -> R) -> R {
        f(&self.manager.lock())
    }

    /// Number of known addresses.
    pub fn len(&self) -> usize {
        self.manager.lock().len()
    }

    /// True if no address is known.
    pub fn is_empty(&self) -> bool {
        self.manager.lock().is_empty()
    }

    /// True if this exact endpoint is known.
    pub fn contains(&self, endpoint: &SocketAddr) -> bool {
        self.manager.lock().contains(endpoint)
    }

    /// Snapshot of the entry for `ip`.
    pub fn find(&self, ip: &IpAddr) -> Option<AddressEntry> {
        self.manager.lock().find(ip).cloned()
    }

    /// Placement key currently in use.
    pub fn key(&self) -> [u8; 32] {
        *self.manager.lock().key()
    }

    /// Forget every address and draw a new key.
    pub fn clear(&self) {
        self.manager.lock().clear();
    }

    /// `add` at an explicit time.
    pub fn add_at(&self, address: PeerAddress, source: &IpAddr, time_penalty: u64, when: Timestamp) -> bool {
        self.manager.lock().add(address, source, time_penalty, when)
    }

    /// `add_many` at an explicit time.
    pub fn add_many_at(
        &self,
        addresses: &[PeerAddress],
        source: &IpAddr,
        time_penalty: u64,
        when: Timestamp,
    ) -> usize {
        self.manager
            .lock()
            .add_many(addresses, source, time_penalty, when)
    }

    /// Promote `endpoint` to Tried as of `when`.
    pub fn good_at(&self, endpoint: &SocketAddr, when: Timestamp) {
        self.manager.lock().good(endpoint, when);
    }

    /// Record an attempt. See `AddressManager::attempt` for `count_failure`.
    pub fn attempt_at(&self, endpoint: &SocketAddr, count_failure: bool, when: Timestamp) {
        self.manager.lock().attempt(endpoint, count_failure, when);
    }

    /// Refresh `last_seen` of a live connection as of `when`.
    pub fn connected_at(&self, endpoint: &SocketAddr, when: Timestamp) {
        self.manager.lock().connected(endpoint, when);
    }

    /// Pick an address to dial, scored as of `when`.
    pub fn select_at(&self, new_only: bool, when: Timestamp) -> Option<PeerAddress> {
        self.manager.lock().select(new_only, when)
    }

    /// Sample addresses to relay, excluding those terrible as of `when`.
    pub fn get_addr_at(&self, when: Timestamp) -> Vec<PeerAddress> {
        self.manager.lock().get_addr(when)
    }

    /// Serialize the table and hand it to `store`.
    ///
    /// # Returns
    ///
    /// Number of addresses written.
    pub fn flush(&self, store: &dyn PeersStore) -> Result<usize> {
        let (payload, count) = {
            let manager = self.manager.lock();
            (codec::encode(manager.table()), manager.len())
        };
        store.write(&payload)?;
        info!("[qc-01] Flushed {} addresses ({} bytes)", count, payload.len());
        Ok(count)
    }

    /// Replace the table with the one saved in `store`.
    ///
    /// # Returns
    ///
    /// `false` if the store had nothing saved; the current table is kept.
    pub fn load(&self, store: &dyn PeersStore) -> Result<bool> {
        let Some(payload) = store.read()? else {
            return Ok(false);
        };
        let table = codec::decode(&payload)?;
        let (new_count, tried_count) = (table.new_count(), table.tried_count());

        self.manager.lock().replace_table(table);
        info!(
            "[qc-01] Loaded {} addresses: {} new, {} tried",
            new_count + tried_count,
            new_count,
            tried_count
        );
        Ok(true)
    }
}
