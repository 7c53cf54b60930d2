//! # Driving Ports (Inbound API)
//!
//! The API the connection layer uses to feed the address manager and to ask
//! it for peers.

use crate::domain::{AddressManagerStats, IpAddr, PeerAddress, SocketAddr};

/// Primary API for interacting with the address manager.
///
/// All methods take `&self`: implementations synchronize internally and are
/// shared between connection tasks.
///
/// # Example
///
/// ```rust,ignore
/// use qc_01_address_manager::ports::AddressManagerApi;
///
/// fn on_addr_message<T: AddressManagerApi>(api: &T, addrs: &[PeerAddress], from: IpAddr) {
///     let fresh = api.add_many(addrs, &from, 2 * 60 * 60);
///     tracing::debug!("learned {} addresses", fresh);
/// }
/// ```
pub trait AddressManagerApi {
    /// Learn about one address gossiped by `source`.
    ///
    /// `time_penalty` is subtracted (in seconds) from the advertised
    /// `last_seen`.
    ///
    /// # Returns
    ///
    /// `true` if a new entry was created.
    fn add(&self, address: PeerAddress, source: &IpAddr, time_penalty: u64) -> bool;

    /// Learn about a batch of addresses gossiped by `source`.
    ///
    /// # Returns
    ///
    /// The number of new entries created.
    fn add_many(&self, addresses: &[PeerAddress], source: &IpAddr, time_penalty: u64) -> usize;

    /// A connection to `endpoint` succeeded: promote it to Tried.
    fn good(&self, endpoint: &SocketAddr);

    /// A connection to `endpoint` was attempted and failed.
    fn attempt(&self, endpoint: &SocketAddr);

    /// We are currently connected to `endpoint`.
    fn connected(&self, endpoint: &SocketAddr);

    /// Choose an address to connect to, from either table.
    fn select(&self) -> Option<PeerAddress>;

    /// Choose an address to connect to from the New table only.
    fn select_new_only(&self) -> Option<PeerAddress>;

    /// Random sample of addresses to answer a `getaddr` request.
    fn get_addr(&self) -> Vec<PeerAddress>;

    /// Current table statistics.
    fn stats(&self) -> AddressManagerStats;
}
