use crate::domain::{AddressManagerStats, IpAddr, PeerAddress, SocketAddr};
use crate::ports::AddressManagerApi;
use crate::service::AddressManagerService;

impl AddressManagerApi for AddressManagerService {
    fn add(&self, address: PeerAddress, source: &IpAddr, time_penalty: u64) -> bool {
        let now = self.now();
        self.add_at(address, source, time_penalty, now)
    }

    fn add_many(&self, addresses: &[PeerAddress], source: &IpAddr, time_penalty: u64) -> usize {
        let now = self.now();
        self.add_many_at(addresses, source, time_penalty, now)
    }

    fn good(&self, endpoint: &SocketAddr) {
        let now = self.now();
        self.good_at(endpoint, now);
    }

    fn attempt(&self, endpoint: &SocketAddr) {
        let now = self.now();
        self.attempt_at(endpoint, true, now);
    }

    fn connected(&self, endpoint: &SocketAddr) {
        let now = self.now();
        self.connected_at(endpoint, now);
    }

    fn select(&self) -> Option<PeerAddress> {
        let now = self.now();
        self.select_at(false, now)
    }

    fn select_new_only(&self) -> Option<PeerAddress> {
        let now = self.now();
        self.select_at(true, now)
    }

    fn get_addr(&self) -> Vec<PeerAddress> {
        let now = self.now();
        self.get_addr_at(now)
    }

    fn stats(&self) -> AddressManagerStats {
        self.manager.lock().stats()
    }
}
