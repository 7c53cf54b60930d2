//! # Address Manager Flows
//!
//! A node's view of the address table over its lifetime:
//!
//! 1. **Bootstrap**: gossip arrives from many peers, some connections succeed
//! 2. **Restart**: the table is flushed to a peers file and loaded back
//! 3. **Eclipse attempt**: one network floods the table with its addresses
//! 4. **Ageing**: addresses past the horizon stop being relayed

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tracing_subscriber::EnvFilter;

    use qc_01_address_manager::domain::{new_bucket, tried_bucket, NEW_BUCKET_COUNT};
    use qc_01_address_manager::test_utils::ManualTimeSource;
    use qc_01_address_manager::{
        AddressManagerApi, AddressManagerConfig, AddressManagerService, IpAddr, PeerAddress,
        PeersFile, SeededRandomSource, ServiceFlags, SocketAddr, Timestamp,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const GENESIS: u64 = 1_700_000_000;
    const MAGIC: [u8; 4] = [0xf9, 0xbe, 0xb4, 0xd9];
    const DAY: u64 = 24 * 60 * 60;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Node with the per-operation checker off; flows audit the table once
    /// at the end instead.
    fn make_node(seed: u64, clock: &Arc<ManualTimeSource>) -> AddressManagerService {
        init_tracing();
        let config = AddressManagerConfig {
            consistency_checks: false,
            ..AddressManagerConfig::default()
        };
        AddressManagerService::new(
            config,
            Box::new(SeededRandomSource::new(seed)),
            Box::new(Arc::clone(clock)),
        )
    }

    /// Public-looking address; `i` picks the /16.
    fn honest_endpoint(i: u32) -> SocketAddr {
        SocketAddr::new(
            IpAddr::v4(11 + (i / 256 % 80) as u8, (i % 256) as u8, 17, 3),
            8333,
        )
    }

    fn gossip(endpoint: SocketAddr, seen: u64) -> PeerAddress {
        PeerAddress::new(endpoint, ServiceFlags::NETWORK, Timestamp::new(seen))
    }

    fn honest_source(i: u32) -> IpAddr {
        IpAddr::v4(120 + (i % 40) as u8, (i * 7 % 256) as u8, 1, 1)
    }

    // =============================================================================
    // Bootstrap and restart
    // =============================================================================

    #[test]
    fn test_bootstrap_flush_and_restart() {
        let clock = Arc::new(ManualTimeSource::new(GENESIS));
        let node = make_node(1, &clock);

        for batch in 0..20u32 {
            let addresses: Vec<PeerAddress> = (0..25)
                .map(|i| gossip(honest_endpoint(batch * 25 + i), GENESIS - u64::from(i) * 60))
                .collect();
            node.add_many(&addresses, &honest_source(batch), 2 * 60 * 60);
        }
        assert!(node.stats().new_count > 400);

        // dial a few dozen peers; every third one answers
        for round in 0..60 {
            clock.advance(30);
            let Some(peer) = node.select() else {
                continue;
            };
            node.attempt(&peer.socket_addr);
            if round % 3 == 0 {
                node.good(&peer.socket_addr);
            }
        }
        let before = node.stats();
        assert!(before.tried_count > 0);

        let dir = tempfile::tempdir().unwrap();
        let store = PeersFile::new(dir.path().join("peers.dat"), MAGIC);
        assert_eq!(node.flush(&store).unwrap(), before.total());

        let restarted = make_node(2, &clock);
        assert!(restarted.load(&store).unwrap());
        assert_eq!(restarted.stats(), before);
        assert_eq!(restarted.key(), node.key());

        let relayed = restarted.get_addr();
        assert!(!relayed.is_empty());
        assert!(relayed.len() <= before.total() * 23 / 100);
        assert!(relayed.iter().all(|a| restarted.contains(&a.socket_addr)));
        restarted.inspect(|manager| assert_eq!(manager.table().check(), Ok(())));
    }

    // =============================================================================
    // Eclipse resistance
    // =============================================================================

    #[test]
    fn test_single_network_flood_is_contained() {
        let clock = Arc::new(ManualTimeSource::new(GENESIS));
        let node = make_node(3, &clock);

        let honest: Vec<SocketAddr> = (0..300).map(honest_endpoint).collect();
        for (i, endpoint) in honest.iter().enumerate() {
            node.add(gossip(*endpoint, GENESIS), &honest_source(i as u32), 0);
        }
        let survivors: Vec<SocketAddr> = honest
            .iter()
            .copied()
            .filter(|e| node.contains(e))
            .collect();

        // attacker relays from one /16, advertising many /16s of its own
        let attacker = IpAddr::v4(203, 0, 113, 9);
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..20_000 {
            let endpoint = SocketAddr::new(
                IpAddr::v4(rng.gen_range(100..=110), rng.gen(), rng.gen(), rng.gen_range(1..=254)),
                rng.gen_range(1024..=65535),
            );
            node.add(gossip(endpoint, GENESIS), &attacker, 0);
        }

        // healthy entries are never displaced by fresh gossip
        assert!(survivors.iter().all(|e| node.contains(e)));

        let buckets: HashSet<usize> = node.inspect(|manager| {
            let key = *manager.key();
            manager
                .table()
                .iter()
                .filter(|entry| entry.source == attacker)
                .map(|entry| new_bucket(&key, &entry.address.socket_addr, &attacker))
                .collect()
        });
        assert!(!buckets.is_empty());
        assert!(buckets.len() <= 64);
        assert!(buckets.iter().all(|b| *b < NEW_BUCKET_COUNT));
        node.inspect(|manager| assert_eq!(manager.table().check(), Ok(())));
    }

    #[test]
    fn test_tried_buckets_bounded_per_group() {
        let clock = Arc::new(ManualTimeSource::new(GENESIS));
        let node = make_node(4, &clock);

        // one /16, many hosts, all reachable
        let endpoints: Vec<SocketAddr> = (0..2000u32)
            .map(|i| SocketAddr::new(IpAddr::v4(44, 9, (i / 250) as u8, (i % 250 + 1) as u8), 8333))
            .collect();
        for (i, endpoint) in endpoints.iter().enumerate() {
            node.add(gossip(*endpoint, GENESIS), &honest_source(i as u32), 0);
            node.good(endpoint);
        }

        let buckets: HashSet<usize> = node.inspect(|manager| {
            let key = *manager.key();
            manager
                .table()
                .iter()
                .filter(|entry| entry.in_tried())
                .map(|entry| tried_bucket(&key, &entry.address.socket_addr))
                .collect()
        });
        assert!(!buckets.is_empty());
        assert!(buckets.len() <= 8);
        assert!(node.stats().tried_count <= 8 * 64);
        node.inspect(|manager| assert_eq!(manager.table().check(), Ok(())));
    }

    // =============================================================================
    // Ageing
    // =============================================================================

    #[test]
    fn test_stale_addresses_stop_being_relayed() {
        let clock = Arc::new(ManualTimeSource::new(GENESIS));
        let node = make_node(5, &clock);
        for i in 0..100u32 {
            node.add(gossip(honest_endpoint(i), GENESIS), &honest_source(i), 0);
        }
        assert!(!node.get_addr().is_empty());

        clock.advance(31 * DAY);
        assert!(node.get_addr().is_empty());
        // still selectable: ageing affects relaying, not dialing
        assert!(node.select().is_some());

        // fresh gossip revives an entry
        let revived = honest_endpoint(7);
        if node.contains(&revived) {
            node.add(gossip(revived, GENESIS + 31 * DAY), &honest_source(1), 0);
            let entry = node.find(&revived.ip).unwrap();
            assert_eq!(entry.address.last_seen, Timestamp::new(GENESIS + 31 * DAY));
        }
    }

    // =============================================================================
    // Concurrency
    // =============================================================================

    #[test]
    fn test_parallel_connection_workers() {
        let clock = Arc::new(ManualTimeSource::new(GENESIS));
        let node = Arc::new(make_node(6, &clock));
        for i in 0..400u32 {
            node.add(gossip(honest_endpoint(i), GENESIS), &honest_source(i), 0);
        }

        let dialed = Arc::new(Mutex::new(Vec::new()));
        let workers: Vec<_> = (0..8)
            .map(|w| {
                let node = Arc::clone(&node);
                let dialed = Arc::clone(&dialed);
                thread::spawn(move || {
                    for round in 0..50 {
                        if let Some(peer) = node.select() {
                            node.attempt(&peer.socket_addr);
                            if (w + round) % 4 == 0 {
                                node.good(&peer.socket_addr);
                                node.connected(&peer.socket_addr);
                            }
                            dialed.lock().push(peer.socket_addr);
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(dialed.lock().len(), 8 * 50);
        assert!(node.stats().tried_count > 0);
        node.inspect(|manager| assert_eq!(manager.table().check(), Ok(())));
    }
}
