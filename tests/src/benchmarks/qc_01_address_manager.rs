//! # QC-01 Address Manager Brutal Benchmarks
//!
//! Operations on a table filled close to capacity:
//! - Keyed bucket placement (two double-SHA256 rounds per address)
//! - Gossip ingestion, including the collision and resistance paths
//! - Weighted selection on a sparse and on a crowded table
//! - Relay sampling and full persistence round trips
//!
//! Brutal Conditions:
//! - Tens of thousands of entries spread over all New buckets
//! - Adversarial gossip from a single source group
//! - Mostly failed entries, forcing many selection rejections

use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use qc_01_address_manager::codec;
use qc_01_address_manager::domain::{bucket_position, new_bucket, tried_bucket};
use qc_01_address_manager::{
    AddressManager, AddressManagerConfig, IpAddr, PeerAddress, SeededRandomSource, ServiceFlags,
    SocketAddr, Timestamp,
};

const NOW: u64 = 1_700_000_000;

fn random_endpoint(rng: &mut StdRng) -> SocketAddr {
    SocketAddr::new(
        IpAddr::v4(rng.gen_range(1..=99), rng.gen(), rng.gen(), rng.gen_range(1..=254)),
        8333,
    )
}

fn random_source(rng: &mut StdRng) -> IpAddr {
    IpAddr::v4(rng.gen_range(1..=99), rng.gen(), 0, 1)
}

fn bench_manager() -> AddressManager {
    let config = AddressManagerConfig {
        consistency_checks: false,
        ..AddressManagerConfig::default()
    };
    AddressManager::new(config, Box::new(SeededRandomSource::new(7)))
}

/// Table with `count` gossip attempts and a tenth of them promoted.
fn populated(count: usize) -> AddressManager {
    let mut manager = bench_manager();
    let mut rng = StdRng::seed_from_u64(count as u64);
    let now = Timestamp::new(NOW);
    let mut seen = Vec::with_capacity(count);
    for _ in 0..count {
        let endpoint = random_endpoint(&mut rng);
        let address = PeerAddress::new(endpoint, ServiceFlags::NETWORK, now);
        let source = random_source(&mut rng);
        if manager.add(address, &source, 0, now) {
            seen.push(endpoint);
        }
    }
    for endpoint in seen.iter().step_by(10) {
        manager.good(endpoint, now);
    }
    manager
}

pub fn brutal_placement(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-01/brutal/placement");
    group.measurement_time(Duration::from_secs(10));

    let key = [0x5au8; 32];
    let endpoint = SocketAddr::new(IpAddr::v4(8, 8, 8, 8), 8333);
    let source = IpAddr::v4(9, 9, 9, 9);

    group.bench_function("new_bucket_and_slot", |b| {
        b.iter(|| {
            let bucket = new_bucket(&key, black_box(&endpoint), black_box(&source));
            black_box(bucket_position(&key, true, bucket, &endpoint))
        })
    });

    group.bench_function("tried_bucket_and_slot", |b| {
        b.iter(|| {
            let bucket = tried_bucket(&key, black_box(&endpoint));
            black_box(bucket_position(&key, false, bucket, &endpoint))
        })
    });

    // IPv6 goes through the longer group derivation
    let v6 = SocketAddr::new(
        IpAddr::v6([0x2a, 0x01, 0x4f, 0x8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]),
        8333,
    );
    group.bench_function("new_bucket_ipv6", |b| {
        b.iter(|| black_box(new_bucket(&key, black_box(&v6), &source)))
    });

    group.finish();
}

pub fn brutal_gossip_ingestion(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-01/brutal/gossip");
    group.measurement_time(Duration::from_secs(15));

    for size in [1_000usize, 10_000] {
        let mut rng = StdRng::seed_from_u64(1);
        let now = Timestamp::new(NOW);
        let batch: Vec<PeerAddress> = (0..size)
            .map(|_| PeerAddress::new(random_endpoint(&mut rng), ServiceFlags::NETWORK, now))
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("add_many_fresh", size), &batch, |b, batch| {
            b.iter_batched(
                bench_manager,
                |mut manager| {
                    black_box(manager.add_many(batch, &IpAddr::v4(9, 9, 9, 9), 0, now));
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }

    // Adversarial: one source group hammering its 64 buckets
    let mut manager = populated(20_000);
    let mut rng = StdRng::seed_from_u64(2);
    let attacker = IpAddr::v4(66, 66, 1, 1);
    let now = Timestamp::new(NOW);
    group.bench_function("add_single_source_flood", |b| {
        b.iter(|| {
            let address = PeerAddress::new(random_endpoint(&mut rng), ServiceFlags::NETWORK, now);
            black_box(manager.add(address, &attacker, 0, now))
        })
    });

    group.finish();
}

pub fn brutal_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-01/brutal/select");
    group.measurement_time(Duration::from_secs(10));
    let now = Timestamp::new(NOW);

    for size in [100usize, 30_000] {
        let manager = populated(size);
        group.bench_with_input(BenchmarkId::new("select", size), &manager, |b, manager| {
            b.iter(|| black_box(manager.select(false, now)))
        });
    }

    // Adversarial: every entry failed several times
    let mut failing = populated(5_000);
    let endpoints: Vec<SocketAddr> = failing
        .table()
        .iter()
        .map(|entry| entry.address.socket_addr)
        .collect();
    let anchor = endpoints[0];
    for round in 0..6u64 {
        for endpoint in &endpoints {
            failing.attempt(endpoint, true, now.add_secs(round));
        }
        failing.good(&anchor, now.add_secs(round));
    }
    let later = now.add_secs(3600);
    group.bench_function("select_mostly_failed", |b| {
        b.iter(|| black_box(failing.select(false, later)))
    });

    group.finish();
}

pub fn brutal_sampling_and_persistence(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-01/brutal/persist");
    group.measurement_time(Duration::from_secs(15));
    let now = Timestamp::new(NOW);

    let mut manager = populated(30_000);
    group.throughput(Throughput::Elements(manager.len() as u64));
    group.bench_function("get_addr_full_table", |b| {
        b.iter(|| black_box(manager.get_addr(now).len()))
    });

    let bytes = codec::encode(manager.table());
    group.bench_function("encode_full_table", |b| {
        b.iter(|| black_box(codec::encode(manager.table()).len()))
    });
    group.bench_function("decode_full_table", |b| {
        b.iter(|| black_box(codec::decode(&bytes).map(|t| t.len())))
    });

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    brutal_placement(c);
    brutal_gossip_ingestion(c);
    brutal_selection(c);
    brutal_sampling_and_persistence(c);
}
