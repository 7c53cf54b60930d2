//! # Quantum-Chain Subsystem Benchmarks
//!
//! Performance validation for the address manager:
//!
//! | Subsystem | Operation | Target |
//! |-----------|-----------|--------|
//! | qc-01 Address Manager | Bucket placement | < 5us |
//! | qc-01 Address Manager | Gossip ingestion | < 20us per address |
//! | qc-01 Address Manager | Select on a full table | < 100us |
//! | qc-01 Address Manager | Save / load 30k entries | < 100ms |

use criterion::{criterion_group, criterion_main, Criterion};

use qc_tests::benchmarks::qc_01_address_manager;

// ============================================================================
// QC-01: Address Manager Benchmarks
// ============================================================================

fn bench_address_manager(c: &mut Criterion) {
    qc_01_address_manager::register_benchmarks(c);
}

criterion_group!(benches, bench_address_manager);

criterion_main!(benches);
