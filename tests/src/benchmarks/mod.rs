//! # Quantum-Chain Benchmarks
//!
//! Performance benchmarks per subsystem.
//! All benchmarks are "brutal" stress tests on a full-size table.

pub mod qc_01_address_manager;
