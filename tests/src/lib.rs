//! # Quantum-Chain Address Manager Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── benchmarks/       # Performance tests per subsystem
//! │   └── qc_01_address_manager.rs
//! │
//! └── integration/      # End-to-end flows through the public API
//!     └── address_manager_flows.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qc-tests
//!
//! # By category
//! cargo test -p qc-tests integration::
//!
//! # Benchmarks
//! cargo bench -p qc-tests
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod benchmarks;
pub mod integration;
