//! Test utilities for the address manager.
//!
//! This module provides mock implementations of traits for deterministic testing.
//! Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use qc_01_address_manager::test_utils::FixedTimeSource;
//! use qc_01_address_manager::TimeSource;
//!
//! let time_source = FixedTimeSource::new(1000);
//! assert_eq!(time_source.now().as_secs(), 1000);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::Timestamp;
use crate::ports::outbound::TimeSource;

/// A time source that returns a fixed timestamp.
///
/// Useful for deterministic testing where time progression needs to be controlled.
#[derive(Debug, Clone)]
pub struct FixedTimeSource {
    timestamp: u64,
}

impl FixedTimeSource {
    /// Create a new fixed time source with the given timestamp (in seconds).
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp }
    }

    /// Get the configured timestamp value.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.timestamp)
    }
}

/// A time source the test advances by hand.
///
/// Shareable through `Arc` so a test can keep a handle while the service
/// owns another.
///
/// # Example
///
/// ```rust
/// use qc_01_address_manager::test_utils::ManualTimeSource;
/// use qc_01_address_manager::TimeSource;
///
/// let time = ManualTimeSource::new(100);
/// time.advance(60);
/// assert_eq!(time.now().as_secs(), 160);
/// ```
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    secs: AtomicU64,
}

impl ManualTimeSource {
    /// Start the clock at `secs`.
    pub fn new(secs: u64) -> Self {
        Self {
            secs: AtomicU64::new(secs),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump to an absolute time.
    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.secs.load(Ordering::SeqCst))
    }
}
