//! Random Source Adapters

use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};

use crate::ports::RandomSource;

/// Fixed random source for deterministic testing.
///
/// Always returns the same value (reduced modulo `max`), enabling
/// reproducible tests. `FixedRandomSource::first()` makes every stochastic
/// test pass; `FixedRandomSource::new(u64::MAX)` makes every one fail.
///
/// # Example
///
/// ```rust
/// use qc_01_address_manager::adapters::security::FixedRandomSource;
/// use qc_01_address_manager::RandomSource;
///
/// let rng = FixedRandomSource::new(42);
/// assert_eq!(rng.random_below(100), 42);
/// assert_eq!(rng.random_below(100), 42); // Always same value
/// ```
#[derive(Debug, Clone)]
pub struct FixedRandomSource {
    value: u64,
}

impl FixedRandomSource {
    /// Create a fixed random source that always returns the given value.
    pub fn new(value: u64) -> Self {
        Self { value }
    }

    /// Create a random source that returns 0 (first element).
    pub fn first() -> Self {
        Self::new(0)
    }
}

impl RandomSource for FixedRandomSource {
    fn random_below(&self, max: u64) -> u64 {
        if max == 0 {
            0
        } else {
            self.value % max
        }
    }

    fn fill_bytes(&self, dest: &mut [u8]) {
        // distinct, never all-zero pattern
        let seed = self.value.to_le_bytes();
        for (i, byte) in dest.iter_mut().enumerate() {
            *byte = seed[i % 8] ^ (i as u8).wrapping_mul(31) ^ 0x5a;
        }
    }
}

/// Deterministic pseudo-random source for reproducible workloads.
#[derive(Debug)]
pub struct SeededRandomSource {
    rng: Mutex<StdRng>,
}

impl SeededRandomSource {
    /// Create from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandomSource {
    fn random_below(&self, max: u64) -> u64 {
        if max == 0 {
            return 0;
        }
        self.rng.lock().gen_range(0..max)
    }

    fn fill_bytes(&self, dest: &mut [u8]) {
        self.rng.lock().fill_bytes(dest);
    }
}

/// Production random source using OS entropy.
///
/// # Security
///
/// Key material comes straight from the OS CSPRNG; sampling uses the
/// thread-local ChaCha generator, which is reseeded from the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomSource;

impl OsRandomSource {
    /// Create a new OS random source.
    pub fn new() -> Self {
        Self
    }
}

impl RandomSource for OsRandomSource {
    fn random_below(&self, max: u64) -> u64 {
        if max == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..max)
    }

    fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}
